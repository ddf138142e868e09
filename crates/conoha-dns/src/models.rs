//! DNS models: domains, records, list parameters and request bodies.

use chrono::{DateTime, FixedOffset};
use conoha_core::query::QueryParams;
use conoha_core::time::deserialize_lenient;
use conoha_core::uuid::{DomainId, RecordId};
use conoha_core::{Normalize, TimeZoneConfig};
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::{Validate, ValidationError};

/// Page size used when the caller asks for less than one entry.
pub const DEFAULT_LIMIT: u32 = 10;

const NAME_TRIM: &[char] = &['\r', '\n', '\t', '\u{0B}', ' ', '.'];

/// Trim surrounding whitespace and dots, then append the root dot.
#[must_use]
pub fn to_fqdn(name: &str) -> String {
    format!("{}.", name.trim_matches(NAME_TRIM))
}

/// Like [`to_fqdn`], but an empty name stays empty.
#[must_use]
pub fn to_optional_fqdn(name: &str) -> String {
    let trimmed = name.trim_matches(NAME_TRIM);
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{trimmed}.")
    }
}

/// Sort direction of list endpoints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Ascending
    #[default]
    Asc,
    /// Descending
    Desc,
}

impl SortOrder {
    /// Parse case-insensitively; anything but `desc` is ascending.
    #[must_use]
    pub fn parse_lenient(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("desc") {
            Self::Desc
        } else {
            Self::Asc
        }
    }

    /// Query value.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sort key of list endpoints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKey {
    /// `uuid`
    Uuid,
    /// `name`
    Name,
    /// `project_id`
    ProjectId,
    /// `serial`
    Serial,
    /// `email`
    Email,
    /// `created_at`
    #[default]
    CreatedAt,
    /// `updated_at`
    UpdatedAt,
}

impl SortKey {
    /// Parse case-insensitively; unknown keys fall back to `created_at`.
    #[must_use]
    pub fn parse_lenient(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "uuid" => Self::Uuid,
            "name" => Self::Name,
            "project_id" => Self::ProjectId,
            "serial" => Self::Serial,
            "email" => Self::Email,
            "updated_at" => Self::UpdatedAt,
            _ => Self::CreatedAt,
        }
    }

    /// Query value.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Uuid => "uuid",
            Self::Name => "name",
            Self::ProjectId => "project_id",
            Self::Serial => "serial",
            Self::Email => "email",
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Paging and sorting of `GET /domains` and `GET /domains/{id}/records`.
///
/// Out-of-range values are clamped rather than rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListParams {
    /// Page size; values below one become [`DEFAULT_LIMIT`]
    pub limit: i64,
    /// Offset; negative values become zero
    pub offset: i64,
    /// Sort direction
    pub sort: SortOrder,
    /// Sort key
    pub key: SortKey,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            limit: i64::from(DEFAULT_LIMIT),
            offset: 0,
            sort: SortOrder::Asc,
            key: SortKey::CreatedAt,
        }
    }
}

impl ListParams {
    /// Build from raw values, clamping each one.
    #[must_use]
    pub fn new(limit: i64, offset: i64, sort: &str, key: &str) -> Self {
        Self {
            limit,
            offset,
            sort: SortOrder::parse_lenient(sort),
            key: SortKey::parse_lenient(key),
        }
    }

    /// Effective page size.
    #[must_use]
    pub fn effective_limit(&self) -> i64 {
        if self.limit < 1 {
            i64::from(DEFAULT_LIMIT)
        } else {
            self.limit
        }
    }

    /// Effective offset.
    #[must_use]
    pub fn effective_offset(&self) -> i64 {
        self.offset.max(0)
    }

    /// Convert the parameters into URL query pairs.
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut params = QueryParams::new();
        params.push("limit", self.effective_limit());
        params.push("offset", self.effective_offset());
        params.push("sort_type", self.sort);
        params.push("sort_key", self.key);
        params.into_pairs()
    }
}

/// A DNS zone.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Domain {
    /// Domain id
    pub uuid: DomainId,
    /// Fully qualified name with trailing dot
    pub name: String,
    /// Owning project id
    #[serde(default)]
    pub project_id: String,
    /// SOA serial
    #[serde(default)]
    pub serial: i64,
    /// Default TTL in seconds
    #[serde(default)]
    pub ttl: i64,
    /// SOA contact address
    #[serde(default)]
    pub email: String,
    /// Creation time
    #[serde(default, deserialize_with = "deserialize_lenient")]
    pub created_at: Option<DateTime<FixedOffset>>,
    /// Last update time
    #[serde(default, deserialize_with = "deserialize_lenient")]
    pub updated_at: Option<DateTime<FixedOffset>>,
}

impl Normalize for Domain {
    fn normalize_timestamps(&mut self, zone: &TimeZoneConfig) {
        zone.normalize_opt(&mut self.created_at);
        zone.normalize_opt(&mut self.updated_at);
    }
}

/// One page of domains.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DomainList {
    /// Domains on this page
    #[serde(default)]
    pub domains: Vec<Domain>,
    /// Total number of domains
    #[serde(default)]
    pub total_count: i64,
}

impl Normalize for DomainList {
    fn normalize_timestamps(&mut self, zone: &TimeZoneConfig) {
        self.domains.normalize_timestamps(zone);
    }
}

/// A resource record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Record {
    /// Record id
    pub uuid: RecordId,
    /// Owning domain id
    pub domain_uuid: DomainId,
    /// Fully qualified name with trailing dot
    pub name: String,
    /// Record type (`A`, `MX`, `SRV`, ...)
    #[serde(rename = "type")]
    pub record_type: String,
    /// Record data
    #[serde(default)]
    pub data: String,
    /// MX/SRV priority
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,
    /// SRV weight
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<i64>,
    /// SRV port
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<i64>,
    /// TTL in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<i64>,
    /// Creation time
    #[serde(default, deserialize_with = "deserialize_lenient")]
    pub created_at: Option<DateTime<FixedOffset>>,
    /// Last update time
    #[serde(default, deserialize_with = "deserialize_lenient")]
    pub updated_at: Option<DateTime<FixedOffset>>,
}

impl Normalize for Record {
    fn normalize_timestamps(&mut self, zone: &TimeZoneConfig) {
        zone.normalize_opt(&mut self.created_at);
        zone.normalize_opt(&mut self.updated_at);
    }
}

/// One page of records.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecordList {
    /// Records on this page
    #[serde(default)]
    pub records: Vec<Record>,
    /// Total number of records
    #[serde(default)]
    pub total_count: i64,
}

impl Normalize for RecordList {
    fn normalize_timestamps(&mut self, zone: &TimeZoneConfig) {
        self.records.normalize_timestamps(zone);
    }
}

/// Body of `POST /domains`.
#[derive(Debug, Clone, Serialize, Validate, PartialEq, Eq)]
pub struct CreateDomainRequest {
    /// Fully qualified name
    pub name: String,
    /// Default TTL in seconds
    pub ttl: u32,
    /// SOA contact address
    #[validate(email)]
    pub email: String,
}

impl CreateDomainRequest {
    /// Build a request, normalizing the name.
    #[must_use]
    pub fn new(name: &str, email: impl Into<String>, ttl: u32) -> Self {
        Self {
            name: to_fqdn(name),
            ttl,
            email: email.into(),
        }
    }
}

/// Body of `PUT /domains/{id}`.
#[derive(Debug, Clone, Serialize, Validate, PartialEq, Eq)]
pub struct UpdateDomainRequest {
    /// Default TTL in seconds
    pub ttl: u32,
    /// SOA contact address
    #[validate(email)]
    pub email: String,
}

/// Caller-facing record fields.
///
/// Converted into a [`RecordBody`] before sending: the name is normalized,
/// the type upper-cased and priority/weight/port dropped for types that do
/// not use them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordRequest {
    /// Record name, with or without trailing dot
    pub name: String,
    /// Record type, any case
    pub record_type: String,
    /// Record data
    pub data: String,
    /// Priority (MX and SRV)
    pub priority: Option<u16>,
    /// Weight (SRV)
    pub weight: Option<u16>,
    /// Port (SRV)
    pub port: Option<u16>,
    /// TTL in seconds
    pub ttl: Option<u32>,
}

impl RecordRequest {
    /// Record with name, type and data.
    pub fn new(
        name: impl Into<String>,
        record_type: impl Into<String>,
        data: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            record_type: record_type.into(),
            data: data.into(),
            ..Self::default()
        }
    }

    /// MX record.
    pub fn mx(name: impl Into<String>, exchange: impl Into<String>, priority: u16) -> Self {
        Self::new(name, "MX", exchange).with_priority(priority)
    }

    /// SRV record.
    pub fn srv(
        name: impl Into<String>,
        target: impl Into<String>,
        priority: u16,
        weight: u16,
        port: u16,
    ) -> Self {
        Self::new(name, "SRV", target)
            .with_priority(priority)
            .with_weight(weight)
            .with_port(port)
    }

    /// Set the priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: u16) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Set the weight.
    #[must_use]
    pub const fn with_weight(mut self, weight: u16) -> Self {
        self.weight = Some(weight);
        self
    }

    /// Set the port.
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Set the TTL.
    #[must_use]
    pub const fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Wire body for record creation; the name always gets a trailing dot.
    #[must_use]
    pub fn to_create_body(&self) -> RecordBody {
        self.to_body(to_fqdn(&self.name))
    }

    /// Wire body for record updates; an empty name is left out.
    #[must_use]
    pub fn to_update_body(&self) -> RecordBody {
        self.to_body(to_optional_fqdn(&self.name))
    }

    fn to_body(&self, name: String) -> RecordBody {
        let record_type = self.record_type.trim().to_ascii_uppercase();
        let (priority, weight, port) = match record_type.as_str() {
            "MX" => (self.priority, None, None),
            "SRV" => (self.priority, self.weight, self.port),
            _ => (None, None, None),
        };
        RecordBody {
            name,
            record_type,
            data: self.data.clone(),
            priority,
            weight,
            port,
            ttl: self.ttl,
        }
    }
}

/// Record body as sent to the API.
#[derive(Debug, Clone, Serialize, Validate, PartialEq, Eq)]
#[validate(schema(function = "validate_record_fields"))]
pub struct RecordBody {
    /// Normalized name
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Upper-cased type
    #[serde(rename = "type", skip_serializing_if = "String::is_empty")]
    pub record_type: String,
    /// Record data
    #[serde(skip_serializing_if = "String::is_empty")]
    pub data: String,
    /// Priority (MX and SRV only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<u16>,
    /// Weight (SRV only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<u16>,
    /// Port (SRV only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// TTL in seconds
    #[validate(range(min = 1))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,
}

fn validate_record_fields(body: &RecordBody) -> Result<(), ValidationError> {
    let problem = match body.record_type.as_str() {
        "MX" if body.priority.is_none() => Some("MX records require a priority"),
        "SRV" if body.priority.is_none() || body.weight.is_none() || body.port.is_none() => {
            Some("SRV records require priority, weight and port")
        }
        _ => None,
    };
    match problem {
        Some(message) => Err(ValidationError::new("record_fields").with_message(message.into())),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fqdn_normalization() {
        assert_eq!(to_fqdn("example.com"), "example.com.");
        assert_eq!(to_fqdn(" example.com.\r\n"), "example.com.");
        assert_eq!(to_fqdn("..www.example.com.."), "www.example.com.");
        assert_eq!(to_fqdn("\u{0B}\texample.com"), "example.com.");
        assert_eq!(to_optional_fqdn(" . "), "");
        assert_eq!(to_optional_fqdn("www"), "www.");
    }

    #[test]
    fn test_list_params_clamping() {
        let params = ListParams::new(0, -5, "DESC", "Name");
        assert_eq!(
            params.to_pairs(),
            vec![
                ("limit", "10".to_string()),
                ("offset", "0".to_string()),
                ("sort_type", "desc".to_string()),
                ("sort_key", "name".to_string()),
            ]
        );

        let params = ListParams::new(50, 20, "sideways", "ttl");
        let pairs = params.to_pairs();
        assert_eq!(pairs[0].1, "50");
        assert_eq!(pairs[1].1, "20");
        assert_eq!(pairs[2].1, "asc");
        assert_eq!(pairs[3].1, "created_at");
    }

    #[test]
    fn test_list_params_default() {
        let params = ListParams::default();
        assert_eq!(params.effective_limit(), 10);
        assert_eq!(params.sort, SortOrder::Asc);
        assert_eq!(params.key, SortKey::CreatedAt);
    }

    #[test]
    fn test_record_body_type_specific_fields() {
        let a = RecordRequest::new("www.example.com", "a", "203.0.113.1")
            .with_priority(10)
            .with_port(80);
        let body = a.to_create_body();
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({"name": "www.example.com.", "type": "A", "data": "203.0.113.1"})
        );

        let mx = RecordRequest::mx("example.com", "mail.example.com.", 10).with_weight(5);
        let body = mx.to_create_body();
        assert_eq!(body.priority, Some(10));
        assert_eq!(body.weight, None);

        let srv = RecordRequest::srv("_sip._tcp.example.com", "sip.example.com.", 10, 60, 5060)
            .with_ttl(3600);
        let value = serde_json::to_value(srv.to_create_body()).unwrap();
        assert_eq!(value["priority"], 10);
        assert_eq!(value["weight"], 60);
        assert_eq!(value["port"], 5060);
        assert_eq!(value["ttl"], 3600);
    }

    #[test]
    fn test_record_validation() {
        let srv = RecordRequest::new("_sip._tcp.example.com", "srv", "sip.example.com.")
            .with_priority(10)
            .with_weight(60);
        assert!(srv.to_create_body().validate().is_err());

        let mx = RecordRequest::new("example.com", "MX", "mail.example.com.");
        assert!(mx.to_create_body().validate().is_err());

        let txt = RecordRequest::new("example.com", "TXT", "v=spf1 -all");
        assert!(txt.to_create_body().validate().is_ok());

        let zero_ttl = RecordRequest::new("example.com", "A", "203.0.113.1").with_ttl(0);
        assert!(zero_ttl.to_create_body().validate().is_err());
    }

    #[test]
    fn test_update_body_omits_empty_fields() {
        let request = RecordRequest {
            data: "203.0.113.9".to_string(),
            ..RecordRequest::default()
        };
        assert_eq!(
            serde_json::to_value(request.to_update_body()).unwrap(),
            json!({"data": "203.0.113.9"})
        );
    }

    #[test]
    fn test_domain_request() {
        let request = CreateDomainRequest::new("example.com", "admin@example.com", 3600);
        assert_eq!(request.name, "example.com.");
        assert!(request.validate().is_ok());

        let bad = UpdateDomainRequest {
            ttl: 3600,
            email: "not-an-email".to_string(),
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_domain_parsing() {
        let raw = json!({
            "uuid": "0f0d2c3a-5b6e-4f70-8a9b-0c1d2e3f4a5b",
            "name": "example.com.",
            "project_id": "p-1",
            "serial": 1_714_521_600,
            "ttl": 3600,
            "email": "admin@example.com",
            "created_at": "2024-05-01T00:00:00Z",
            "updated_at": null
        });
        let mut domain: Domain = serde_json::from_value(raw).unwrap();
        domain.normalize_timestamps(&TimeZoneConfig::default());
        assert_eq!(
            domain.created_at.unwrap().to_rfc3339(),
            "2024-05-01T09:00:00+09:00"
        );
        assert!(domain.updated_at.is_none());
    }
}
