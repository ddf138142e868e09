//! Walks a token response body into a [`Session`].
//!
//! The body is read as an untyped [`serde_json::Value`]. Identity fields and
//! timestamps are required, the catalog is lenient: entries with unknown
//! types, no endpoints or no parseable URL are skipped.

use conoha_core::{EndpointTable, Error, Result, ServiceType, Session, TimeZoneConfig};
use serde_json::{Map, Value};
use tracing::debug;
use url::Url;

/// Build a session from a token response body and the subject token.
///
/// # Errors
///
/// Returns [`Error::Decode`] if there is no `token` object and
/// [`Error::TimestampParse`] if `issued_at` or `expires_at` is missing or
/// not RFC 3339.
pub fn session_from_body(body: &Value, token: &str, zone: &TimeZoneConfig) -> Result<Session> {
    let token_doc = body
        .get("token")
        .and_then(Value::as_object)
        .ok_or_else(|| Error::Decode("token response has no `token` object".to_string()))?;

    let issued_at = zone.parse_rfc3339(required_str(token_doc, "issued_at")?)?;
    let expires_at = zone.parse_rfc3339(required_str(token_doc, "expires_at")?)?;

    let user = token_doc.get("user");
    let project = token_doc.get("project");

    let catalog = token_doc
        .get("catalog")
        .or_else(|| body.get("catalog"))
        .and_then(Value::as_array)
        .map(|entries| resolve_catalog(entries))
        .unwrap_or_default();

    Ok(Session::builder(zone)
        .user_id(nested_str(user, "id"))
        .user_name(nested_str(user, "name"))
        .tenant_id(nested_str(project, "id"))
        .tenant_name(nested_str(project, "name"))
        .token(token)
        .issued_at(issued_at)
        .expires_at(expires_at)
        .endpoints(catalog)
        .build())
}

/// Resolve catalog entries into an endpoint table.
///
/// The first parseable URL of the first entry of each recognised type wins.
#[must_use]
pub fn resolve_catalog(entries: &[Value]) -> EndpointTable {
    let mut table = EndpointTable::new();

    for entry in entries {
        let Some(tag) = entry.get("type").and_then(Value::as_str) else {
            debug!("skipping catalog entry without a type");
            continue;
        };
        let Some(service) = ServiceType::from_catalog_type(tag) else {
            debug!(tag, "skipping unrecognised catalog type");
            continue;
        };
        let Some(url) = first_url(entry) else {
            debug!(tag, "skipping catalog entry without a usable URL");
            continue;
        };
        if !table.set_if_absent(service, url) {
            debug!(tag, "ignoring duplicate catalog entry");
        }
    }

    table
}

fn first_url(entry: &Value) -> Option<Url> {
    match entry.get("endpoints")? {
        Value::Array(endpoints) => endpoints
            .iter()
            .filter_map(|endpoint| endpoint.get("url").and_then(Value::as_str))
            .find_map(|raw| Url::parse(raw).ok()),
        Value::Object(endpoint) => endpoint
            .get("url")
            .and_then(Value::as_str)
            .and_then(|raw| Url::parse(raw).ok()),
        _ => None,
    }
}

fn required_str<'a>(doc: &'a Map<String, Value>, key: &str) -> Result<&'a str> {
    doc.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| Error::TimestampParse(format!("token response has no `{key}`")))
}

fn nested_str(parent: Option<&Value>, key: &str) -> String {
    parent
        .and_then(|value| value.get(key))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body_with_catalog(catalog: Value) -> Value {
        json!({
            "token": {
                "issued_at": "2024-05-01T00:00:00.000000Z",
                "expires_at": "2024-05-02T00:00:00.000000Z",
                "user": {"id": "u-1", "name": "gncu12345678"},
                "project": {"id": "t-1", "name": "gnct12345678"},
                "catalog": catalog
            }
        })
    }

    #[test]
    fn test_session_fields() {
        let body = body_with_catalog(json!([]));
        let session = session_from_body(&body, "abc123", &TimeZoneConfig::default()).unwrap();

        assert_eq!(session.token(), "abc123");
        assert_eq!(session.user_id(), "u-1");
        assert_eq!(session.user_name(), "gncu12345678");
        assert_eq!(session.tenant_id(), "t-1");
        assert_eq!(session.tenant_name(), "gnct12345678");
        assert_eq!(session.issued_at().to_rfc3339(), "2024-05-01T09:00:00+09:00");
        assert_eq!(session.expires_at().to_rfc3339(), "2024-05-02T09:00:00+09:00");
        assert!(session.endpoints().is_empty());
    }

    #[test]
    fn test_catalog_mapping() {
        let body = body_with_catalog(json!([
            {"type": "compute", "endpoints": [{"url": "https://compute.example.com/v2.1"}]},
            {"type": "object-store", "endpoints": [{"url": "https://object.example.com/v1"}]},
            {"type": "volumev3", "endpoints": [{"url": "https://block.example.com/v3"}]},
            {"type": "foo", "endpoints": [{"url": "https://foo.example.com"}]}
        ]));
        let session = session_from_body(&body, "t", &TimeZoneConfig::default()).unwrap();
        let endpoints = session.endpoints();

        assert_eq!(endpoints.len(), 3);
        assert_eq!(
            endpoints.get(ServiceType::Compute).unwrap().as_str(),
            "https://compute.example.com/v2.1"
        );
        assert!(endpoints.get(ServiceType::ObjectStorage).is_some());
        assert!(endpoints.get(ServiceType::Volume).is_some());
    }

    #[test]
    fn test_malformed_entries_are_skipped() {
        let entries = json!([
            {"endpoints": [{"url": "https://untyped.example.com"}]},
            {"type": "dns"},
            {"type": "dns", "endpoints": "nope"},
            {"type": "image", "endpoints": [{"url": "not a url"}, {"interface": "public"}]},
            {
                "type": "image",
                "endpoints": [{"url": "::bad"}, {"url": "https://image.example.com"}]
            },
            {"type": "network", "endpoints": {"url": "https://network.example.com"}}
        ]);
        let table = resolve_catalog(entries.as_array().unwrap());

        assert!(table.get(ServiceType::Dns).is_none());
        assert_eq!(
            table.get(ServiceType::Image).unwrap().as_str(),
            "https://image.example.com/"
        );
        assert!(table.get(ServiceType::Network).is_some());
    }

    #[test]
    fn test_first_entry_wins() {
        let entries = json!([
            {"type": "dns", "endpoints": [{"url": "https://dns-1.example.com"}]},
            {"type": "dns", "endpoints": [{"url": "https://dns-2.example.com"}]}
        ]);
        let table = resolve_catalog(entries.as_array().unwrap());
        assert_eq!(
            table.get(ServiceType::Dns).unwrap().host_str(),
            Some("dns-1.example.com")
        );
    }

    #[test]
    fn test_top_level_catalog_fallback() {
        let body = json!({
            "token": {
                "issued_at": "2024-05-01T00:00:00Z",
                "expires_at": "2024-05-02T00:00:00Z"
            },
            "catalog": [
                {"type": "identity", "endpoints": [{"url": "https://identity.example.com/v3"}]}
            ]
        });
        let session = session_from_body(&body, "t", &TimeZoneConfig::default()).unwrap();
        assert!(session.endpoint(ServiceType::Identity).is_ok());
        assert_eq!(session.user_id(), "");
    }

    #[test]
    fn test_bad_timestamps_fail() {
        let mut body = body_with_catalog(json!([]));
        body["token"]["expires_at"] = json!("tomorrow");
        let result = session_from_body(&body, "t", &TimeZoneConfig::default());
        assert!(matches!(result, Err(Error::TimestampParse(_))));

        body["token"]
            .as_object_mut()
            .unwrap()
            .remove("issued_at");
        let result = session_from_body(&body, "t", &TimeZoneConfig::default());
        assert!(matches!(result, Err(Error::TimestampParse(_))));
    }

    #[test]
    fn test_missing_token_object() {
        let result = session_from_body(&json!({"catalog": []}), "t", &TimeZoneConfig::default());
        assert!(matches!(result, Err(Error::Decode(_))));
    }
}
