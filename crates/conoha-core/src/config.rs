//! Configuration structures for ConoHa clients.
//!
//! This module provides the top-level configuration for connecting to the
//! ConoHa identity service, including validation and environment loading.

use crate::client::ClientConfig;
use crate::time::{TimeZoneConfig, DEFAULT_UTC_OFFSET_SECS};
use crate::Error;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;
use validator::Validate;

/// Environment variable holding the identity service URL.
pub const ENV_IDENTITY_URL: &str = "CONOHA_IDENTITY_URL";
/// Environment variable holding the request timeout in seconds.
pub const ENV_TIMEOUT_SECS: &str = "CONOHA_TIMEOUT_SECS";
/// Environment variable holding the timestamp offset in seconds east of UTC.
pub const ENV_UTC_OFFSET_SECS: &str = "CONOHA_UTC_OFFSET_SECS";
/// Environment variable controlling TLS certificate verification.
pub const ENV_TLS_VERIFY: &str = "CONOHA_TLS_VERIFY";

/// Configuration for a ConoHa client instance.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ConohaConfig {
    /// Identity service base URL (e.g. `https://identity.c3j1.conoha.io/v3`)
    #[validate(url)]
    pub identity_url: String,

    /// Optional request timeout in seconds; the transport default applies when unset
    #[validate(range(min = 1, max = 600))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,

    /// Whether to verify TLS certificates
    #[serde(default = "default_tls_verify")]
    pub tls_verify: bool,

    /// Offset, in seconds east of UTC, that timestamps are converted to
    #[validate(range(min = -86_399, max = 86_399))]
    #[serde(default = "default_utc_offset_secs")]
    pub utc_offset_secs: i32,

    /// Optional User-Agent override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

const fn default_tls_verify() -> bool {
    true
}

const fn default_utc_offset_secs() -> i32 {
    DEFAULT_UTC_OFFSET_SECS
}

impl ConohaConfig {
    /// Create a new configuration for the given identity endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or validation fails.
    pub fn new(identity_url: impl Into<String>) -> Result<Self, Error> {
        let config = Self {
            identity_url: identity_url.into(),
            request_timeout_secs: None,
            tls_verify: default_tls_verify(),
            utc_offset_secs: default_utc_offset_secs(),
            user_agent: None,
        };

        config.validated()
    }

    /// Load configuration from `CONOHA_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if `CONOHA_IDENTITY_URL` is missing or any value is malformed.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let identity_url = lookup(ENV_IDENTITY_URL)
            .ok_or_else(|| Error::ConfigError(format!("{ENV_IDENTITY_URL} is not set")))?;

        let mut config = Self {
            identity_url,
            request_timeout_secs: None,
            tls_verify: default_tls_verify(),
            utc_offset_secs: default_utc_offset_secs(),
            user_agent: None,
        };

        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            config.request_timeout_secs = Some(parse_env(ENV_TIMEOUT_SECS, &raw)?);
        }
        if let Some(raw) = lookup(ENV_UTC_OFFSET_SECS) {
            config.utc_offset_secs = parse_env(ENV_UTC_OFFSET_SECS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_TLS_VERIFY) {
            config.tls_verify = parse_env(ENV_TLS_VERIFY, &raw)?;
        }

        config.validated()
    }

    fn validated(self) -> Result<Self, Error> {
        self.validate()
            .map_err(|e| Error::ConfigError(format!("Invalid configuration: {}", e)))?;
        Ok(self)
    }

    /// Set the request timeout in seconds.
    #[must_use]
    pub const fn with_timeout(mut self, seconds: u64) -> Self {
        self.request_timeout_secs = Some(seconds);
        self
    }

    /// Set whether to verify TLS certificates.
    #[must_use]
    pub const fn with_tls_verify(mut self, verify: bool) -> Self {
        self.tls_verify = verify;
        self
    }

    /// Set the timestamp offset in seconds east of UTC.
    #[must_use]
    pub const fn with_utc_offset(mut self, seconds: i32) -> Self {
        self.utc_offset_secs = seconds;
        self
    }

    /// Override the User-Agent header.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Get the request timeout as a Duration, if set.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    /// Parse and validate the identity URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be parsed.
    pub fn parse_identity_url(&self) -> Result<Url, Error> {
        Url::parse(&self.identity_url)
            .map_err(|e| Error::ConfigError(format!("Invalid identity URL: {}", e)))
    }

    /// Timezone that response timestamps are converted to.
    ///
    /// # Errors
    ///
    /// Returns an error if the offset is out of range.
    pub fn time_zone(&self) -> Result<TimeZoneConfig, Error> {
        TimeZoneConfig::new(self.utc_offset_secs)
    }

    /// Transport configuration derived from this configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the offset is out of range.
    pub fn client_config(&self) -> Result<ClientConfig, Error> {
        let mut config = ClientConfig::new()
            .with_tls_verify(self.tls_verify)
            .with_time_zone(self.time_zone()?);
        if let Some(timeout) = self.timeout() {
            config = config.with_timeout(timeout);
        }
        if let Some(user_agent) = &self.user_agent {
            config = config.with_user_agent(user_agent.clone());
        }
        Ok(config)
    }
}

fn parse_env<T>(key: &str, raw: &str) -> Result<T, Error>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| Error::ConfigError(format!("Invalid value for {key}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_config_new() {
        let config = ConohaConfig::new("https://identity.c3j1.conoha.io/v3").unwrap();
        assert_eq!(config.identity_url, "https://identity.c3j1.conoha.io/v3");
        assert!(config.tls_verify);
        assert!(config.request_timeout_secs.is_none());
        assert_eq!(config.utc_offset_secs, 32_400);
    }

    #[test]
    fn test_config_invalid_url() {
        assert!(ConohaConfig::new("not-a-url").is_err());
    }

    #[test]
    fn test_config_builder() {
        let config = ConohaConfig::new("https://identity.example.com")
            .unwrap()
            .with_timeout(45)
            .with_tls_verify(false)
            .with_utc_offset(0)
            .with_user_agent("my-tool/1.0");

        assert_eq!(config.timeout(), Some(Duration::from_secs(45)));
        assert!(!config.tls_verify);
        assert_eq!(config.time_zone().unwrap(), TimeZoneConfig::utc());
        assert_eq!(config.user_agent.as_deref(), Some("my-tool/1.0"));
    }

    #[test]
    fn test_config_validation_ranges() {
        let mut config = ConohaConfig::new("https://identity.example.com").unwrap();
        config.request_timeout_secs = Some(0);
        assert!(config.validate().is_err());

        config.request_timeout_secs = Some(30);
        config.utc_offset_secs = 86_400;
        assert!(config.validate().is_err());

        config.utc_offset_secs = -3600;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_identity_url() {
        let config = ConohaConfig::new("https://identity.example.com:8443/v3").unwrap();
        let url = config.parse_identity_url().unwrap();
        assert_eq!(url.host_str(), Some("identity.example.com"));
        assert_eq!(url.port(), Some(8443));
        assert_eq!(url.path(), "/v3");
    }

    #[test]
    fn test_from_lookup() {
        let config = ConohaConfig::from_lookup(lookup_from(&[
            (ENV_IDENTITY_URL, "https://identity.example.com/v3"),
            (ENV_TIMEOUT_SECS, "20"),
            (ENV_UTC_OFFSET_SECS, "0"),
            (ENV_TLS_VERIFY, "false"),
        ]))
        .unwrap();

        assert_eq!(config.request_timeout_secs, Some(20));
        assert_eq!(config.utc_offset_secs, 0);
        assert!(!config.tls_verify);
    }

    #[test]
    fn test_from_lookup_requires_identity_url() {
        let result = ConohaConfig::from_lookup(lookup_from(&[]));
        assert!(matches!(result, Err(Error::ConfigError(_))));
    }

    #[test]
    fn test_from_lookup_rejects_garbage() {
        let result = ConohaConfig::from_lookup(lookup_from(&[
            (ENV_IDENTITY_URL, "https://identity.example.com/v3"),
            (ENV_TIMEOUT_SECS, "soon"),
        ]));
        assert!(matches!(result, Err(Error::ConfigError(_))));
    }

    #[test]
    fn test_client_config_derivation() {
        let config = ConohaConfig::new("https://identity.example.com")
            .unwrap()
            .with_timeout(10)
            .with_utc_offset(3600);
        let client_config = config.client_config().unwrap();
        assert_eq!(client_config.timeout, Some(Duration::from_secs(10)));
        assert_eq!(client_config.time_zone.offset().local_minus_utc(), 3600);
    }

    #[test]
    fn test_config_serialization() {
        let config = ConohaConfig::new("https://identity.example.com")
            .unwrap()
            .with_timeout(30);
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: ConohaConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config.identity_url, deserialized.identity_url);
        assert_eq!(config.request_timeout_secs, deserialized.request_timeout_secs);

        let minimal: ConohaConfig =
            serde_json::from_str(r#"{"identity_url": "https://identity.example.com"}"#).unwrap();
        assert!(minimal.tls_verify);
        assert_eq!(minimal.utc_offset_secs, DEFAULT_UTC_OFFSET_SECS);
    }
}
