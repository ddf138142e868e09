//! Error types for ConoHa operations.
//!
//! This module provides the error type shared by every ConoHa client and the
//! [`ErrorNormalizer`] that turns a non-success response body into a typed
//! [`ApiError`].

use crate::endpoint::ServiceType;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;
use tracing::{debug, warn};

/// `InvalidParameter` as reported by the DNS service.
pub const ERR_INVALID_PARAMETER: i64 = 2047;
/// `NotInParentDomain` as reported by the DNS service.
pub const ERR_NOT_IN_PARENT_DOMAIN: i64 = 2101;
/// `RecordSetDuplicate` as reported by the DNS service.
pub const ERR_RECORD_SET_DUPLICATE: i64 = 2110;

/// Main error type for ConoHa operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Could not connect to the service
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Operation timed out
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Any other transport level failure
    #[error("HTTP transport failed: {0}")]
    Transport(String),

    /// The service answered with an unexpected status code
    #[error("API error (HTTP {status}): {error}")]
    Api {
        /// HTTP status code returned by the service
        status: u16,
        /// Normalized error body
        error: ApiError,
    },

    /// A successful response body could not be decoded
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// A timestamp in a response could not be parsed
    #[error("Invalid timestamp: {0}")]
    TimestampParse(String),

    /// The identity service did not return a subject token
    #[error("Token exchange response carried no x-subject-token header")]
    MissingToken,

    /// The session has no endpoint for the requested service
    #[error("No endpoint for service `{0}` in session catalog")]
    MissingEndpoint(ServiceType),

    /// Invalid endpoint URL or path
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Invalid UUID format
    #[error("Invalid UUID: {0}")]
    InvalidUuid(String),

    /// Request rejected before it was sent
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Local I/O failure (e.g. reading an upload)
    #[error("I/O error: {0}")]
    Io(String),
}

/// Specialized result type for ConoHa operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns the error code for this error type.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            Self::Timeout(_) => "TIMEOUT",
            Self::Transport(_) => "TRANSPORT_ERROR",
            Self::Api { .. } => "API_ERROR",
            Self::Decode(_) => "DECODE_ERROR",
            Self::TimestampParse(_) => "TIMESTAMP_PARSE_ERROR",
            Self::MissingToken => "MISSING_TOKEN",
            Self::MissingEndpoint(_) => "MISSING_ENDPOINT",
            Self::InvalidEndpoint(_) => "INVALID_ENDPOINT",
            Self::InvalidUuid(_) => "INVALID_UUID",
            Self::ValidationError(_) => "VALIDATION_ERROR",
            Self::ConfigError(_) => "CONFIG_ERROR",
            Self::Io(_) => "IO_ERROR",
        }
    }

    /// Returns the normalized API error when the service rejected the call.
    #[must_use]
    pub const fn api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Api { error, .. } => Some(error),
            _ => None,
        }
    }

    /// Returns the HTTP status when the service rejected the call.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns true for failures that happened before a response was received.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::ServiceUnavailable(_) | Self::Timeout(_) | Self::Transport(_)
        )
    }
}

// Conversions from external error types
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() {
            Self::ServiceUnavailable(err.to_string())
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidEndpoint(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

impl From<chrono::ParseError> for Error {
    fn from(err: chrono::ParseError) -> Self {
        Self::TimestampParse(err.to_string())
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::ValidationError(err.to_string())
    }
}

impl From<uuid::Error> for Error {
    fn from(err: uuid::Error) -> Self {
        Self::InvalidUuid(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Error reported by the ConoHa API, reduced to a numeric code and a message.
///
/// Only [`ErrorNormalizer`] builds these. A code of `0` means the body did not
/// carry a recognised code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiError {
    code: i64,
    message: String,
}

impl ApiError {
    /// Normalized domain code, or `0` when unrecognised.
    #[must_use]
    pub const fn code(&self) -> i64 {
        self.code
    }

    /// Message reported by the service (may be empty).
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns true when no code could be recovered from the body.
    #[must_use]
    pub const fn is_unrecognized(&self) -> bool {
        self.code == 0
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Code:{}, Message:{}", self.code, self.message)
    }
}

/// Mapping from string error codes to numeric domain codes.
///
/// Each service family may report its own set of symbolic codes, so every
/// resource client owns its table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorCodeTable {
    codes: HashMap<String, i64>,
}

impl ErrorCodeTable {
    /// A table with no symbolic codes.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// The symbolic codes returned by the DNS service.
    #[must_use]
    pub fn dns() -> Self {
        Self::empty()
            .with_code("InvalidParameter", ERR_INVALID_PARAMETER)
            .with_code("NotInParentDomain", ERR_NOT_IN_PARENT_DOMAIN)
            .with_code("RecordSetDuplicate", ERR_RECORD_SET_DUPLICATE)
    }

    /// Register an additional symbolic code.
    #[must_use]
    pub fn with_code(mut self, name: impl Into<String>, code: i64) -> Self {
        self.codes.insert(name.into(), code);
        self
    }

    /// Look up a symbolic code.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<i64> {
        self.codes.get(name).copied()
    }
}

/// Converts error response bodies into [`ApiError`] values.
///
/// Accepted shapes:
///
/// 1. `{"code": <int>, "error": <string>}`
/// 2. `{"code": <string>, "message": <string>}` with the string looked up in
///    the [`ErrorCodeTable`]
/// 3. `{"<faultName>": {"code": <int>, "message": <string>}}` as sent by the
///    compute service
///
/// Anything else, including bodies that are not JSON, yields a zero-valued
/// [`ApiError`]. Normalization never fails: the caller already knows the call
/// failed and only wants the details.
#[derive(Debug, Clone, Default)]
pub struct ErrorNormalizer {
    table: ErrorCodeTable,
}

impl ErrorNormalizer {
    /// Create a normalizer using the given code table.
    #[must_use]
    pub const fn new(table: ErrorCodeTable) -> Self {
        Self { table }
    }

    /// Normalizer for the DNS service.
    #[must_use]
    pub fn dns() -> Self {
        Self::new(ErrorCodeTable::dns())
    }

    /// Access the code table.
    #[must_use]
    pub const fn table(&self) -> &ErrorCodeTable {
        &self.table
    }

    /// Normalize a raw error body.
    #[must_use]
    pub fn normalize(&self, body: &[u8]) -> ApiError {
        let value: Value = match serde_json::from_slice(body) {
            Ok(value) => value,
            Err(err) => {
                debug!(error = %err, "error body is not valid JSON");
                return ApiError::default();
            }
        };

        let Some(object) = value.as_object() else {
            debug!("error body is not a JSON object");
            return ApiError::default();
        };
        let object = unwrap_fault(object);

        let code = match object.get("code") {
            Some(Value::Number(number)) => number.as_i64().unwrap_or_default(),
            Some(Value::String(name)) => self.lookup_symbolic(name, body),
            _ => 0,
        };

        let message = ["message", "error"]
            .iter()
            .find_map(|key| object.get(*key).and_then(Value::as_str))
            .unwrap_or_default()
            .to_string();

        ApiError { code, message }
    }

    fn lookup_symbolic(&self, name: &str, body: &[u8]) -> i64 {
        if let Some(code) = self.table.lookup(name) {
            return code;
        }
        if let Ok(code) = name.parse::<i64>() {
            return code;
        }
        warn!(
            code = %name,
            body = %String::from_utf8_lossy(body),
            "unknown API error code"
        );
        0
    }
}

// `{"itemNotFound": {"code": 404, "message": "..."}}` -> inner object
fn unwrap_fault(object: &Map<String, Value>) -> &Map<String, Value> {
    if object.contains_key("code") || object.len() != 1 {
        return object;
    }
    match object.values().next() {
        Some(Value::Object(inner))
            if inner.contains_key("code") || inner.contains_key("message") =>
        {
            inner
        }
        _ => object,
    }
}
