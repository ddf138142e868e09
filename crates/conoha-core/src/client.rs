//! Shared HTTP client used by every ConoHa resource client.
//!
//! Every resource operation follows the same shape: resolve the service base
//! URL, join an absolute path, attach `X-Auth-Token`, send, compare the status
//! against the one status the operation expects, then either decode the body
//! or turn it into an [`Error::Api`] through the service's [`ErrorNormalizer`].
//! [`ServiceClient`] implements that shape once.

use bytes::Bytes;
use reqwest::{Body, Client, ClientBuilder, Method, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::endpoint::ServiceType;
use crate::error::{Error, ErrorNormalizer, Result};
use crate::session::Session;
use crate::time::{Normalize, TimeZoneConfig};

/// Header carrying the bearer token on every request.
pub const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";

/// Content type of JSON payloads.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Content type of raw binary uploads.
pub const OCTET_STREAM_CONTENT_TYPE: &str = "application/octet-stream";

const DEFAULT_USER_AGENT: &str = concat!("conoha-rust/", env!("CARGO_PKG_VERSION"));

/// HTTP client configuration.
///
/// Nothing here enables retries or pooling beyond what `reqwest` already does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Request timeout; the transport default applies when `None`
    pub timeout: Option<Duration>,

    /// User-Agent override
    pub user_agent: Option<String>,

    /// Whether to verify TLS certificates
    pub tls_verify: bool,

    /// Timezone that response timestamps are converted to
    pub time_zone: TimeZoneConfig,

    /// Enable request/response logging
    pub enable_logging: bool,
}

impl ClientConfig {
    /// Create a new client configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            timeout: None,
            user_agent: None,
            tls_verify: true,
            time_zone: TimeZoneConfig::default(),
            enable_logging: true,
        }
    }

    /// Set request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the User-Agent header.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Enable or disable TLS certificate verification.
    #[must_use]
    pub const fn with_tls_verify(mut self, verify: bool) -> Self {
        self.tls_verify = verify;
        self
    }

    /// Set the timezone that timestamps are converted to.
    #[must_use]
    pub const fn with_time_zone(mut self, zone: TimeZoneConfig) -> Self {
        self.time_zone = zone;
        self
    }

    /// Enable or disable logging.
    #[must_use]
    pub const fn with_logging(mut self, enabled: bool) -> Self {
        self.enable_logging = enabled;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for [`ServiceClient`].
#[derive(Debug, Clone)]
pub struct ServiceClientBuilder {
    service: ServiceType,
    base_url: Url,
    token: Option<SecretString>,
    http_config: ClientConfig,
    user_agent: Option<String>,
    normalizer: ErrorNormalizer,
}

impl ServiceClientBuilder {
    /// Create a builder for the specified service and base URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEndpoint`] if the URL cannot be parsed.
    pub fn new(service: ServiceType, base_url: impl AsRef<str>) -> Result<Self> {
        let base_url = Url::parse(base_url.as_ref()).map_err(|err| {
            Error::InvalidEndpoint(format!(
                "Invalid {service} URL `{}`: {err}",
                base_url.as_ref()
            ))
        })?;
        Ok(Self::from_url(service, base_url))
    }

    /// Create a builder from an already parsed base URL.
    #[must_use]
    pub fn from_url(service: ServiceType, base_url: Url) -> Self {
        Self {
            service,
            base_url,
            token: None,
            http_config: ClientConfig::new(),
            user_agent: None,
            normalizer: ErrorNormalizer::default(),
        }
    }

    /// Create a builder that reads the base URL and token from a session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingEndpoint`] if the session has no entry for `service`.
    pub fn from_session(service: ServiceType, session: &Session) -> Result<Self> {
        let base_url = session.endpoint(service)?.clone();
        Ok(Self::from_url(service, base_url).with_token(session.token()))
    }

    /// Configure the X-Auth-Token header.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(SecretString::from(token.into()));
        self
    }

    /// Override the HTTP client configuration.
    #[must_use]
    pub fn with_http_config(mut self, config: ClientConfig) -> Self {
        self.http_config = config;
        self
    }

    /// Set the default User-Agent; [`ClientConfig::user_agent`] takes precedence.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Set the normalizer used for error bodies.
    #[must_use]
    pub fn with_error_normalizer(mut self, normalizer: ErrorNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// Build the client.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] if the HTTP client cannot be created.
    pub fn build(self) -> Result<ServiceClient> {
        let user_agent = self
            .http_config
            .user_agent
            .clone()
            .or(self.user_agent)
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());

        let mut builder = ClientBuilder::new().user_agent(user_agent);

        if let Some(timeout) = self.http_config.timeout {
            builder = builder.timeout(timeout);
        }

        if !self.http_config.tls_verify {
            warn!(service = %self.service, "TLS verification disabled");
            builder = builder.danger_accept_invalid_certs(true);
        }

        let http = builder.build().map_err(|err| {
            Error::ConfigError(format!(
                "Failed to build {} HTTP client: {err}",
                self.service
            ))
        })?;

        Ok(ServiceClient {
            http,
            service: self.service,
            base_url: self.base_url,
            token: self.token,
            normalizer: self.normalizer,
            time_zone: self.http_config.time_zone,
            enable_logging: self.http_config.enable_logging,
        })
    }
}

/// HTTP client bound to one service base URL and one token snapshot.
#[derive(Clone)]
pub struct ServiceClient {
    http: Client,
    service: ServiceType,
    base_url: Url,
    token: Option<SecretString>,
    normalizer: ErrorNormalizer,
    time_zone: TimeZoneConfig,
    enable_logging: bool,
}

impl std::fmt::Debug for ServiceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceClient")
            .field("service", &self.service)
            .field("base_url", &self.base_url.as_str())
            .field("authenticated", &self.token.is_some())
            .finish_non_exhaustive()
    }
}

impl ServiceClient {
    /// Return the base URL.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Return the service this client talks to.
    #[must_use]
    pub const fn service(&self) -> ServiceType {
        self.service
    }

    /// Return the timezone applied to response timestamps.
    #[must_use]
    pub const fn time_zone(&self) -> &TimeZoneConfig {
        &self.time_zone
    }

    /// Return the normalizer applied to error bodies.
    #[must_use]
    pub const fn error_normalizer(&self) -> &ErrorNormalizer {
        &self.normalizer
    }

    /// Resolve an absolute API path (e.g. `/v2.1/servers`) against the base URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEndpoint`] if the path cannot be joined.
    pub fn url(&self, path: &str) -> Result<Url> {
        self.base_url.join(path).map_err(|err| {
            Error::InvalidEndpoint(format!("Invalid {} path `{path}`: {err}", self.service))
        })
    }

    /// Send one request and check it returned `expected`.
    ///
    /// `customize` adds headers and the body. On any other status the body is
    /// normalized into [`Error::Api`].
    ///
    /// # Errors
    ///
    /// Returns transport errors unchanged and [`Error::Api`] on a status mismatch.
    pub async fn execute<F>(
        &self,
        method: Method,
        path: &str,
        params: &[(&'static str, String)],
        customize: F,
        expected: StatusCode,
    ) -> Result<Response>
    where
        F: FnOnce(RequestBuilder) -> RequestBuilder,
    {
        self.dispatch(method, path, params, customize, |status| status == expected)
            .await
    }

    /// Send one request and accept any `2xx` status.
    ///
    /// # Errors
    ///
    /// Returns transport errors unchanged and [`Error::Api`] on a non-success status.
    pub async fn execute_success<F>(
        &self,
        method: Method,
        path: &str,
        params: &[(&'static str, String)],
        customize: F,
    ) -> Result<Response>
    where
        F: FnOnce(RequestBuilder) -> RequestBuilder,
    {
        self.dispatch(method, path, params, customize, |status| {
            status.is_success()
        })
        .await
    }

    async fn dispatch<F, A>(
        &self,
        method: Method,
        path: &str,
        params: &[(&'static str, String)],
        customize: F,
        accept: A,
    ) -> Result<Response>
    where
        F: FnOnce(RequestBuilder) -> RequestBuilder,
        A: Fn(StatusCode) -> bool,
    {
        let url = self.url(path)?;
        if self.enable_logging {
            debug!(service = %self.service, %method, %url, ?params, "sending request");
        }

        let mut request = self.http.request(method.clone(), url);
        if !params.is_empty() {
            request = request.query(params);
        }
        if let Some(token) = &self.token {
            request = request.header(AUTH_TOKEN_HEADER, token.expose_secret());
        }
        request = customize(request);

        let response = request.send().await?;
        let status = response.status();

        if accept(status) {
            if self.enable_logging {
                debug!(service = %self.service, %method, path, %status, "request succeeded");
            }
            return Ok(response);
        }

        let body = response.bytes().await.unwrap_or_default();
        let error = self.normalizer.normalize(&body);
        if self.enable_logging {
            debug!(
                service = %self.service,
                %method,
                path,
                %status,
                code = error.code(),
                "unexpected status"
            );
        }
        Err(Error::Api {
            status: status.as_u16(),
            error,
        })
    }

    /// Send an optional JSON body and decode a JSON response.
    ///
    /// Timestamps in the result are converted to the configured timezone.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] if the success body does not match `R`.
    pub async fn send_json<B, R>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        params: &[(&'static str, String)],
        expected: StatusCode,
    ) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned + Normalize,
    {
        let response = self
            .execute(
                method,
                path,
                params,
                |request| json_request(request, body),
                expected,
            )
            .await?;

        let bytes = response.bytes().await?;
        let mut value: R = serde_json::from_slice(&bytes).map_err(|err| {
            Error::Decode(format!(
                "Failed to parse {} response for `{path}`: {err}",
                self.service
            ))
        })?;
        value.normalize_timestamps(&self.time_zone);
        Ok(value)
    }

    /// Send an optional JSON body and ignore the response body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Api`] if the status differs from `expected`.
    pub async fn send_empty<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        expected: StatusCode,
    ) -> Result<()>
    where
        B: Serialize + ?Sized,
    {
        self.execute(
            method,
            path,
            &[],
            |request| json_request(request, body),
            expected,
        )
        .await
        .map(|_| ())
    }

    /// Upload raw bytes with the given content type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Api`] if the status differs from `expected`.
    pub async fn send_bytes(
        &self,
        method: Method,
        path: &str,
        data: Bytes,
        content_type: &str,
        expected: StatusCode,
    ) -> Result<()> {
        if self.enable_logging {
            debug!(service = %self.service, path, size = data.len(), "uploading bytes");
        }
        let length = data.len() as u64;
        self.send_body(method, path, data, Some(length), content_type, expected)
            .await
    }

    /// Upload a streamed body with the given content type.
    ///
    /// `content_length` is sent when known; otherwise the body goes out chunked.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Api`] if the status differs from `expected`.
    pub async fn send_body(
        &self,
        method: Method,
        path: &str,
        body: impl Into<Body>,
        content_length: Option<u64>,
        content_type: &str,
        expected: StatusCode,
    ) -> Result<()> {
        let body = body.into();
        self.execute(
            method,
            path,
            &[],
            |request| {
                let request = request
                    .header(reqwest::header::ACCEPT, JSON_CONTENT_TYPE)
                    .header(reqwest::header::CONTENT_TYPE, content_type);
                let request = match content_length {
                    Some(length) => request.header(reqwest::header::CONTENT_LENGTH, length),
                    None => request,
                };
                request.body(body)
            },
            expected,
        )
        .await
        .map(|_| ())
    }
}

fn json_request<B>(request: RequestBuilder, body: Option<&B>) -> RequestBuilder
where
    B: Serialize + ?Sized,
{
    let request = request.header(reqwest::header::ACCEPT, JSON_CONTENT_TYPE);
    match body {
        Some(payload) => request.json(payload),
        None => request,
    }
}
