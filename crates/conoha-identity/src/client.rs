//! Asynchronous identity client implementation.

use crate::catalog::session_from_body;
use crate::models::AuthRequest;
use crate::Result;
use conoha_core::client::{ClientConfig, ServiceClient, ServiceClientBuilder, JSON_CONTENT_TYPE};
use conoha_core::config::ConohaConfig;
use conoha_core::{Error, ServiceType, Session, TimeZoneConfig};
use reqwest::header::{HeaderMap, ACCEPT};
use reqwest::{Method, StatusCode};
use serde_json::Value;
use tracing::info;
use url::Url;

const USER_AGENT: &str = concat!("conoha-identity/", env!("CARGO_PKG_VERSION"));

/// Response header carrying the issued token.
pub const SUBJECT_TOKEN_HEADER: &str = "x-subject-token";

/// Result of a successful token exchange.
///
/// Besides the session, the raw status and headers are kept for callers that
/// need response metadata (e.g. request ids).
#[derive(Debug, Clone)]
pub struct TokenResponse {
    /// Session built from the response
    pub session: Session,
    /// HTTP status of the response
    pub status: StatusCode,
    /// Raw response headers
    pub headers: HeaderMap,
}

/// Builder for [`IdentityClient`].
#[derive(Debug, Clone)]
pub struct IdentityClientBuilder {
    inner: ServiceClientBuilder,
}

impl IdentityClientBuilder {
    /// Create a builder for the identity base URL (with or without `/v3`).
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be parsed.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        let builder = ServiceClientBuilder::new(ServiceType::Identity, base_url)?
            .with_user_agent(USER_AGENT);
        Ok(Self { inner: builder })
    }

    /// Create a builder from a [`ConohaConfig`].
    ///
    /// # Errors
    ///
    /// Returns an error if the identity URL or timezone offset is invalid.
    pub fn from_config(config: &ConohaConfig) -> Result<Self> {
        let url = config.parse_identity_url()?;
        Ok(Self {
            inner: ServiceClientBuilder::from_url(ServiceType::Identity, url)
                .with_user_agent(USER_AGENT)
                .with_http_config(config.client_config()?),
        })
    }

    /// Override the HTTP client configuration.
    #[must_use]
    pub fn with_http_config(mut self, config: ClientConfig) -> Self {
        self.inner = self.inner.with_http_config(config);
        self
    }

    /// Build the client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn build(self) -> Result<IdentityClient> {
        let inner = self.inner.build()?;
        Ok(IdentityClient { inner })
    }
}

/// Asynchronous identity client.
#[derive(Debug, Clone)]
pub struct IdentityClient {
    inner: ServiceClient,
}

impl IdentityClient {
    /// Construct a client directly from the base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be parsed.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        IdentityClientBuilder::new(base_url)?.build()
    }

    /// Return the base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        self.inner.base_url()
    }

    /// Return the timezone applied to session timestamps.
    #[must_use]
    pub fn time_zone(&self) -> &TimeZoneConfig {
        self.inner.time_zone()
    }

    /// Exchange a user id, password and tenant id for a token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Api`] on a non-success status, [`Error::MissingToken`]
    /// if no `x-subject-token` header came back, and [`Error::TimestampParse`]
    /// or [`Error::Decode`] if the body cannot be read.
    pub async fn publish_token_by_id(
        &self,
        user_id: &str,
        password: &str,
        tenant_id: &str,
    ) -> Result<TokenResponse> {
        self.publish_token(&AuthRequest::by_id(user_id, password, tenant_id))
            .await
    }

    /// Exchange a user name, password and tenant name for a token.
    ///
    /// # Errors
    ///
    /// Same as [`IdentityClient::publish_token_by_id`].
    pub async fn publish_token_by_name(
        &self,
        user_name: &str,
        password: &str,
        tenant_name: &str,
    ) -> Result<TokenResponse> {
        self.publish_token(&AuthRequest::by_name(user_name, password, tenant_name))
            .await
    }

    /// Send a prepared auth document.
    ///
    /// # Errors
    ///
    /// Same as [`IdentityClient::publish_token_by_id`].
    pub async fn publish_token(&self, request: &AuthRequest<'_>) -> Result<TokenResponse> {
        let path = token_path(self.inner.base_url());
        let response = self
            .inner
            .execute_success(Method::POST, &path, &[], |builder| {
                builder.header(ACCEPT, JSON_CONTENT_TYPE).json(request)
            })
            .await?;

        let status = response.status();
        let headers = response.headers().clone();
        let token = headers
            .get(SUBJECT_TOKEN_HEADER)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .ok_or(Error::MissingToken)?
            .to_string();

        let bytes = response.bytes().await?;
        let body: Value = serde_json::from_slice(&bytes)
            .map_err(|err| Error::Decode(format!("Failed to parse token response: {err}")))?;

        let session = session_from_body(&body, &token, self.inner.time_zone())?;
        info!(
            user = session.user_name(),
            tenant = session.tenant_name(),
            endpoints = session.endpoints().len(),
            expires_at = %session.expires_at(),
            "token issued"
        );

        Ok(TokenResponse {
            session,
            status,
            headers,
        })
    }
}

/// Absolute path of the token resource under `base`.
fn token_path(base: &Url) -> String {
    let base_path = base.path().trim_end_matches('/');
    if base_path.ends_with("/v3") {
        format!("{base_path}/auth/tokens")
    } else {
        format!("{base_path}/v3/auth/tokens")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn token_body() -> Value {
        json!({
            "token": {
                "issued_at": "2024-05-01T00:00:00.000000Z",
                "expires_at": "2024-05-02T00:00:00.000000Z",
                "user": {"id": "u-1", "name": "gncu12345678"},
                "project": {"id": "t-1", "name": "gnct12345678"},
                "catalog": [
                    {"type": "dns", "endpoints": [{"url": "https://dns.example.com"}]}
                ]
            }
        })
    }

    fn test_client(server: &MockServer) -> IdentityClient {
        IdentityClient::new(server.uri()).unwrap()
    }

    #[test]
    fn test_token_path() {
        let cases = [
            ("https://identity.example.com", "/v3/auth/tokens"),
            ("https://identity.example.com/", "/v3/auth/tokens"),
            ("https://identity.example.com/v3", "/v3/auth/tokens"),
            ("https://identity.example.com/v3/", "/v3/auth/tokens"),
            ("https://example.com/identity", "/identity/v3/auth/tokens"),
        ];
        for (base, expected) in cases {
            assert_eq!(token_path(&Url::parse(base).unwrap()), expected, "{base}");
        }
    }

    #[tokio::test]
    async fn publish_token_by_id_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v3/auth/tokens"))
            .and(header("content-type", "application/json"))
            .and(body_partial_json(json!({
                "auth": {
                    "identity": {"password": {"user": {"id": "u-1", "password": "pw"}}},
                    "scope": {"project": {"id": "t-1"}}
                }
            })))
            .respond_with(
                ResponseTemplate::new(201)
                    .insert_header("x-subject-token", "abc123")
                    .set_body_json(token_body()),
            )
            .mount(&server)
            .await;

        let client = test_client(&server);
        let response = client.publish_token_by_id("u-1", "pw", "t-1").await.unwrap();

        assert_eq!(response.status, StatusCode::CREATED);
        assert_eq!(response.session.token(), "abc123");
        assert_eq!(response.session.tenant_name(), "gnct12345678");
        assert!(response.session.endpoint(ServiceType::Dns).is_ok());
        assert!(response.headers.contains_key(SUBJECT_TOKEN_HEADER));
    }

    #[tokio::test]
    async fn publish_token_by_name_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v3/auth/tokens"))
            .and(body_partial_json(json!({
                "auth": {
                    "identity": {"password": {"user": {"name": "gncu12345678"}}},
                    "scope": {"project": {"name": "gnct12345678"}}
                }
            })))
            .respond_with(
                ResponseTemplate::new(201)
                    .insert_header("x-subject-token", "by-name")
                    .set_body_json(token_body()),
            )
            .mount(&server)
            .await;

        let client = test_client(&server);
        let response = client
            .publish_token_by_name("gncu12345678", "pw", "gnct12345678")
            .await
            .unwrap();
        assert_eq!(response.session.token(), "by-name");
        assert_eq!(response.session.user_id(), "u-1");
    }

    #[tokio::test]
    async fn publish_token_missing_header() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v3/auth/tokens"))
            .respond_with(ResponseTemplate::new(201).set_body_json(token_body()))
            .mount(&server)
            .await;

        let err = test_client(&server)
            .publish_token_by_id("u-1", "pw", "t-1")
            .await
            .unwrap_err();
        assert_eq!(err, Error::MissingToken);
    }

    #[tokio::test]
    async fn publish_token_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v3/auth/tokens"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": {
                    "code": 401,
                    "message": "The request you have made requires authentication."
                }
            })))
            .mount(&server)
            .await;

        let err = test_client(&server)
            .publish_token_by_id("u-1", "wrong", "t-1")
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(401));
        assert!(err.api_error().is_some());
    }

    #[tokio::test]
    async fn publish_token_non_json_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v3/auth/tokens"))
            .respond_with(
                ResponseTemplate::new(201)
                    .insert_header("x-subject-token", "abc123")
                    .set_body_string("<html>"),
            )
            .mount(&server)
            .await;

        let err = test_client(&server)
            .publish_token_by_id("u-1", "pw", "t-1")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[tokio::test]
    async fn publish_token_respects_configured_zone() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v3/auth/tokens"))
            .respond_with(
                ResponseTemplate::new(201)
                    .insert_header("x-subject-token", "abc123")
                    .set_body_json(token_body()),
            )
            .mount(&server)
            .await;

        let client = IdentityClientBuilder::new(server.uri())
            .unwrap()
            .with_http_config(ClientConfig::new().with_time_zone(TimeZoneConfig::utc()))
            .build()
            .unwrap();
        let response = client.publish_token_by_id("u-1", "pw", "t-1").await.unwrap();
        assert_eq!(
            response.session.issued_at().to_rfc3339(),
            "2024-05-01T00:00:00+00:00"
        );
    }
}
