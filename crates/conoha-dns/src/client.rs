//! Asynchronous DNS client implementation.

use crate::models::{
    CreateDomainRequest, Domain, DomainList, ListParams, Record, RecordBody, RecordList,
    RecordRequest, UpdateDomainRequest,
};
use crate::Result;
use conoha_core::client::{ClientConfig, ServiceClient, ServiceClientBuilder};
use conoha_core::uuid::{DomainId, RecordId};
use conoha_core::{ErrorNormalizer, ServiceType, Session};
use reqwest::{Method, StatusCode};
use tracing::debug;
use url::Url;
use validator::Validate;

const USER_AGENT: &str = concat!("conoha-dns/", env!("CARGO_PKG_VERSION"));

/// Builder for [`DnsClient`].
#[derive(Debug, Clone)]
pub struct DnsClientBuilder {
    inner: ServiceClientBuilder,
}

impl DnsClientBuilder {
    /// Create a builder for the specified base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be parsed.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        Ok(Self::wrap(ServiceClientBuilder::new(
            ServiceType::Dns,
            base_url,
        )?))
    }

    /// Create a builder from the session's DNS endpoint and token.
    ///
    /// # Errors
    ///
    /// Returns an error if the session has no DNS endpoint.
    pub fn from_session(session: &Session) -> Result<Self> {
        Ok(Self::wrap(ServiceClientBuilder::from_session(
            ServiceType::Dns,
            session,
        )?))
    }

    fn wrap(builder: ServiceClientBuilder) -> Self {
        Self {
            inner: builder
                .with_user_agent(USER_AGENT)
                .with_error_normalizer(ErrorNormalizer::dns()),
        }
    }

    /// Override the HTTP client configuration.
    #[must_use]
    pub fn with_http_config(mut self, config: ClientConfig) -> Self {
        self.inner = self.inner.with_http_config(config);
        self
    }

    /// Configure the X-Auth-Token header.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.inner = self.inner.with_token(token);
        self
    }

    /// Build the client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn build(self) -> Result<DnsClient> {
        let inner = self.inner.build()?;
        Ok(DnsClient { inner })
    }
}

/// Asynchronous DNS client.
///
/// Error bodies are normalized with the DNS error code table, so symbolic
/// codes such as `RecordSetDuplicate` surface as their numeric values.
#[derive(Debug, Clone)]
pub struct DnsClient {
    inner: ServiceClient,
}

impl DnsClient {
    /// Construct a client from a session.
    ///
    /// # Errors
    ///
    /// Returns an error if the session has no DNS endpoint.
    pub fn new(session: &Session) -> Result<Self> {
        DnsClientBuilder::from_session(session)?.build()
    }

    /// Return the base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        self.inner.base_url()
    }

    /// List domains.
    ///
    /// # Errors
    ///
    /// Returns [`conoha_core::Error::Api`] unless the API answers `200`.
    pub async fn list_domains(&self, params: &ListParams) -> Result<DomainList> {
        self.inner
            .send_json::<(), _>(
                Method::GET,
                "/v1/domains",
                None,
                &params.to_pairs(),
                StatusCode::OK,
            )
            .await
    }

    /// Fetch one domain.
    ///
    /// # Errors
    ///
    /// Returns [`conoha_core::Error::Api`] unless the API answers `200`.
    pub async fn get_domain(&self, id: DomainId) -> Result<Domain> {
        self.inner
            .send_json::<(), _>(Method::GET, &domain_path(id), None, &[], StatusCode::OK)
            .await
    }

    /// Create a domain. The name is trimmed and given a trailing dot.
    ///
    /// # Errors
    ///
    /// Returns [`conoha_core::Error::ValidationError`] for a malformed email
    /// and [`conoha_core::Error::Api`] unless the API answers `200`.
    pub async fn create_domain(&self, name: &str, email: &str, ttl: u32) -> Result<Domain> {
        let request = CreateDomainRequest::new(name, email, ttl);
        request.validate()?;
        debug!(domain = %request.name, "creating domain");
        self.inner
            .send_json(
                Method::POST,
                "/v1/domains",
                Some(&request),
                &[],
                StatusCode::OK,
            )
            .await
    }

    /// Update the contact address and TTL of a domain.
    ///
    /// # Errors
    ///
    /// Returns [`conoha_core::Error::ValidationError`] for a malformed email
    /// and [`conoha_core::Error::Api`] unless the API answers `200`.
    pub async fn update_domain(&self, id: DomainId, email: &str, ttl: u32) -> Result<Domain> {
        let request = UpdateDomainRequest {
            ttl,
            email: email.to_string(),
        };
        request.validate()?;
        self.inner
            .send_json(
                Method::PUT,
                &domain_path(id),
                Some(&request),
                &[],
                StatusCode::OK,
            )
            .await
    }

    /// Delete a domain.
    ///
    /// # Errors
    ///
    /// Returns [`conoha_core::Error::Api`] unless the API answers `204`.
    pub async fn delete_domain(&self, id: DomainId) -> Result<()> {
        self.inner
            .send_empty::<()>(
                Method::DELETE,
                &domain_path(id),
                None,
                StatusCode::NO_CONTENT,
            )
            .await
    }

    /// List records of a domain.
    ///
    /// # Errors
    ///
    /// Returns [`conoha_core::Error::Api`] unless the API answers `200`.
    pub async fn list_records(&self, domain: DomainId, params: &ListParams) -> Result<RecordList> {
        self.inner
            .send_json::<(), _>(
                Method::GET,
                &records_path(domain),
                None,
                &params.to_pairs(),
                StatusCode::OK,
            )
            .await
    }

    /// Fetch one record.
    ///
    /// # Errors
    ///
    /// Returns [`conoha_core::Error::Api`] unless the API answers `200`.
    pub async fn get_record(&self, domain: DomainId, record: RecordId) -> Result<Record> {
        self.inner
            .send_json::<(), _>(
                Method::GET,
                &record_path(domain, record),
                None,
                &[],
                StatusCode::OK,
            )
            .await
    }

    /// Create a record.
    ///
    /// MX records need a priority and SRV records need priority, weight and
    /// port; incomplete requests are rejected without contacting the API.
    ///
    /// # Errors
    ///
    /// Returns [`conoha_core::Error::ValidationError`] for an incomplete
    /// request and [`conoha_core::Error::Api`] unless the API answers `200`.
    pub async fn create_record(&self, domain: DomainId, request: &RecordRequest) -> Result<Record> {
        let body = request.to_create_body();
        self.send_record(Method::POST, &records_path(domain), &body)
            .await
    }

    /// Update a record. Empty fields are left unchanged.
    ///
    /// # Errors
    ///
    /// Same as [`DnsClient::create_record`].
    pub async fn update_record(
        &self,
        domain: DomainId,
        record: RecordId,
        request: &RecordRequest,
    ) -> Result<Record> {
        let body = request.to_update_body();
        self.send_record(Method::PUT, &record_path(domain, record), &body)
            .await
    }

    /// Delete a record.
    ///
    /// # Errors
    ///
    /// Returns [`conoha_core::Error::Api`] unless the API answers `204`.
    pub async fn delete_record(&self, domain: DomainId, record: RecordId) -> Result<()> {
        self.inner
            .send_empty::<()>(
                Method::DELETE,
                &record_path(domain, record),
                None,
                StatusCode::NO_CONTENT,
            )
            .await
    }

    async fn send_record(&self, method: Method, path: &str, body: &RecordBody) -> Result<Record> {
        body.validate()?;
        debug!(%method, path, name = %body.name, record_type = %body.record_type, "sending record");
        self.inner
            .send_json(method, path, Some(body), &[], StatusCode::OK)
            .await
    }
}

fn domain_path(id: DomainId) -> String {
    format!("/v1/domains/{id}")
}

fn records_path(domain: DomainId) -> String {
    format!("/v1/domains/{domain}/records")
}

fn record_path(domain: DomainId, record: RecordId) -> String {
    format!("/v1/domains/{domain}/records/{record}")
}
