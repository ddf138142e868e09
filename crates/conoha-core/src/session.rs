//! Authenticated session snapshots.
//!
//! A [`Session`] is produced by the identity token exchange and never mutated
//! afterwards. Re-authenticating yields a new snapshot, so a session can be
//! shared freely (e.g. behind an `Arc`) while resource clients read it.

use chrono::{DateTime, FixedOffset, Utc};
use secrecy::{ExposeSecret, SecretString};
use url::Url;

use crate::endpoint::{EndpointTable, ServiceType};
use crate::error::Result;
use crate::time::TimeZoneConfig;

/// Identity, bearer token and service catalog of one authentication.
///
/// The token is only valid while `now < expires_at`. Nothing refreshes it
/// automatically; callers re-authenticate when [`Session::is_expired`] says so.
#[derive(Debug, Clone)]
pub struct Session {
    user_id: String,
    user_name: String,
    tenant_id: String,
    tenant_name: String,
    token: SecretString,
    issued_at: DateTime<FixedOffset>,
    expires_at: DateTime<FixedOffset>,
    endpoints: EndpointTable,
}

impl Session {
    /// An unauthenticated session whose timestamps are the epoch in `zone`.
    #[must_use]
    pub fn unauthenticated(zone: &TimeZoneConfig) -> Self {
        SessionBuilder::new(zone).build()
    }

    /// Start building a session.
    #[must_use]
    pub fn builder(zone: &TimeZoneConfig) -> SessionBuilder {
        SessionBuilder::new(zone)
    }

    /// User id.
    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// User name.
    #[must_use]
    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    /// Tenant (project) id.
    #[must_use]
    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    /// Tenant (project) name.
    #[must_use]
    pub fn tenant_name(&self) -> &str {
        &self.tenant_name
    }

    /// Bearer token to send as `X-Auth-Token`.
    #[must_use]
    pub fn token(&self) -> &str {
        self.token.expose_secret()
    }

    /// When the token was issued.
    #[must_use]
    pub const fn issued_at(&self) -> DateTime<FixedOffset> {
        self.issued_at
    }

    /// When the token stops being valid.
    #[must_use]
    pub const fn expires_at(&self) -> DateTime<FixedOffset> {
        self.expires_at
    }

    /// Endpoint table resolved from the catalog.
    #[must_use]
    pub const fn endpoints(&self) -> &EndpointTable {
        &self.endpoints
    }

    /// Base URL of a service.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::MissingEndpoint`] when the catalog did not list it.
    pub fn endpoint(&self, service: ServiceType) -> Result<&Url> {
        self.endpoints.require(service)
    }

    /// Returns true once a token exchange has populated the session.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        !self.token.expose_secret().is_empty()
    }

    /// Returns true when the token is no longer valid at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Returns true when the token is no longer valid.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Returns true when the session holds a token that has not expired.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.is_authenticated() && !self.is_expired()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::unauthenticated(&TimeZoneConfig::default())
    }
}

/// Builder for [`Session`].
#[derive(Debug, Clone)]
pub struct SessionBuilder {
    session: Session,
}

impl SessionBuilder {
    /// Start from an unauthenticated session in `zone`.
    #[must_use]
    pub fn new(zone: &TimeZoneConfig) -> Self {
        let epoch = zone.epoch();
        Self {
            session: Session {
                user_id: String::new(),
                user_name: String::new(),
                tenant_id: String::new(),
                tenant_name: String::new(),
                token: SecretString::from(String::new()),
                issued_at: epoch,
                expires_at: epoch,
                endpoints: EndpointTable::new(),
            },
        }
    }

    /// Set the user id.
    #[must_use]
    pub fn user_id(mut self, value: impl Into<String>) -> Self {
        self.session.user_id = value.into();
        self
    }

    /// Set the user name.
    #[must_use]
    pub fn user_name(mut self, value: impl Into<String>) -> Self {
        self.session.user_name = value.into();
        self
    }

    /// Set the tenant id.
    #[must_use]
    pub fn tenant_id(mut self, value: impl Into<String>) -> Self {
        self.session.tenant_id = value.into();
        self
    }

    /// Set the tenant name.
    #[must_use]
    pub fn tenant_name(mut self, value: impl Into<String>) -> Self {
        self.session.tenant_name = value.into();
        self
    }

    /// Set the bearer token.
    #[must_use]
    pub fn token(mut self, value: impl Into<String>) -> Self {
        self.session.token = SecretString::from(value.into());
        self
    }

    /// Set the issue time.
    #[must_use]
    pub fn issued_at(mut self, value: DateTime<FixedOffset>) -> Self {
        self.session.issued_at = value;
        self
    }

    /// Set the expiry time.
    #[must_use]
    pub fn expires_at(mut self, value: DateTime<FixedOffset>) -> Self {
        self.session.expires_at = value;
        self
    }

    /// Replace the whole endpoint table.
    #[must_use]
    pub fn endpoints(mut self, value: EndpointTable) -> Self {
        self.session.endpoints = value;
        self
    }

    /// Finish the session.
    #[must_use]
    pub fn build(self) -> Session {
        self.session
    }
}
