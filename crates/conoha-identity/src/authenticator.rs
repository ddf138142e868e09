//! Pluggable authentication and session snapshots.
//!
//! [`SessionManager`] owns the current [`Session`] behind an `Arc`. Resource
//! clients are built from a snapshot; re-authenticating swaps in a new
//! snapshot and never mutates the one already handed out.

use crate::client::IdentityClient;
use crate::models::Credentials;
use crate::Result;
use async_trait::async_trait;
use chrono::Utc;
use conoha_core::Session;
use std::sync::Arc;
use tracing::{debug, info};

/// Produces fresh sessions.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Authenticate and return a new session.
    async fn authenticate(&self) -> Result<Session>;
}

/// Authenticates with stored password credentials.
#[derive(Debug, Clone)]
pub struct PasswordAuthenticator {
    client: IdentityClient,
    credentials: Credentials,
}

impl PasswordAuthenticator {
    /// Pair an identity client with credentials.
    #[must_use]
    pub fn new(client: IdentityClient, credentials: Credentials) -> Self {
        Self {
            client,
            credentials,
        }
    }

    /// Identity client used for the exchange.
    #[must_use]
    pub const fn client(&self) -> &IdentityClient {
        &self.client
    }
}

#[async_trait]
impl Authenticator for PasswordAuthenticator {
    async fn authenticate(&self) -> Result<Session> {
        let request = self.credentials.to_request();
        let response = self.client.publish_token(&request).await?;
        Ok(response.session)
    }
}

/// Holds the current session and replaces it on demand.
pub struct SessionManager {
    authenticator: Arc<dyn Authenticator>,
    current: Arc<Session>,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("current", &self.current)
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    /// Authenticate once and wrap the resulting session.
    ///
    /// # Errors
    ///
    /// Returns the authenticator's error.
    pub async fn connect(authenticator: Arc<dyn Authenticator>) -> Result<Self> {
        let session = authenticator.authenticate().await?;
        Ok(Self {
            authenticator,
            current: Arc::new(session),
        })
    }

    /// Wrap an existing session without authenticating.
    #[must_use]
    pub fn with_session(authenticator: Arc<dyn Authenticator>, session: Session) -> Self {
        Self {
            authenticator,
            current: Arc::new(session),
        }
    }

    /// The current snapshot.
    #[must_use]
    pub fn current(&self) -> Arc<Session> {
        Arc::clone(&self.current)
    }

    /// Authenticate again and install the new snapshot.
    ///
    /// On failure the previous snapshot stays current.
    ///
    /// # Errors
    ///
    /// Returns the authenticator's error.
    pub async fn reauthenticate(&mut self) -> Result<Arc<Session>> {
        let session = self.authenticator.authenticate().await?;
        info!(
            user = session.user_name(),
            expires_at = %session.expires_at(),
            "session replaced"
        );
        self.current = Arc::new(session);
        Ok(self.current())
    }

    /// Return the current snapshot, re-authenticating first if it has expired.
    ///
    /// # Errors
    ///
    /// Returns the authenticator's error.
    pub async fn ensure_valid(&mut self) -> Result<Arc<Session>> {
        if self.current.is_authenticated() && !self.current.is_expired_at(Utc::now()) {
            return Ok(self.current());
        }
        debug!("session expired or unauthenticated");
        self.reauthenticate().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use conoha_core::{Error, TimeZoneConfig};

    fn session(token: &str, valid_for: Duration) -> Session {
        let zone = TimeZoneConfig::default();
        let now = zone.normalize(Utc::now().fixed_offset());
        Session::builder(&zone)
            .token(token)
            .issued_at(now)
            .expires_at(now + valid_for)
            .build()
    }

    #[tokio::test]
    async fn connect_installs_first_session() {
        let mut authenticator = MockAuthenticator::new();
        authenticator
            .expect_authenticate()
            .times(1)
            .returning(|| Ok(session("first", Duration::hours(1))));

        let manager = SessionManager::connect(Arc::new(authenticator)).await.unwrap();
        assert_eq!(manager.current().token(), "first");
    }

    #[tokio::test]
    async fn reauthenticate_replaces_snapshot() {
        let mut authenticator = MockAuthenticator::new();
        let mut calls = 0;
        authenticator.expect_authenticate().times(2).returning(move || {
            calls += 1;
            Ok(session(&format!("token-{calls}"), Duration::hours(1)))
        });

        let mut manager = SessionManager::connect(Arc::new(authenticator)).await.unwrap();
        let before = manager.current();
        let after = manager.reauthenticate().await.unwrap();

        assert_eq!(before.token(), "token-1");
        assert_eq!(after.token(), "token-2");
        assert_eq!(manager.current().token(), "token-2");
    }

    #[tokio::test]
    async fn failed_reauthentication_keeps_previous() {
        let mut authenticator = MockAuthenticator::new();
        authenticator
            .expect_authenticate()
            .returning(|| Err(Error::MissingToken));

        let mut manager = SessionManager::with_session(
            Arc::new(authenticator),
            session("old", Duration::hours(1)),
        );
        let err = manager.reauthenticate().await.unwrap_err();

        assert_eq!(err, Error::MissingToken);
        assert_eq!(manager.current().token(), "old");
    }

    #[tokio::test]
    async fn ensure_valid_only_refreshes_expired() {
        let mut authenticator = MockAuthenticator::new();
        authenticator
            .expect_authenticate()
            .times(1)
            .returning(|| Ok(session("fresh", Duration::hours(1))));

        let mut manager = SessionManager::with_session(
            Arc::new(authenticator),
            session("stale", Duration::seconds(-1)),
        );
        assert_eq!(manager.ensure_valid().await.unwrap().token(), "fresh");
        assert_eq!(manager.ensure_valid().await.unwrap().token(), "fresh");
    }
}
