//! Asynchronous compute client implementation.

use crate::models::{
    ConsoleKind, RebootType, RemoteConsole, RemoteConsoleEnvelope, RemoteConsoleRequest,
    RescueResponse, Server, ServerAction, ServerEnvelope, ServerList, ServerSummary,
};
use crate::Result;
use conoha_core::client::{ClientConfig, ServiceClient, ServiceClientBuilder};
use conoha_core::uuid::{ImageId, ServerId};
use conoha_core::{ServiceType, Session};
use reqwest::{Method, StatusCode};
use tracing::debug;
use url::Url;

const USER_AGENT: &str = concat!("conoha-compute/", env!("CARGO_PKG_VERSION"));

/// Builder for [`ComputeClient`].
#[derive(Debug, Clone)]
pub struct ComputeClientBuilder {
    inner: ServiceClientBuilder,
}

impl ComputeClientBuilder {
    /// Create a builder for the specified base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be parsed.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        let builder = ServiceClientBuilder::new(ServiceType::Compute, base_url)?
            .with_user_agent(USER_AGENT);
        Ok(Self { inner: builder })
    }

    /// Create a builder from the session's compute endpoint and token.
    ///
    /// # Errors
    ///
    /// Returns an error if the session has no compute endpoint.
    pub fn from_session(session: &Session) -> Result<Self> {
        let builder = ServiceClientBuilder::from_session(ServiceType::Compute, session)?
            .with_user_agent(USER_AGENT);
        Ok(Self { inner: builder })
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
    pub fn build(self) -> Result<ComputeClient> {
        let inner = self.inner.build()?;
        Ok(ComputeClient { inner })
    }
}

/// Asynchronous compute client.
#[derive(Debug, Clone)]
pub struct ComputeClient {
    inner: ServiceClient,
}

impl ComputeClient {
    /// Construct a client from a session.
    ///
    /// # Errors
    ///
    /// Returns an error if the session has no compute endpoint.
    pub fn new(session: &Session) -> Result<Self> {
        ComputeClientBuilder::from_session(session)?.build()
    }

    /// Return the base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        self.inner.base_url()
    }

    /// List servers of the tenant.
    ///
    /// # Errors
    ///
    /// Returns [`conoha_core::Error::Api`] unless the API answers `200`.
    pub async fn list_servers(&self) -> Result<Vec<ServerSummary>> {
        let list: ServerList = self
            .inner
            .send_json::<(), _>(Method::GET, "/v2.1/servers", None, &[], StatusCode::OK)
            .await?;
        Ok(list.servers)
    }

    /// Fetch one server.
    ///
    /// # Errors
    ///
    /// Returns [`conoha_core::Error::Api`] unless the API answers `200`.
    pub async fn get_server(&self, id: ServerId) -> Result<Server> {
        let path = format!("/v2.1/servers/{id}");
        let envelope: ServerEnvelope = self
            .inner
            .send_json::<(), _>(Method::GET, &path, None, &[], StatusCode::OK)
            .await?;
        Ok(envelope.server)
    }

    /// Power a server on.
    ///
    /// # Errors
    ///
    /// Returns [`conoha_core::Error::Api`] unless the API answers `202`.
    pub async fn start_server(&self, id: ServerId) -> Result<()> {
        self.action(id, &ServerAction::start()).await
    }

    /// Power a server off gracefully.
    ///
    /// # Errors
    ///
    /// Returns [`conoha_core::Error::Api`] unless the API answers `202`.
    pub async fn stop_server(&self, id: ServerId) -> Result<()> {
        self.action(id, &ServerAction::stop()).await
    }

    /// Power a server off immediately.
    ///
    /// # Errors
    ///
    /// Returns [`conoha_core::Error::Api`] unless the API answers `202`.
    pub async fn force_shutdown_server(&self, id: ServerId) -> Result<()> {
        self.action(id, &ServerAction::force_shutdown()).await
    }

    /// Soft-reboot a server.
    ///
    /// # Errors
    ///
    /// Returns [`conoha_core::Error::Api`] unless the API answers `202`.
    pub async fn reboot_server(&self, id: ServerId) -> Result<()> {
        self.action(id, &ServerAction::reboot(RebootType::Soft))
            .await
    }

    /// Boot a server from an ISO image.
    ///
    /// # Errors
    ///
    /// Returns [`conoha_core::Error::Api`] unless the API answers `202`.
    pub async fn mount_iso_image(&self, id: ServerId, image: ImageId) -> Result<RescueResponse> {
        let action = ServerAction::rescue(image);
        debug!(server = %id, image = %image, action = action.name(), "server action");
        self.inner
            .send_json(
                Method::POST,
                &action_path(id),
                Some(&action),
                &[],
                StatusCode::ACCEPTED,
            )
            .await
    }

    /// Return a server to its normal boot disk.
    ///
    /// # Errors
    ///
    /// Returns [`conoha_core::Error::Api`] unless the API answers `202`.
    pub async fn unmount_iso_image(&self, id: ServerId) -> Result<()> {
        self.action(id, &ServerAction::unrescue()).await
    }

    /// Publish a console URL of the given kind.
    ///
    /// # Errors
    ///
    /// Returns [`conoha_core::Error::Api`] unless the API answers `200`.
    pub async fn console_url(&self, id: ServerId, kind: ConsoleKind) -> Result<RemoteConsole> {
        let path = format!("/v2.1/servers/{id}/remote-consoles");
        let request = RemoteConsoleRequest::from(kind);
        let envelope: RemoteConsoleEnvelope = self
            .inner
            .send_json(Method::POST, &path, Some(&request), &[], StatusCode::OK)
            .await?;
        Ok(envelope.remote_console)
    }

    /// Publish a noVNC console URL.
    ///
    /// # Errors
    ///
    /// See [`ComputeClient::console_url`].
    pub async fn publish_vnc_console_url(&self, id: ServerId) -> Result<RemoteConsole> {
        self.console_url(id, ConsoleKind::Vnc).await
    }

    /// Publish a serial console URL.
    ///
    /// # Errors
    ///
    /// See [`ComputeClient::console_url`].
    pub async fn publish_serial_console_url(&self, id: ServerId) -> Result<RemoteConsole> {
        self.console_url(id, ConsoleKind::Serial).await
    }

    /// Publish a web-socket serial console URL.
    ///
    /// # Errors
    ///
    /// See [`ComputeClient::console_url`].
    pub async fn publish_websocket_console_url(&self, id: ServerId) -> Result<RemoteConsole> {
        self.console_url(id, ConsoleKind::WebSocket).await
    }

    async fn action(&self, id: ServerId, action: &ServerAction) -> Result<()> {
        debug!(server = %id, action = action.name(), "server action");
        self.inner
            .send_empty(
                Method::POST,
                &action_path(id),
                Some(action),
                StatusCode::ACCEPTED,
            )
            .await
    }
}

fn action_path(id: ServerId) -> String {
    format!("/v2.1/servers/{id}/action")
}
