//! Asynchronous image client implementation.

use crate::models::{CreateIsoImageRequest, Image, ImageList, ImageListParams};
use crate::Result;
use bytes::Bytes;
use conoha_core::client::{
    ClientConfig, ServiceClient, ServiceClientBuilder, OCTET_STREAM_CONTENT_TYPE,
};
use conoha_core::uuid::ImageId;
use conoha_core::{Error, ServiceType, Session};
use reqwest::{Method, StatusCode};
use std::path::Path;
use tokio::fs::File;
use tracing::{debug, info};
use url::Url;

const USER_AGENT: &str = concat!("conoha-image/", env!("CARGO_PKG_VERSION"));

/// Builder for [`ImageClient`].
#[derive(Debug, Clone)]
pub struct ImageClientBuilder {
    inner: ServiceClientBuilder,
}

impl ImageClientBuilder {
    /// Create a builder for the specified base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be parsed.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        let builder = ServiceClientBuilder::new(ServiceType::Image, base_url)?
            .with_user_agent(USER_AGENT);
        Ok(Self { inner: builder })
    }

    /// Create a builder from the session's image endpoint and token.
    ///
    /// # Errors
    ///
    /// Returns an error if the session has no image endpoint.
    pub fn from_session(session: &Session) -> Result<Self> {
        let builder = ServiceClientBuilder::from_session(ServiceType::Image, session)?
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
    pub fn build(self) -> Result<ImageClient> {
        let inner = self.inner.build()?;
        Ok(ImageClient { inner })
    }
}

/// Asynchronous image client.
#[derive(Debug, Clone)]
pub struct ImageClient {
    inner: ServiceClient,
}

impl ImageClient {
    /// Construct a client from a session.
    ///
    /// # Errors
    ///
    /// Returns an error if the session has no image endpoint.
    pub fn new(session: &Session) -> Result<Self> {
        ImageClientBuilder::from_session(session)?.build()
    }

    /// Return the base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        self.inner.base_url()
    }

    /// List images.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Api`] unless the API answers `200`.
    pub async fn list_images(&self, params: &ImageListParams) -> Result<ImageList> {
        self.inner
            .send_json::<(), _>(
                Method::GET,
                "/v2/images",
                None,
                &params.to_pairs(),
                StatusCode::OK,
            )
            .await
    }

    /// Fetch a single image.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Api`] unless the API answers `200`.
    pub async fn get_image(&self, id: ImageId) -> Result<Image> {
        self.inner
            .send_json::<(), _>(Method::GET, &image_path(id), None, &[], StatusCode::OK)
            .await
    }

    /// Create an empty ISO image record.
    ///
    /// A blank `name` is replaced by a random UUID.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Api`] unless the API answers `201`.
    pub async fn create_iso_image(&self, name: &str) -> Result<Image> {
        let request = CreateIsoImageRequest::new(name);
        let image: Image = self
            .inner
            .send_json(
                Method::POST,
                "/v2/images",
                Some(&request),
                &[],
                StatusCode::CREATED,
            )
            .await?;
        info!(
            image = %image.id,
            name = image.name.as_deref().unwrap_or_default(),
            "ISO image created"
        );
        Ok(image)
    }

    /// Upload the ISO data of an image.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Api`] unless the API answers `204`.
    pub async fn upload_iso_image(&self, id: ImageId, data: impl Into<Bytes>) -> Result<()> {
        self.inner
            .send_bytes(
                Method::PUT,
                &file_path(id),
                data.into(),
                OCTET_STREAM_CONTENT_TYPE,
                StatusCode::NO_CONTENT,
            )
            .await
    }

    /// Stream a local file as the ISO data of an image.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be opened, otherwise as
    /// [`ImageClient::upload_iso_image`].
    pub async fn upload_iso_image_from_path(
        &self,
        id: ImageId,
        file: impl AsRef<Path>,
    ) -> Result<()> {
        let path = file.as_ref();
        let file = File::open(path)
            .await
            .map_err(|err| Error::Io(format!("Failed to open {}: {err}", path.display())))?;
        let size = file
            .metadata()
            .await
            .map_err(|err| Error::Io(format!("Failed to stat {}: {err}", path.display())))?
            .len();
        debug!(image = %id, file = %path.display(), size, "streaming ISO file");
        self.inner
            .send_body(
                Method::PUT,
                &file_path(id),
                file,
                Some(size),
                OCTET_STREAM_CONTENT_TYPE,
                StatusCode::NO_CONTENT,
            )
            .await
    }

    /// Delete an image.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Api`] unless the API answers `204`.
    pub async fn delete_image(&self, id: ImageId) -> Result<()> {
        self.inner
            .send_empty::<()>(
                Method::DELETE,
                &image_path(id),
                None,
                StatusCode::NO_CONTENT,
            )
            .await
    }
}

fn image_path(id: ImageId) -> String {
    format!("/v2/images/{id}")
}

fn file_path(id: ImageId) -> String {
    format!("/v2/images/{id}/file")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;
    use wiremock::matchers::{body_bytes, body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const IMAGE_ID: &str = "9b9d1d8e-0c1c-4e4f-8a42-0d7f3a3b1c11";

    fn image_id() -> ImageId {
        ImageId::parse_str(IMAGE_ID).unwrap()
    }

    fn image_json(name: &str) -> serde_json::Value {
        json!({
            "id": IMAGE_ID,
            "name": name,
            "status": "queued",
            "visibility": "private",
            "disk_format": "iso",
            "container_format": "bare",
            "created_at": "2024-05-01T00:00:00Z",
            "updated_at": "2024-05-01T00:00:00Z",
            "self": format!("/v2/images/{IMAGE_ID}"),
            "file": format!("/v2/images/{IMAGE_ID}/file"),
            "schema": "/v2/schemas/image"
        })
    }

    fn test_client(server: &MockServer) -> ImageClient {
        ImageClientBuilder::new(server.uri())
            .unwrap()
            .with_token("tok-1")
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn list_images_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/images"))
            .and(query_param("disk_format", "iso"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "images": [image_json("rescue.iso")],
                "schema": "/v2/schemas/images",
                "first": "/v2/images"
            })))
            .mount(&server)
            .await;

        let list = test_client(&server)
            .list_images(&ImageListParams::iso())
            .await
            .unwrap();
        assert_eq!(list.images.len(), 1);
        assert_eq!(list.first, "/v2/images");
        assert_eq!(
            list.images[0].created_at.unwrap().to_rfc3339(),
            "2024-05-01T09:00:00+09:00"
        );
    }

    #[tokio::test]
    async fn list_images_tolerates_unnamed_image() {
        let server = MockServer::start().await;
        let mut unnamed = image_json("");
        unnamed["name"] = serde_json::Value::Null;
        Mock::given(method("GET"))
            .and(path("/v2/images"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "images": [unnamed, image_json("rescue.iso")],
                "first": "/v2/images"
            })))
            .mount(&server)
            .await;

        let list = test_client(&server)
            .list_images(&ImageListParams::default())
            .await
            .unwrap();
        assert_eq!(list.images.len(), 2);
        assert!(list.images[0].name.is_none());
        assert_eq!(list.images[1].name.as_deref(), Some("rescue.iso"));
    }

    #[tokio::test]
    async fn get_and_delete_image() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/v2/images/{IMAGE_ID}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(image_json("rescue.iso")))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path(format!("/v2/images/{IMAGE_ID}")))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let image = client.get_image(image_id()).await.unwrap();
        assert_eq!(image.name.as_deref(), Some("rescue.iso"));
        client.delete_image(image_id()).await.unwrap();
    }

    #[tokio::test]
    async fn create_iso_image_expects_created() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/images"))
            .and(body_partial_json(json!({
                "name": "rescue.iso",
                "disk_format": "iso",
                "hw_rescue_bus": "ide",
                "hw_rescue_device": "cdrom",
                "container_format": "bare"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(image_json("rescue.iso")))
            .mount(&server)
            .await;

        let image = test_client(&server)
            .create_iso_image("rescue.iso")
            .await
            .unwrap();
        assert_eq!(image.id, image_id());
    }

    #[tokio::test]
    async fn create_iso_image_ok_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/images"))
            .respond_with(ResponseTemplate::new(200).set_body_json(image_json("x")))
            .mount(&server)
            .await;

        let err = test_client(&server)
            .create_iso_image("x")
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(200));
    }

    #[tokio::test]
    async fn upload_from_bytes_and_path() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path(format!("/v2/images/{IMAGE_ID}/file")))
            .and(header("content-type", "application/octet-stream"))
            .and(header("x-auth-token", "tok-1"))
            .and(header("content-length", "8"))
            .and(body_bytes(b"ISO-DATA".to_vec()))
            .respond_with(ResponseTemplate::new(204))
            .expect(2)
            .mount(&server)
            .await;

        let client = test_client(&server);
        client
            .upload_iso_image(image_id(), Bytes::from_static(b"ISO-DATA"))
            .await
            .unwrap();

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"ISO-DATA").unwrap();
        file.flush().unwrap();
        client
            .upload_iso_image_from_path(image_id(), file.path())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn upload_missing_file_is_io_error() {
        let server = MockServer::start().await;
        let err = test_client(&server)
            .upload_iso_image_from_path(image_id(), "/nonexistent/conoha/rescue.iso")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
