//! Image models shared by the client and its tests.

use chrono::{DateTime, FixedOffset};
use conoha_core::query::QueryParams;
use conoha_core::time::deserialize_lenient;
use conoha_core::uuid::ImageId;
use conoha_core::{Normalize, TimeZoneConfig};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Parameters supported by the `/v2/images` list endpoint.
#[derive(Debug, Default, Clone)]
pub struct ImageListParams {
    /// Maximum number of results.
    pub limit: Option<u32>,
    /// Id of the last image of the previous page.
    pub marker: Option<ImageId>,
    /// Filter by name.
    pub name: Option<String>,
    /// Filter by visibility (public, private, shared, community).
    pub visibility: Option<String>,
    /// Filter by owning project.
    pub owner: Option<String>,
    /// Filter by status (queued, active, ...).
    pub status: Option<String>,
    /// Filter by disk format (iso, qcow2, ...).
    pub disk_format: Option<String>,
    /// Filter by container format.
    pub container_format: Option<String>,
    /// Filter by ConoHa OS type tag.
    pub os_type: Option<String>,
    /// Sort key.
    pub sort_key: Option<String>,
    /// Sort direction (asc, desc).
    pub sort_dir: Option<String>,
}

impl ImageListParams {
    /// Only ISO images.
    #[must_use]
    pub fn iso() -> Self {
        Self {
            disk_format: Some("iso".to_string()),
            ..Self::default()
        }
    }

    /// Convert the parameters into URL query pairs.
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut params = QueryParams::new();
        params.push_opt("limit", self.limit);
        params.push_opt("marker", self.marker.as_ref());
        params.push_opt("name", self.name.as_deref());
        params.push_opt("visibility", self.visibility.as_deref());
        params.push_opt("owner", self.owner.as_deref());
        params.push_opt("status", self.status.as_deref());
        params.push_opt("disk_format", self.disk_format.as_deref());
        params.push_opt("container_format", self.container_format.as_deref());
        params.push_opt("os_type", self.os_type.as_deref());
        params.push_opt("sort_key", self.sort_key.as_deref());
        params.push_opt("sort_dir", self.sort_dir.as_deref());

        params.into_pairs()
    }
}

/// Representation of an image as returned by the image service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Image {
    /// Image id.
    pub id: ImageId,
    /// Image name; unnamed images carry `null`.
    #[serde(default)]
    pub name: Option<String>,
    /// Lifecycle status (queued, saving, active, ...).
    #[serde(default)]
    pub status: String,
    /// Visibility.
    #[serde(default)]
    pub visibility: String,
    /// Disk format.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk_format: Option<String>,
    /// Container format.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_format: Option<String>,
    /// Bus the ISO is attached to when used for rescue boots.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hw_rescue_bus: Option<String>,
    /// Device type the ISO is attached as.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hw_rescue_device: Option<String>,
    /// Size in bytes; unset until data is uploaded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,
    /// Virtual disk size in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub virtual_size: Option<i64>,
    /// MD5 checksum of the data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
    /// Hash algorithm of `os_hash_value`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os_hash_algo: Option<String>,
    /// Secure hash of the data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os_hash_value: Option<String>,
    /// Whether the image is hidden from default listings.
    #[serde(default)]
    pub os_hidden: bool,
    /// ConoHa OS type tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os_type: Option<String>,
    /// CPU architecture.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub architecture: Option<String>,
    /// Whether deletion is blocked.
    #[serde(default)]
    pub protected: bool,
    /// Minimum RAM in MiB.
    #[serde(default)]
    pub min_ram: i64,
    /// Minimum disk in GiB.
    #[serde(default)]
    pub min_disk: i64,
    /// Owning project id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    /// Tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Creation time.
    #[serde(default, deserialize_with = "deserialize_lenient")]
    pub created_at: Option<DateTime<FixedOffset>>,
    /// Last update time.
    #[serde(default, deserialize_with = "deserialize_lenient")]
    pub updated_at: Option<DateTime<FixedOffset>>,
    /// Path of this image.
    #[serde(rename = "self", default)]
    pub self_link: String,
    /// Path of the image data.
    #[serde(default)]
    pub file: String,
    /// Path of the image schema.
    #[serde(default)]
    pub schema: String,
}

impl Image {
    /// Returns true for ISO images.
    #[must_use]
    pub fn is_iso(&self) -> bool {
        self.disk_format.as_deref() == Some("iso")
    }
}

impl Normalize for Image {
    fn normalize_timestamps(&mut self, zone: &TimeZoneConfig) {
        zone.normalize_opt(&mut self.created_at);
        zone.normalize_opt(&mut self.updated_at);
    }
}

/// One page of images.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageList {
    /// Images on this page.
    #[serde(default)]
    pub images: Vec<Image>,
    /// Path of the list schema.
    #[serde(default)]
    pub schema: String,
    /// Path of the first page.
    #[serde(default)]
    pub first: String,
    /// Path of the next page, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
}

impl Normalize for ImageList {
    fn normalize_timestamps(&mut self, zone: &TimeZoneConfig) {
        self.images.normalize_timestamps(zone);
    }
}

/// Body of `POST /v2/images` for an ISO image.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CreateIsoImageRequest {
    /// Image name.
    pub name: String,
    /// Always `iso`.
    pub disk_format: &'static str,
    /// Always `ide`.
    pub hw_rescue_bus: &'static str,
    /// Always `cdrom`.
    pub hw_rescue_device: &'static str,
    /// Always `bare`.
    pub container_format: &'static str,
}

impl CreateIsoImageRequest {
    /// ISO image record; a blank name is replaced by a random UUID.
    #[must_use]
    pub fn new(name: &str) -> Self {
        let name = if name.trim().is_empty() {
            Uuid::new_v4().to_string()
        } else {
            name.to_string()
        };
        Self {
            name,
            disk_format: "iso",
            hw_rescue_bus: "ide",
            hw_rescue_device: "cdrom",
            container_format: "bare",
        }
    }
}
