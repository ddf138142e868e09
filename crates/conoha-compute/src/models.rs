//! Compute models: servers, server actions and remote consoles.

use chrono::{DateTime, FixedOffset};
use conoha_core::time::deserialize_lenient;
use conoha_core::uuid::{ImageId, ServerId};
use conoha_core::{Normalize, TimeZoneConfig};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Hypermedia link attached to compute resources.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Link {
    /// Relation (`self`, `bookmark`)
    pub rel: String,
    /// Target URL
    pub href: String,
}

/// Server entry of `GET /servers`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerSummary {
    /// Server id
    pub id: ServerId,
    /// Server name
    pub name: String,
    /// Links to the server
    #[serde(default)]
    pub links: Vec<Link>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ServerList {
    pub(crate) servers: Vec<ServerSummary>,
}

impl Normalize for ServerList {
    fn normalize_timestamps(&mut self, _zone: &TimeZoneConfig) {}
}

/// Reference to a flavor or image by id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResourceRef {
    /// Referenced id
    pub id: String,
    /// Links to the resource
    #[serde(default)]
    pub links: Vec<Link>,
}

/// One address of a server network.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Address {
    /// IP version (4 or 6)
    pub version: u8,
    /// Address
    pub addr: String,
    /// `fixed` or `floating`
    #[serde(
        rename = "OS-EXT-IPS:type",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub ip_type: Option<String>,
    /// MAC address of the port
    #[serde(
        rename = "OS-EXT-IPS-MAC:mac_addr",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub mac_addr: Option<String>,
}

/// Security group attached to a server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SecurityGroupRef {
    /// Group name
    pub name: String,
}

/// Volume attached to a server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VolumeRef {
    /// Volume id
    pub id: String,
}

/// Server detail as returned by `GET /servers/{id}`.
///
/// All timestamps are converted to the client's configured timezone.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Server {
    /// Server id
    pub id: ServerId,
    /// Server name
    pub name: String,
    /// Status (`ACTIVE`, `SHUTOFF`, `RESCUE`, ...)
    pub status: String,
    /// Owning tenant id
    #[serde(default)]
    pub tenant_id: String,
    /// Creating user id
    #[serde(default)]
    pub user_id: String,
    /// Free-form metadata (`instance_name_tag`, backup settings, ...)
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    /// Host id
    #[serde(rename = "hostId", default)]
    pub host_id: String,
    /// Boot image; absent for volume-booted servers
    #[serde(default, deserialize_with = "deserialize_image_ref")]
    pub image: Option<ResourceRef>,
    /// Flavor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flavor: Option<ResourceRef>,
    /// Creation time
    pub created: DateTime<FixedOffset>,
    /// Last update time
    pub updated: DateTime<FixedOffset>,
    /// Addresses keyed by network name
    #[serde(default)]
    pub addresses: HashMap<String, Vec<Address>>,
    /// Public IPv4 address
    #[serde(rename = "accessIPv4", default)]
    pub access_ipv4: String,
    /// Public IPv6 address
    #[serde(rename = "accessIPv6", default)]
    pub access_ipv6: String,
    /// Links to the server
    #[serde(default)]
    pub links: Vec<Link>,
    /// Disk configuration (`MANUAL`, `AUTO`)
    #[serde(
        rename = "OS-DCF:diskConfig",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub disk_config: Option<String>,
    /// Availability zone
    #[serde(
        rename = "OS-EXT-AZ:availability_zone",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub availability_zone: Option<String>,
    /// Config drive flag as reported by the API
    #[serde(default)]
    pub config_drive: String,
    /// SSH key name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_name: Option<String>,
    /// Launch time; older servers report it without an offset
    #[serde(
        rename = "OS-SRV-USG:launched_at",
        default,
        deserialize_with = "deserialize_lenient"
    )]
    pub launched_at: Option<DateTime<FixedOffset>>,
    /// Termination time
    #[serde(
        rename = "OS-SRV-USG:terminated_at",
        default,
        deserialize_with = "deserialize_lenient"
    )]
    pub terminated_at: Option<DateTime<FixedOffset>>,
    /// Security groups
    #[serde(default)]
    pub security_groups: Vec<SecurityGroupRef>,
    /// Compute host
    #[serde(
        rename = "OS-EXT-SRV-ATTR:host",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub host: Option<String>,
    /// Hypervisor instance name
    #[serde(
        rename = "OS-EXT-SRV-ATTR:instance_name",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub instance_name: Option<String>,
    /// Hypervisor hostname
    #[serde(
        rename = "OS-EXT-SRV-ATTR:hypervisor_hostname",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub hypervisor_hostname: Option<String>,
    /// Task in progress, if any
    #[serde(
        rename = "OS-EXT-STS:task_state",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub task_state: Option<String>,
    /// VM state
    #[serde(
        rename = "OS-EXT-STS:vm_state",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub vm_state: Option<String>,
    /// Power state code
    #[serde(
        rename = "OS-EXT-STS:power_state",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub power_state: Option<i32>,
    /// Attached volumes
    #[serde(rename = "os-extended-volumes:volumes_attached", default)]
    pub volumes_attached: Vec<VolumeRef>,
}

impl Server {
    /// Value of the `instance_name_tag` metadata key.
    #[must_use]
    pub fn instance_name_tag(&self) -> Option<&str> {
        self.metadata.get("instance_name_tag").map(String::as_str)
    }

    /// Returns true while the server is booted from an ISO rescue image.
    #[must_use]
    pub fn is_rescued(&self) -> bool {
        self.status.eq_ignore_ascii_case("RESCUE")
    }
}

impl Normalize for Server {
    fn normalize_timestamps(&mut self, zone: &TimeZoneConfig) {
        self.created = zone.normalize(self.created);
        self.updated = zone.normalize(self.updated);
        zone.normalize_opt(&mut self.launched_at);
        zone.normalize_opt(&mut self.terminated_at);
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ServerEnvelope {
    pub(crate) server: Server,
}

impl Normalize for ServerEnvelope {
    fn normalize_timestamps(&mut self, zone: &TimeZoneConfig) {
        self.server.normalize_timestamps(zone);
    }
}

// Volume-booted servers report `"image": ""` instead of an object.
fn deserialize_image_ref<'de, D>(deserializer: D) -> Result<Option<ResourceRef>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Ref(ResourceRef),
        Text(String),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Ref(reference)) => Some(reference),
        Some(Raw::Text(_)) | None => None,
    })
}

/// Reboot flavour.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum RebootType {
    /// Graceful reboot
    Soft,
    /// Power cycle
    Hard,
}

/// Options of `os-stop`.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct StopOptions {
    /// Power off without waiting for the guest
    pub force_shutdown: bool,
}

/// Options of `reboot`.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct RebootOptions {
    /// Reboot flavour
    #[serde(rename = "type")]
    pub reboot_type: RebootType,
}

/// Options of `rescue`.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct RescueOptions {
    /// ISO image to boot from
    pub rescue_image_ref: ImageId,
}

/// Body of `POST /servers/{id}/action`.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum ServerAction {
    /// Power on
    #[serde(rename = "os-start")]
    Start(()),
    /// Power off, optionally forced
    #[serde(rename = "os-stop")]
    Stop(Option<StopOptions>),
    /// Reboot
    #[serde(rename = "reboot")]
    Reboot(RebootOptions),
    /// Boot from an ISO image
    #[serde(rename = "rescue")]
    Rescue(RescueOptions),
    /// Leave the ISO image
    #[serde(rename = "unrescue")]
    Unrescue(()),
}

impl ServerAction {
    /// `{"os-start": null}`
    #[must_use]
    pub const fn start() -> Self {
        Self::Start(())
    }

    /// `{"os-stop": null}`
    #[must_use]
    pub const fn stop() -> Self {
        Self::Stop(None)
    }

    /// `{"os-stop": {"force_shutdown": true}}`
    #[must_use]
    pub const fn force_shutdown() -> Self {
        Self::Stop(Some(StopOptions {
            force_shutdown: true,
        }))
    }

    /// `{"reboot": {"type": ...}}`
    #[must_use]
    pub const fn reboot(reboot_type: RebootType) -> Self {
        Self::Reboot(RebootOptions { reboot_type })
    }

    /// `{"rescue": {"rescue_image_ref": ...}}`
    #[must_use]
    pub const fn rescue(image: ImageId) -> Self {
        Self::Rescue(RescueOptions {
            rescue_image_ref: image,
        })
    }

    /// `{"unrescue": null}`
    #[must_use]
    pub const fn unrescue() -> Self {
        Self::Unrescue(())
    }

    /// Action name used in logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Start(()) => "os-start",
            Self::Stop(None) => "os-stop",
            Self::Stop(Some(_)) => "os-stop (forced)",
            Self::Reboot(_) => "reboot",
            Self::Rescue(_) => "rescue",
            Self::Unrescue(()) => "unrescue",
        }
    }
}

/// Response of the `rescue` action.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RescueResponse {
    /// Root password of the rescue environment
    #[serde(rename = "adminPass", default)]
    pub admin_pass: String,
}

impl Normalize for RescueResponse {
    fn normalize_timestamps(&mut self, _zone: &TimeZoneConfig) {}
}

/// Kind of remote console to publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConsoleKind {
    /// noVNC browser console
    Vnc,
    /// Serial console
    Serial,
    /// Web-socket serial console
    WebSocket,
}

impl ConsoleKind {
    /// Value of `remote_console.protocol`.
    #[must_use]
    pub const fn protocol(&self) -> &'static str {
        match self {
            Self::Vnc => "vnc",
            Self::Serial => "serial",
            Self::WebSocket => "web",
        }
    }

    /// Value of `remote_console.type`.
    #[must_use]
    pub const fn console_type(&self) -> &'static str {
        match self {
            Self::Vnc => "novnc",
            Self::Serial | Self::WebSocket => "serial",
        }
    }
}

impl fmt::Display for ConsoleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.protocol(), self.console_type())
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct RemoteConsoleRequest {
    remote_console: ConsoleSpec,
}

#[derive(Debug, Serialize)]
struct ConsoleSpec {
    protocol: &'static str,
    #[serde(rename = "type")]
    console_type: &'static str,
}

impl From<ConsoleKind> for RemoteConsoleRequest {
    fn from(kind: ConsoleKind) -> Self {
        Self {
            remote_console: ConsoleSpec {
                protocol: kind.protocol(),
                console_type: kind.console_type(),
            },
        }
    }
}

/// Published console URL.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RemoteConsole {
    /// Console protocol
    pub protocol: String,
    /// Console type
    #[serde(rename = "type")]
    pub console_type: String,
    /// URL to open
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RemoteConsoleEnvelope {
    pub(crate) remote_console: RemoteConsole,
}

impl Normalize for RemoteConsoleEnvelope {
    fn normalize_timestamps(&mut self, _zone: &TimeZoneConfig) {}
}
