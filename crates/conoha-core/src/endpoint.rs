//! Service tags and the endpoint table resolved from the identity catalog.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use url::Url;

use crate::error::{Error, Result};

/// The closed set of ConoHa service families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceType {
    /// Identity (token issuance)
    Identity,
    /// Compute (servers)
    Compute,
    /// Load balancer
    LoadBalancer,
    /// Object storage
    ObjectStorage,
    /// DNS
    Dns,
    /// Block storage
    Volume,
    /// Image registry
    Image,
    /// Networking
    Network,
    /// Account / billing
    Account,
    /// S3 compatible storage
    S3,
    /// Managed database
    Database,
}

impl ServiceType {
    /// Returns the service tag as a string.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Identity => "identity",
            Self::Compute => "compute",
            Self::LoadBalancer => "load-balancer",
            Self::ObjectStorage => "object-storage",
            Self::Dns => "dns",
            Self::Volume => "volume",
            Self::Image => "image",
            Self::Network => "network",
            Self::Account => "account",
            Self::S3 => "s3",
            Self::Database => "database",
        }
    }

    /// Returns the `type` this service is published under in the identity
    /// catalog, if the catalog lists it at all.
    #[must_use]
    pub const fn catalog_type(&self) -> Option<&'static str> {
        match self {
            Self::Identity => Some("identity"),
            Self::Compute => Some("compute"),
            Self::LoadBalancer => Some("load-balancer"),
            Self::ObjectStorage => Some("object-store"),
            Self::Dns => Some("dns"),
            Self::Volume => Some("volumev3"),
            Self::Image => Some("image"),
            Self::Network => Some("network"),
            Self::Account => Some("account"),
            Self::S3 | Self::Database => None,
        }
    }

    /// Resolve a catalog `type` tag to a service.
    #[must_use]
    pub fn from_catalog_type(tag: &str) -> Option<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|service| service.catalog_type() == Some(tag))
    }

    /// Returns all service tags.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Identity,
            Self::Compute,
            Self::LoadBalancer,
            Self::ObjectStorage,
            Self::Dns,
            Self::Volume,
            Self::Image,
            Self::Network,
            Self::Account,
            Self::S3,
            Self::Database,
        ]
    }
}

impl FromStr for ServiceType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let tag = s.to_lowercase();
        Self::all()
            .iter()
            .copied()
            .find(|service| service.name() == tag)
            .ok_or_else(|| Error::ConfigError(format!("Unknown service: {s}")))
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Base URLs of the services available to a session.
///
/// Entries that the catalog did not provide are absent. A table is built in
/// one go by the token exchange and replaced, never merged, on the next one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointTable {
    entries: BTreeMap<ServiceType, Url>,
}

impl EndpointTable {
    /// Create an empty table.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Set an endpoint, replacing any previous value.
    pub fn set(&mut self, service: ServiceType, url: Url) {
        self.entries.insert(service, url);
    }

    /// Set an endpoint only when none is present yet.
    ///
    /// Returns true when the entry was stored.
    pub fn set_if_absent(&mut self, service: ServiceType, url: Url) -> bool {
        if self.entries.contains_key(&service) {
            return false;
        }
        self.entries.insert(service, url);
        true
    }

    /// Builder-style variant of [`EndpointTable::set`].
    #[must_use]
    pub fn with(mut self, service: ServiceType, url: Url) -> Self {
        self.set(service, url);
        self
    }

    /// Look up the base URL for a service.
    #[must_use]
    pub fn get(&self, service: ServiceType) -> Option<&Url> {
        self.entries.get(&service)
    }

    /// Look up the base URL for a service, failing when it is absent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingEndpoint`] when the catalog did not list the service.
    pub fn require(&self, service: ServiceType) -> Result<&Url> {
        self.get(service).ok_or(Error::MissingEndpoint(service))
    }

    /// Iterate over the populated entries.
    pub fn iter(&self) -> impl Iterator<Item = (ServiceType, &Url)> {
        self.entries.iter().map(|(service, url)| (*service, url))
    }

    /// Number of populated entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when no endpoint is known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
