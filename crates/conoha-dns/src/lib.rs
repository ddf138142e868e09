//! Client for the ConoHa v3 DNS API.
//!
//! Manages domains (zones) and their resource records. Names are normalized
//! to fully qualified form and MX/SRV records are checked for completeness
//! before they are sent.

#![deny(missing_docs)]

pub mod client;
pub mod models;

pub use client::{DnsClient, DnsClientBuilder};
pub use models::{
    Domain, DomainList, ListParams, Record, RecordList, RecordRequest, SortKey, SortOrder,
};

/// Convenient result alias using the shared ConoHa error type.
pub type Result<T> = conoha_core::Result<T>;
