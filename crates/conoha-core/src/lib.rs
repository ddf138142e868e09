//! # conoha-core
//!
//! Core types and utilities for working with the ConoHa v3 API.
//!
//! This crate provides the session model, endpoint table, error handling and
//! HTTP plumbing shared by the identity, compute, DNS and image clients.
//!
//! ## Modules
//!
//! - [`error`] - Error types and API error body normalization
//! - [`endpoint`] - Service tags and the per-session endpoint table
//! - [`session`] - Immutable authenticated session snapshots
//! - [`time`] - Timestamp zone normalization
//! - [`config`] - Configuration structures for ConoHa clients
//! - [`client`] - Shared HTTP client used by every resource client
//! - [`uuid`] - Strongly-typed UUID wrappers for ConoHa resources
//! - [`query`] - Query parameter helper

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod query;
pub mod session;
pub mod time;
pub mod uuid;

// Re-export commonly used types
pub use endpoint::{EndpointTable, ServiceType};
pub use error::{ApiError, Error, ErrorCodeTable, ErrorNormalizer, Result};
pub use session::{Session, SessionBuilder};
pub use time::{Normalize, TimeZoneConfig};
