//! Client for the ConoHa v3 compute API.
//!
//! Lists and inspects servers, drives power actions, mounts ISO images and
//! publishes remote console URLs.

#![deny(missing_docs)]

pub mod client;
pub mod models;

pub use client::{ComputeClient, ComputeClientBuilder};
pub use models::{ConsoleKind, RemoteConsole, RescueResponse, Server, ServerAction, ServerSummary};

/// Convenient result alias using the shared ConoHa error type.
pub type Result<T> = conoha_core::Result<T>;
