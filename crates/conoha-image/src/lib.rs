//! Client for the ConoHa v3 image API.
//!
//! Creates, uploads, lists and deletes ISO images that compute servers can
//! boot from.

#![deny(missing_docs)]

pub mod client;
pub mod models;

pub use client::{ImageClient, ImageClientBuilder};
pub use models::{CreateIsoImageRequest, Image, ImageList, ImageListParams};

/// Convenient result alias using the shared ConoHa error type.
pub type Result<T> = conoha_core::Result<T>;
