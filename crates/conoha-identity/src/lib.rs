//! Identity client for the ConoHa v3 API.
//!
//! Exchanges password credentials for a bearer token and resolves the
//! returned service catalog into an [`EndpointTable`](conoha_core::EndpointTable).

#![deny(missing_docs)]

pub mod authenticator;
pub mod catalog;
pub mod client;
pub mod models;

pub use authenticator::{Authenticator, PasswordAuthenticator, SessionManager};
pub use client::{IdentityClient, IdentityClientBuilder, TokenResponse, SUBJECT_TOKEN_HEADER};
pub use models::{AuthRequest, Credentials};

/// Convenient result alias using the shared ConoHa error type.
pub type Result<T> = conoha_core::Result<T>;
