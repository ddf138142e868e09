//! Integration tests for the token exchange against a recorded response.

use conoha_core::{ServiceType, TimeZoneConfig};
use conoha_identity::catalog::session_from_body;
use conoha_identity::{Authenticator, Credentials, IdentityClient, PasswordAuthenticator};
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Get the path to the test fixtures directory.
fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

fn load_token_fixture() -> Value {
    let fixture_path = fixtures_dir().join("token_response.json");
    let raw = fs::read_to_string(&fixture_path).unwrap_or_else(|e| {
        panic!(
            "Failed to read token fixture at {}: {}",
            fixture_path.display(),
            e
        )
    });
    serde_json::from_str(&raw).expect("token fixture is valid JSON")
}

async fn mount_token_endpoint(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/v3/auth/tokens"))
        .respond_with(
            ResponseTemplate::new(201)
                .insert_header("x-subject-token", "abc123")
                .set_body_json(load_token_fixture()),
        )
        .mount(server)
        .await;
}

#[test]
fn test_fixture_resolves_known_services_only() {
    let session =
        session_from_body(&load_token_fixture(), "abc123", &TimeZoneConfig::default()).unwrap();
    let endpoints = session.endpoints();

    assert_eq!(endpoints.len(), 4);
    for service in [
        ServiceType::Compute,
        ServiceType::Dns,
        ServiceType::Image,
        ServiceType::ObjectStorage,
    ] {
        assert!(endpoints.get(service).is_some(), "{service} missing");
    }
    assert!(endpoints.get(ServiceType::Identity).is_none());
}

#[tokio::test]
async fn test_exchange_against_fixture() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server).await;

    let client = IdentityClient::new(format!("{}/v3", server.uri())).unwrap();
    let response = client
        .publish_token_by_id(
            "a3b5c7d9e1f2431aa1b2c3d4e5f60718",
            "secret",
            "0f1e2d3c4b5a69788796a5b4c3d2e1f0",
        )
        .await
        .unwrap();
    let session = response.session;

    assert_eq!(session.token(), "abc123");
    assert_eq!(session.user_name(), "gncu12345678");
    assert_eq!(session.tenant_id(), "0f1e2d3c4b5a69788796a5b4c3d2e1f0");
    assert_eq!(session.issued_at().to_rfc3339(), "2024-05-01T12:04:05+09:00");
    assert_eq!(session.expires_at().to_rfc3339(), "2024-05-02T12:04:05+09:00");
    assert_eq!(
        session.endpoint(ServiceType::Compute).unwrap().as_str(),
        "https://compute.c3j1.conoha.io/v2.1/0f1e2d3c4b5a69788796a5b4c3d2e1f0"
    );
}

#[tokio::test]
async fn test_password_authenticator() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server).await;

    let authenticator = PasswordAuthenticator::new(
        IdentityClient::new(server.uri()).unwrap(),
        Credentials::by_name("gncu12345678", "secret", "gnct12345678"),
    );
    let session = authenticator.authenticate().await.unwrap();
    assert_eq!(session.tenant_name(), "gnct12345678");
    assert!(session.is_authenticated());
}
