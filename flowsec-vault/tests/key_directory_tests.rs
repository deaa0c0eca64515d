mod support;

use base64::{Engine, engine::general_purpose::STANDARD};
use flowsec_crypto::CryptoError;
use flowsec_vault::{HttpKeyDirectory, InMemoryKeyDirectory, KeyDirectory, VaultError};
use pretty_assertions::assert_eq;
use support::{alice, bob};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// --- In-memory ---

#[tokio::test]
async fn in_memory_publish_then_get() {
    let directory = InMemoryKeyDirectory::new();
    let der = alice().public_spki_der().unwrap();

    directory.publish_key("alice", der.clone()).await.unwrap();

    assert_eq!(directory.get_key("alice").await.unwrap(), der);
}

#[tokio::test]
async fn in_memory_miss() {
    let directory = InMemoryKeyDirectory::new();
    let err = directory.get_key("nobody").await.unwrap_err();
    assert!(matches!(err, VaultError::KeyDirectoryMiss(ref p) if p == "nobody"));
}

#[tokio::test]
async fn in_memory_republish_replaces() {
    let directory = InMemoryKeyDirectory::new();
    directory
        .publish_key("alice", alice().public_spki_der().unwrap())
        .await
        .unwrap();
    let rotated = bob().public_spki_der().unwrap();
    directory.publish_key("alice", rotated.clone()).await.unwrap();

    assert_eq!(directory.get_key("alice").await.unwrap(), rotated);
}

#[tokio::test]
async fn in_memory_rejects_garbage_keys() {
    let directory = InMemoryKeyDirectory::new();
    let err = directory
        .publish_key("alice", b"not a key".to_vec())
        .await
        .unwrap_err();

    assert!(matches!(err, VaultError::Crypto(CryptoError::KeyEncoding(_))));
    assert!(directory.get_key("alice").await.is_err());
}

// --- HTTP ---

#[tokio::test]
async fn http_get_decodes_base64_key() {
    let server = MockServer::start().await;
    let der = bob().public_spki_der().unwrap();
    Mock::given(method("GET"))
        .and(path("/api/keys/bob@example.com"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "public_key": STANDARD.encode(&der) })),
        )
        .mount(&server)
        .await;

    let directory = HttpKeyDirectory::new(server.uri()).unwrap();
    assert_eq!(directory.get_key("bob@example.com").await.unwrap(), der);
}

#[tokio::test]
async fn http_404_is_miss() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/keys/carol"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let directory = HttpKeyDirectory::new(server.uri()).unwrap();
    let err = directory.get_key("carol").await.unwrap_err();
    assert!(matches!(err, VaultError::KeyDirectoryMiss(ref p) if p == "carol"));
}

#[tokio::test]
async fn http_empty_key_is_miss() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/keys/dave"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "public_key": "" })),
        )
        .mount(&server)
        .await;

    let directory = HttpKeyDirectory::new(server.uri()).unwrap();
    let err = directory.get_key("dave").await.unwrap_err();
    assert!(matches!(err, VaultError::KeyDirectoryMiss(_)));
}

#[tokio::test]
async fn http_server_error_is_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/keys/erin"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let directory = HttpKeyDirectory::new(server.uri()).unwrap();
    let err = directory.get_key("erin").await.unwrap_err();
    assert!(matches!(err, VaultError::Api(_)));
}

#[tokio::test]
async fn http_publish_puts_key_and_fingerprint() {
    let server = MockServer::start().await;
    let der = alice().public_spki_der().unwrap();
    Mock::given(method("PUT"))
        .and(path("/api/keys/alice"))
        .and(body_partial_json(
            serde_json::json!({ "public_key": STANDARD.encode(&der) }),
        ))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let directory = HttpKeyDirectory::new(format!("{}/", server.uri())).unwrap();
    directory.publish_key("alice", der).await.unwrap();
}

#[tokio::test]
async fn http_publish_validates_before_sending() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;

    let directory = HttpKeyDirectory::new(server.uri()).unwrap();
    let err = directory
        .publish_key("alice", vec![0u8; 32])
        .await
        .unwrap_err();
    assert!(matches!(err, VaultError::Crypto(_)));
}
