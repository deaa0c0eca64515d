//! Public key directory.
//!
//! Stores each principal's SPKI-encoded RSA public key. Private keys never
//! reach the directory.

use crate::error::{VaultError, VaultResult};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use flowsec_crypto::public_key_from_spki_der;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

#[async_trait]
pub trait KeyDirectory: Send + Sync {
    /// Publishes (or replaces) a principal's public key.
    async fn publish_key(&self, principal_id: &str, spki_der: Vec<u8>) -> VaultResult<()>;

    /// Fetches a principal's public key, or `KeyDirectoryMiss`.
    async fn get_key(&self, principal_id: &str) -> VaultResult<Vec<u8>>;
}

/// In-process key directory.
#[derive(Clone, Default)]
pub struct InMemoryKeyDirectory {
    keys: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl InMemoryKeyDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyDirectory for InMemoryKeyDirectory {
    async fn publish_key(&self, principal_id: &str, spki_der: Vec<u8>) -> VaultResult<()> {
        public_key_from_spki_der(&spki_der)?;
        self.keys
            .write()
            .await
            .insert(principal_id.to_string(), spki_der);
        debug!("published public key for {principal_id}");
        Ok(())
    }

    async fn get_key(&self, principal_id: &str) -> VaultResult<Vec<u8>> {
        self.keys
            .read()
            .await
            .get(principal_id)
            .cloned()
            .ok_or_else(|| VaultError::KeyDirectoryMiss(principal_id.to_string()))
    }
}

/// Key directory backed by the FlowSec HTTP API.
///
/// `PUT /api/keys/{principal}` publishes `{ public_key, fingerprint }`;
/// `GET /api/keys/{principal}` returns `{ public_key }` or 404.
pub struct HttpKeyDirectory {
    client: Client,
    base_url: String,
}

#[derive(Deserialize)]
struct KeyResponse {
    public_key: String,
}

impl HttpKeyDirectory {
    pub fn new(base_url: impl Into<String>) -> VaultResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    fn key_url(&self, principal_id: &str) -> VaultResult<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| VaultError::Config(format!("invalid key directory URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| VaultError::Config("key directory URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(["api", "keys", principal_id]);
        Ok(url)
    }
}

#[async_trait]
impl KeyDirectory for HttpKeyDirectory {
    async fn publish_key(&self, principal_id: &str, spki_der: Vec<u8>) -> VaultResult<()> {
        public_key_from_spki_der(&spki_der)?;

        let body = serde_json::json!({
            "public_key": STANDARD.encode(&spki_der),
            "fingerprint": hex::encode(Sha256::digest(&spki_der)),
        });

        self.client
            .put(self.key_url(principal_id)?)
            .json(&body)
            .send()
            .await?
            .error_for_status()
            .map_err(|e| VaultError::Api(e.to_string()))?;

        debug!("published public key for {principal_id}");
        Ok(())
    }

    async fn get_key(&self, principal_id: &str) -> VaultResult<Vec<u8>> {
        let resp = self.client.get(self.key_url(principal_id)?).send().await?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Err(VaultError::KeyDirectoryMiss(principal_id.to_string()));
        }

        let data: KeyResponse = resp
            .error_for_status()
            .map_err(|e| VaultError::Api(e.to_string()))?
            .json()
            .await?;

        if data.public_key.is_empty() {
            return Err(VaultError::KeyDirectoryMiss(principal_id.to_string()));
        }

        STANDARD
            .decode(&data.public_key)
            .map_err(|e| VaultError::Api(format!("invalid public key encoding: {e}")))
    }
}
