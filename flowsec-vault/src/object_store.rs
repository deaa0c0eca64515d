//! Ciphertext blob storage.

use crate::error::{VaultError, VaultResult};
use crate::types::StorageHandle;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Opaque blob store for encrypted payloads. Never sees plaintext.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Stores a blob and returns its handle.
    async fn store(&self, bytes: Vec<u8>) -> VaultResult<StorageHandle>;

    /// Fetches a blob, or `NotFound`.
    async fn fetch(&self, handle: &StorageHandle) -> VaultResult<Vec<u8>>;
}

/// In-process object store.
///
/// Counts writes so callers can assert that a failed share stored nothing.
#[derive(Clone, Default)]
pub struct InMemoryObjectStore {
    blobs: Arc<RwLock<HashMap<String, Vec<u8>>>>,
    writes: Arc<AtomicUsize>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful `store` calls.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.blobs.read().await.is_empty()
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn store(&self, bytes: Vec<u8>) -> VaultResult<StorageHandle> {
        let key = format!("objects/{}", Uuid::new_v4());
        self.blobs.write().await.insert(key.clone(), bytes);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(StorageHandle(key))
    }

    async fn fetch(&self, handle: &StorageHandle) -> VaultResult<Vec<u8>> {
        self.blobs
            .read()
            .await
            .get(handle.as_str())
            .cloned()
            .ok_or_else(|| VaultError::NotFound(format!("blob {}", handle.as_str())))
    }
}
