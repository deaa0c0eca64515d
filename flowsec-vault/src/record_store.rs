//! Persistence for encrypted objects and their vault records.

use crate::error::{VaultError, VaultResult};
use crate::types::{EncryptedObject, VaultRecord};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A mutation applied to one record under the store's write lock.
pub type RecordUpdate<'a> = Box<dyn FnOnce(&mut VaultRecord) -> VaultResult<()> + Send + 'a>;

/// Object and record persistence.
///
/// Objects are write-once. Records change only through `update_record`,
/// which applies the mutation atomically: if it returns an error the stored
/// record is left untouched.
#[async_trait]
pub trait VaultStore: Send + Sync {
    async fn insert_object(&self, object: EncryptedObject) -> VaultResult<()>;

    async fn get_object(&self, id: &str) -> VaultResult<EncryptedObject>;

    async fn insert_record(&self, record: VaultRecord) -> VaultResult<()>;

    async fn get_record(&self, id: &str) -> VaultResult<VaultRecord>;

    /// Applies `update` and returns the stored result.
    async fn update_record(&self, id: &str, update: RecordUpdate<'_>) -> VaultResult<VaultRecord>;

    async fn list_records(&self) -> VaultResult<Vec<VaultRecord>>;
}

#[derive(Default)]
struct Tables {
    objects: HashMap<String, EncryptedObject>,
    records: HashMap<String, VaultRecord>,
}

/// In-process vault store.
#[derive(Clone, Default)]
pub struct InMemoryVaultStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryVaultStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VaultStore for InMemoryVaultStore {
    async fn insert_object(&self, object: EncryptedObject) -> VaultResult<()> {
        let mut tables = self.tables.write().await;
        if tables.objects.contains_key(&object.id) {
            return Err(VaultError::Storage(format!(
                "object {} already exists",
                object.id
            )));
        }
        tables.objects.insert(object.id.clone(), object);
        Ok(())
    }

    async fn get_object(&self, id: &str) -> VaultResult<EncryptedObject> {
        self.tables
            .read()
            .await
            .objects
            .get(id)
            .cloned()
            .ok_or_else(|| VaultError::NotFound(format!("object {id}")))
    }

    async fn insert_record(&self, record: VaultRecord) -> VaultResult<()> {
        self.tables
            .write()
            .await
            .records
            .insert(record.id.clone(), record);
        Ok(())
    }

    async fn get_record(&self, id: &str) -> VaultResult<VaultRecord> {
        self.tables
            .read()
            .await
            .records
            .get(id)
            .cloned()
            .ok_or_else(|| VaultError::NotFound(format!("record {id}")))
    }

    async fn update_record(&self, id: &str, update: RecordUpdate<'_>) -> VaultResult<VaultRecord> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .records
            .get_mut(id)
            .ok_or_else(|| VaultError::NotFound(format!("record {id}")))?;

        let mut draft = stored.clone();
        update(&mut draft)?;
        *stored = draft.clone();
        Ok(draft)
    }

    async fn list_records(&self) -> VaultResult<Vec<VaultRecord>> {
        Ok(self.tables.read().await.records.values().cloned().collect())
    }
}
