//! Client-facing vault operations.
//!
//! Sharing returns as soon as the ciphertext and records are persisted; the
//! scan runs as a background task and its verdict is observed by polling
//! [`VaultService::get_vault_status`] or [`VaultService::await_verdict`].

use crate::clock::Clock;
use crate::config::ScanConfig;
use crate::envelope::{EnvelopeManager, SealedObject};
use crate::error::{VaultError, VaultResult};
use crate::fingerprint::{fingerprint_bytes, fingerprint_url};
use crate::key_directory::KeyDirectory;
use crate::object_store::ObjectStore;
use crate::orchestrator::ScanOrchestrator;
use crate::record_store::VaultStore;
use crate::scan_provider::ScanProvider;
use crate::types::{
    EncryptedObject, ObjectContent, ResourceKind, ScanStats, ScanStatus, VaultRecord,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use flowsec_crypto::{EncryptedPayload, RsaPrivateKey, RsaPublicKey, IV_SIZE};
use reqwest::Url;
use std::sync::{Arc, Mutex};
use tokio::task::JoinSet;
use tracing::{info, warn};
use uuid::Uuid;

pub struct VaultService {
    store: Arc<dyn VaultStore>,
    objects: Arc<dyn ObjectStore>,
    envelopes: EnvelopeManager,
    orchestrator: Arc<ScanOrchestrator>,
    clock: Arc<dyn Clock>,
    /// In-flight background scans. Aborted if the service is dropped.
    scans: Mutex<JoinSet<()>>,
}

impl VaultService {
    pub fn new(
        store: Arc<dyn VaultStore>,
        objects: Arc<dyn ObjectStore>,
        directory: Arc<dyn KeyDirectory>,
        provider: Arc<dyn ScanProvider>,
        clock: Arc<dyn Clock>,
        config: ScanConfig,
    ) -> Self {
        let orchestrator =
            ScanOrchestrator::new(store.clone(), provider, clock.clone(), config);
        Self::with_orchestrator(store, objects, directory, Arc::new(orchestrator), clock)
    }

    /// Builds a service around an existing orchestrator (e.g. one with a
    /// custom threat classifier). The orchestrator must share `store`.
    pub fn with_orchestrator(
        store: Arc<dyn VaultStore>,
        objects: Arc<dyn ObjectStore>,
        directory: Arc<dyn KeyDirectory>,
        orchestrator: Arc<ScanOrchestrator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            objects,
            envelopes: EnvelopeManager::new(directory),
            orchestrator,
            clock,
            scans: Mutex::new(JoinSet::new()),
        }
    }

    pub fn orchestrator(&self) -> &Arc<ScanOrchestrator> {
        &self.orchestrator
    }

    /// Publishes a principal's public key so others can share to them.
    pub async fn publish_key(&self, principal_id: &str, public: &RsaPublicKey) -> VaultResult<()> {
        self.envelopes.publish_key(principal_id, public).await
    }

    /// Encrypts `payload` for `recipient_id` and stores it.
    ///
    /// Fails with `KeyDirectoryMiss` before anything is encrypted or stored
    /// if the recipient has no published key. Returns the object id once the
    /// ciphertext is stored; the scan continues in the background.
    pub async fn share_file(
        &self,
        owner_id: &str,
        recipient_id: &str,
        file_name: &str,
        mime_type: &str,
        payload: Vec<u8>,
    ) -> VaultResult<String> {
        let SealedObject {
            payload: encrypted,
            wrapped_key,
        } = self.envelopes.seal_for(recipient_id, &payload).await?;

        let storage = self.objects.store(encrypted.ciphertext).await?;
        let blob = storage.clone();

        let object = EncryptedObject {
            id: Uuid::now_v7().to_string(),
            owner_id: owner_id.to_string(),
            recipient_id: Some(recipient_id.to_string()),
            name: file_name.to_string(),
            created_at: self.clock.now(),
            content: ObjectContent::File {
                size_bytes: payload.len() as u64,
                mime_type: mime_type.to_string(),
                iv: STANDARD.encode(encrypted.iv),
                wrapped_key: STANDARD.encode(&wrapped_key),
                storage,
            },
        };
        let record = VaultRecord::pending(&object, fingerprint_bytes(&payload));
        let id = object.id.clone();

        if let Err(e) = self.persist(object, record).await {
            warn!(
                "ciphertext {} for file {id} is unreferenced: {e}",
                blob.as_str()
            );
            return Err(e);
        }
        info!(
            "shared file {id} ({} bytes) from {owner_id} to {recipient_id}",
            payload.len()
        );

        let orchestrator = self.orchestrator.clone();
        let record_id = id.clone();
        self.spawn_scan(async move {
            if let Err(e) = orchestrator.submit_file(&record_id, &payload).await {
                warn!("background scan of file {record_id} failed: {e}");
            }
        });

        Ok(id)
    }

    /// Records a shared link and starts its URL scan in the background.
    pub async fn share_url(
        &self,
        owner_id: &str,
        recipient_id: Option<&str>,
        url: &str,
    ) -> VaultResult<String> {
        let domain = extract_domain(url);
        let object = EncryptedObject {
            id: Uuid::now_v7().to_string(),
            owner_id: owner_id.to_string(),
            recipient_id: recipient_id.map(str::to_string),
            name: url.to_string(),
            created_at: self.clock.now(),
            content: ObjectContent::Link {
                url: url.to_string(),
                domain: domain.clone(),
            },
        };
        let record = VaultRecord::pending(&object, fingerprint_url(url));
        let id = object.id.clone();

        self.persist(object, record).await?;
        info!("shared link {id} to {domain} from {owner_id}");

        let orchestrator = self.orchestrator.clone();
        let record_id = id.clone();
        self.spawn_scan(async move {
            if let Err(e) = orchestrator.submit_url(&record_id).await {
                warn!("background scan of link {record_id} failed: {e}");
            }
        });

        Ok(id)
    }

    async fn persist(&self, object: EncryptedObject, record: VaultRecord) -> VaultResult<()> {
        self.store.insert_object(object).await?;
        self.store.insert_record(record).await
    }

    fn spawn_scan<F>(&self, task: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let mut scans = self.scans.lock().unwrap_or_else(|e| e.into_inner());
        while scans.try_join_next().is_some() {}
        scans.spawn(task);
    }

    /// Waits for every background scan started so far.
    pub async fn wait_for_scans(&self) {
        let mut pending = {
            let mut scans = self.scans.lock().unwrap_or_else(|e| e.into_inner());
            std::mem::take(&mut *scans)
        };
        while let Some(joined) = pending.join_next().await {
            if let Err(e) = joined {
                warn!("background scan task ended abnormally: {e}");
            }
        }
    }

    /// Fetches, unwraps, and decrypts a shared file.
    ///
    /// Quarantined files are refused. Crypto failures (wrong key, tampered
    /// ciphertext) surface as `VaultError::Crypto`.
    pub async fn fetch_and_decrypt(
        &self,
        object_id: &str,
        private_key: &RsaPrivateKey,
    ) -> VaultResult<Vec<u8>> {
        let object = self.store.get_object(object_id).await?;
        let ObjectContent::File {
            iv,
            wrapped_key,
            storage,
            ..
        } = &object.content
        else {
            return Err(VaultError::WrongKind {
                id: object.id,
                expected: ResourceKind::File,
            });
        };

        if self.store.get_record(object_id).await?.is_quarantined() {
            return Err(VaultError::Quarantined(object_id.to_string()));
        }

        let iv: [u8; IV_SIZE] = STANDARD
            .decode(iv)
            .ok()
            .and_then(|bytes| bytes.try_into().ok())
            .ok_or_else(|| VaultError::Storage(format!("object {object_id} has a corrupt IV")))?;
        let wrapped_key = STANDARD.decode(wrapped_key).map_err(|e| {
            VaultError::Storage(format!("object {object_id} has a corrupt wrapped key: {e}"))
        })?;
        let ciphertext = self.objects.fetch(storage).await?;

        let sealed = SealedObject {
            payload: EncryptedPayload { iv, ciphertext },
            wrapped_key,
        };
        self.envelopes.open(&sealed, private_key)
    }

    pub async fn get_vault_status(&self, object_id: &str) -> VaultResult<VaultRecord> {
        self.store.get_record(object_id).await
    }

    pub async fn quarantine(&self, object_id: &str) -> VaultResult<VaultRecord> {
        self.orchestrator.quarantine(object_id).await
    }

    pub async fn block_domain(&self, link_id: &str) -> VaultResult<VaultRecord> {
        self.orchestrator.block_domain(link_id).await
    }

    pub async fn rescan(&self, id: &str) -> VaultResult<VaultRecord> {
        self.orchestrator.rescan(id).await
    }

    pub async fn await_verdict(&self, id: &str) -> VaultResult<VaultRecord> {
        self.orchestrator.await_verdict(id).await
    }

    /// An owner's records, most recently scanned first.
    pub async fn records_for_owner(&self, owner_id: &str) -> VaultResult<Vec<VaultRecord>> {
        let mut records: Vec<_> = self
            .store
            .list_records()
            .await?
            .into_iter()
            .filter(|r| r.owner_id == owner_id)
            .collect();
        records.sort_by(|a, b| b.scan_date.cmp(&a.scan_date));
        Ok(records)
    }

    pub async fn malicious_records(&self, owner_id: &str) -> VaultResult<Vec<VaultRecord>> {
        let mut records = self.records_for_owner(owner_id).await?;
        records.retain(|r| r.status == ScanStatus::Malicious);
        Ok(records)
    }

    /// All link records pointing at `domain` (case-insensitive).
    pub async fn records_by_domain(&self, domain: &str) -> VaultResult<Vec<VaultRecord>> {
        Ok(self
            .store
            .list_records()
            .await?
            .into_iter()
            .filter(|r| {
                r.domain
                    .as_deref()
                    .is_some_and(|d| d.eq_ignore_ascii_case(domain))
            })
            .collect())
    }

    pub async fn scan_stats(&self, owner_id: &str) -> VaultResult<ScanStats> {
        let mut stats = ScanStats::default();
        for record in self.store.list_records().await? {
            if record.owner_id == owner_id {
                stats.count(record.status);
            }
        }
        Ok(stats)
    }

    /// Counts a click on a shared link.
    pub async fn record_click(&self, link_id: &str) -> VaultResult<VaultRecord> {
        self.store
            .update_record(
                link_id,
                Box::new(|r: &mut VaultRecord| {
                    if r.kind != ResourceKind::Link {
                        return Err(VaultError::WrongKind {
                            id: r.id.clone(),
                            expected: ResourceKind::Link,
                        });
                    }
                    r.clicks += 1;
                    Ok(())
                }),
            )
            .await
    }

    /// Drops expired scan cache entries. Returns how many were removed.
    pub async fn evict_expired_cache(&self) -> usize {
        self.orchestrator.cache().evict_expired().await
    }
}

/// Host of `url`, or `"unknown"` if it does not parse.
pub fn extract_domain(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| "unknown".to_string())
}
