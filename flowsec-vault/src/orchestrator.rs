//! Scan orchestration.
//!
//! Drives each vault record through `pending → scanning → verdict`,
//! deduplicating provider calls through the [`HashCache`]. Provider failures
//! are recorded on the record as the `error` state and never returned to the
//! caller; only storage and state-machine errors are.
//!
//! No store lock is held across a provider call: every state change is a
//! single `update_record` applied after the await completes.

use crate::classifier::{KeywordClassifier, ThreatClassifier};
use crate::clock::Clock;
use crate::config::ScanConfig;
use crate::error::{VaultError, VaultResult};
use crate::hash_cache::HashCache;
use crate::record_store::VaultStore;
use crate::scan_provider::{ScanHandle, ScanProvider};
use crate::types::{ResourceKind, ScanStatus, VaultRecord};
use crate::verdict::{format_verdict, Verdict};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// What a provider round trip produced.
enum Outcome {
    Verdict(Verdict),
    Submitted(ScanHandle),
}

pub struct ScanOrchestrator {
    store: Arc<dyn VaultStore>,
    cache: HashCache,
    provider: Arc<dyn ScanProvider>,
    classifier: Arc<dyn ThreatClassifier>,
    clock: Arc<dyn Clock>,
    config: ScanConfig,
}

impl ScanOrchestrator {
    pub fn new(
        store: Arc<dyn VaultStore>,
        provider: Arc<dyn ScanProvider>,
        clock: Arc<dyn Clock>,
        config: ScanConfig,
    ) -> Self {
        if let Err(e) = config.validate() {
            warn!("{e}");
        }
        let retention = config.cache_retention();
        Self {
            store,
            cache: HashCache::new(clock.clone(), retention),
            provider,
            classifier: Arc::new(KeywordClassifier),
            clock,
            config,
        }
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn ThreatClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn cache(&self) -> &HashCache {
        &self.cache
    }

    async fn update<F>(&self, id: &str, f: F) -> VaultResult<VaultRecord>
    where
        F: FnOnce(&mut VaultRecord) -> VaultResult<()> + Send + 'static,
    {
        self.store.update_record(id, Box::new(f)).await
    }

    /// Adopts a fresh cached verdict, if there is one.
    async fn try_cache(&self, record: &VaultRecord) -> VaultResult<Option<VaultRecord>> {
        let Some(cached) = self.cache.lookup(&record.fingerprint).await else {
            return Ok(None);
        };
        debug!(
            "cache hit for record {} ({}): {}",
            record.id, record.fingerprint, cached.status
        );
        let updated = self
            .update(&record.id, move |r| r.adopt_cached(&cached))
            .await?;
        Ok(Some(updated))
    }

    /// Scans a file record's plaintext payload.
    ///
    /// A cache hit copies the cached verdict without calling the provider.
    /// Otherwise the record enters `scanning`, an existing provider report is
    /// used if there is one, and the payload is uploaded if not.
    pub async fn submit_file(&self, record_id: &str, payload: &[u8]) -> VaultResult<VaultRecord> {
        let record = self.store.get_record(record_id).await?;
        expect_kind(&record, ResourceKind::File)?;

        if let Some(hit) = self.try_cache(&record).await? {
            return Ok(hit);
        }

        let now = self.clock.now();
        let record = self.update(record_id, move |r| r.begin_scan(now)).await?;

        let outcome = match self.provider.file_report(record.fingerprint.as_str()).await {
            Ok(Some(report)) => Ok(Outcome::Verdict(format_verdict(
                &report,
                self.classifier.as_ref(),
            ))),
            Ok(None) => self
                .provider
                .submit_file(&record.name, payload)
                .await
                .map(Outcome::Submitted),
            Err(e) => Err(e),
        };

        self.finish(record_id, outcome).await
    }

    /// Scans a link record's URL. Same flow as [`Self::submit_file`].
    pub async fn submit_url(&self, record_id: &str) -> VaultResult<VaultRecord> {
        let record = self.store.get_record(record_id).await?;
        expect_kind(&record, ResourceKind::Link)?;

        if let Some(hit) = self.try_cache(&record).await? {
            return Ok(hit);
        }

        let now = self.clock.now();
        let record = self.update(record_id, move |r| r.begin_scan(now)).await?;
        let url = record.name.as_str();

        let outcome = match self.provider.url_report(url).await {
            Ok(Some(report)) => Ok(Outcome::Verdict(format_verdict(
                &report,
                self.classifier.as_ref(),
            ))),
            Ok(None) => self.provider.submit_url(url).await.map(Outcome::Submitted),
            Err(e) => Err(e),
        };

        self.finish(record_id, outcome).await
    }

    /// Polls the provider once for a `scanning` record.
    ///
    /// Records in any other state are returned unchanged.
    pub async fn refresh(&self, record_id: &str) -> VaultResult<VaultRecord> {
        let record = self.store.get_record(record_id).await?;
        if record.status != ScanStatus::Scanning {
            return Ok(record);
        }

        let resource = match (&record.provider_scan_id, record.kind) {
            (Some(scan_id), _) => scan_id.clone(),
            (None, ResourceKind::File) => record.fingerprint.as_str().to_string(),
            (None, ResourceKind::Link) => record.name.clone(),
        };

        let report = match record.kind {
            ResourceKind::File => self.provider.file_report(&resource).await,
            ResourceKind::Link => self.provider.url_report(&resource).await,
        };

        match report {
            Ok(Some(report)) => {
                let verdict = format_verdict(&report, self.classifier.as_ref());
                self.finish(record_id, Ok(Outcome::Verdict(verdict))).await
            }
            Ok(None) => {
                debug!("record {record_id}: provider report not ready");
                Ok(record)
            }
            Err(e) => self.finish(record_id, Err(e)).await,
        }
    }

    /// Refreshes until the record leaves `pending`/`scanning` or the poll
    /// budget runs out, then returns the record as it stands.
    pub async fn await_verdict(&self, record_id: &str) -> VaultResult<VaultRecord> {
        let interval = Duration::from_millis(self.config.poll_interval_ms);

        for attempt in 1..=self.config.max_poll_attempts {
            let record = self.refresh(record_id).await?;
            if record.status.is_terminal() {
                return Ok(record);
            }
            debug!(
                "record {record_id} still {} after poll {attempt}/{}",
                record.status, self.config.max_poll_attempts
            );
            if attempt < self.config.max_poll_attempts {
                tokio::time::sleep(interval).await;
            }
        }

        self.store.get_record(record_id).await
    }

    /// Re-submits a record with a terminal verdict, bypassing the cache.
    ///
    /// Records still `pending` or `scanning` are rejected.
    pub async fn rescan(&self, record_id: &str) -> VaultResult<VaultRecord> {
        let now = self.clock.now();
        let record = self
            .update(record_id, move |r| {
                if !r.status.is_terminal() {
                    return Err(VaultError::InvalidTransition {
                        from: r.status,
                        to: ScanStatus::Scanning,
                    });
                }
                r.begin_scan(now)
            })
            .await?;

        let resource = match record.kind {
            ResourceKind::File => record.fingerprint.as_str(),
            ResourceKind::Link => record.name.as_str(),
        };

        info!(
            "rescanning {} {record_id} (attempt {})",
            record.kind, record.scan_count
        );
        let outcome = self
            .provider
            .rescan(record.kind, resource)
            .await
            .map(Outcome::Submitted);

        self.finish(record_id, outcome).await
    }

    /// Quarantines a file record. Idempotent and one-way.
    pub async fn quarantine(&self, record_id: &str) -> VaultResult<VaultRecord> {
        let now = self.clock.now();
        let mut newly = false;
        let record = self
            .store
            .update_record(
                record_id,
                Box::new(|r: &mut VaultRecord| {
                    expect_kind(r, ResourceKind::File)?;
                    newly = r.mark_quarantined(now);
                    Ok(())
                }),
            )
            .await?;
        if newly {
            info!("quarantined file {record_id}");
        }
        Ok(record)
    }

    /// Blocks a link record's domain. Idempotent and one-way.
    pub async fn block_domain(&self, record_id: &str) -> VaultResult<VaultRecord> {
        let now = self.clock.now();
        let mut newly = false;
        let record = self
            .store
            .update_record(
                record_id,
                Box::new(|r: &mut VaultRecord| {
                    expect_kind(r, ResourceKind::Link)?;
                    newly = r.mark_blocked(now);
                    Ok(())
                }),
            )
            .await?;
        if newly {
            info!(
                "blocked domain {} for link {record_id}",
                record.domain.as_deref().unwrap_or("unknown")
            );
        }
        Ok(record)
    }

    /// Applies a provider outcome and refreshes the cache.
    ///
    /// Verdicts replace the cached entry. A `scanning` record is cached only
    /// when no live entry exists, so a rescan keeps serving the last verdict.
    async fn finish(
        &self,
        record_id: &str,
        outcome: VaultResult<Outcome>,
    ) -> VaultResult<VaultRecord> {
        let now = self.clock.now();

        let result = match outcome {
            Ok(Outcome::Verdict(verdict)) => {
                self.update(record_id, move |r| r.apply_verdict(verdict, now))
                    .await
            }
            Ok(Outcome::Submitted(handle)) => {
                self.update(record_id, move |r| {
                    r.provider_scan_id = Some(handle.scan_id);
                    if handle.permalink.is_some() {
                        r.results.permalink = handle.permalink;
                    }
                    Ok(())
                })
                .await
            }
            Err(e) => {
                warn!("scan provider failed for record {record_id}: {e}");
                let message = e.to_string();
                self.update(record_id, move |r| r.fail(message, now)).await
            }
        };

        let record = match result {
            Ok(record) => record,
            // A concurrent refresh already moved the record on.
            Err(VaultError::InvalidTransition { from, to }) => {
                debug!("record {record_id}: dropped stale transition {from} -> {to}");
                return self.store.get_record(record_id).await;
            }
            Err(e) => return Err(e),
        };

        if record.status.is_terminal() {
            info!("record {record_id} is {}", record.status);
        }
        match record.status {
            ScanStatus::Safe | ScanStatus::Malicious => {
                self.cache
                    .store(record.fingerprint.clone(), record.clone())
                    .await;
            }
            ScanStatus::Scanning => {
                self.cache
                    .store_if_vacant(record.fingerprint.clone(), record.clone())
                    .await;
            }
            ScanStatus::Pending | ScanStatus::Error => {}
        }
        Ok(record)
    }
}

fn expect_kind(record: &VaultRecord, expected: ResourceKind) -> VaultResult<()> {
    if record.kind != expected {
        return Err(VaultError::WrongKind {
            id: record.id.clone(),
            expected,
        });
    }
    Ok(())
}
