//! Fingerprint-keyed scan verdict cache.
//!
//! Deduplicates provider calls for identical payloads and URLs. Losing an
//! entry only costs a redundant provider call. Entries are replaced whole,
//! so readers never see a half-written record.

use crate::clock::Clock;
use crate::fingerprint::Fingerprint;
use crate::types::VaultRecord;
use chrono::Duration;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Thread-safe scan cache with a fixed retention window.
#[derive(Clone)]
pub struct HashCache {
    entries: Arc<RwLock<HashMap<Fingerprint, VaultRecord>>>,
    clock: Arc<dyn Clock>,
    retention: Duration,
}

impl HashCache {
    pub fn new(clock: Arc<dyn Clock>, retention: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            clock,
            retention,
        }
    }

    /// Entries stay valid until strictly older than the retention window.
    fn is_expired(&self, record: &VaultRecord) -> bool {
        self.clock.now() - record.scan_date > self.retention
    }

    /// Returns the cached record, or `None` on a miss or an expired entry.
    pub async fn lookup(&self, fp: &Fingerprint) -> Option<VaultRecord> {
        let entries = self.entries.read().await;
        let record = entries.get(fp)?;
        if self.is_expired(record) {
            debug!("cache entry for {fp} expired");
            return None;
        }
        Some(record.clone())
    }

    /// Inserts or replaces the entry for `fp`. Last write wins.
    pub async fn store(&self, fp: Fingerprint, record: VaultRecord) {
        self.entries.write().await.insert(fp, record);
    }

    /// Inserts `record` only if `fp` has no live entry. Returns whether it
    /// was stored.
    ///
    /// An in-flight scan must not displace a verdict that is still valid.
    pub async fn store_if_vacant(&self, fp: Fingerprint, record: VaultRecord) -> bool {
        let mut entries = self.entries.write().await;
        if entries.get(&fp).is_some_and(|live| !self.is_expired(live)) {
            return false;
        }
        entries.insert(fp, record);
        true
    }

    /// Drops entries older than the retention window. Returns how many.
    pub async fn evict_expired(&self) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, record| !self.is_expired(record));
        let evicted = before - entries.len();
        if evicted > 0 {
            debug!("evicted {evicted} expired scan cache entries");
        }
        evicted
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
