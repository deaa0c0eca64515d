//! Shared test helpers: a scriptable scan provider and an in-memory vault.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use flowsec_crypto::{generate_keypair, RecipientKeyPair};
use flowsec_vault::config::ScanConfig;
use flowsec_vault::scan_provider::{EngineResult, ProviderReport, ScanHandle, ScanProvider};
use flowsec_vault::{
    InMemoryKeyDirectory, InMemoryObjectStore, InMemoryVaultStore, ManualClock, ResourceKind,
    VaultError, VaultResult, VaultService,
};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

/// Routes `tracing` output through the test harness. Honors `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// RSA key generation is slow; share one pair per principal per test binary.
pub fn alice() -> &'static RecipientKeyPair {
    static KEY: OnceLock<RecipientKeyPair> = OnceLock::new();
    KEY.get_or_init(|| generate_keypair().expect("keygen must succeed"))
}

pub fn bob() -> &'static RecipientKeyPair {
    static KEY: OnceLock<RecipientKeyPair> = OnceLock::new();
    KEY.get_or_init(|| generate_keypair().expect("keygen must succeed"))
}

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
}

pub fn scan_config() -> ScanConfig {
    ScanConfig {
        cache_retention_secs: 24 * 60 * 60,
        poll_interval_ms: 1,
        max_poll_attempts: 3,
    }
}

/// A report from 67 engines with no detections.
pub fn clean_report() -> ProviderReport {
    let mut scans = BTreeMap::new();
    scans.insert("Kaspersky".to_string(), EngineResult::default());
    scans.insert("ESET-NOD32".to_string(), EngineResult::default());
    ProviderReport {
        scan_id: Some("scan-clean".into()),
        positives: 0,
        total: 67,
        scans,
        permalink: Some("https://www.virustotal.com/file/clean".into()),
    }
}

/// A report where two engines flag the payload.
pub fn infected_report() -> ProviderReport {
    let mut scans = BTreeMap::new();
    scans.insert(
        "Kaspersky".to_string(),
        EngineResult {
            detected: true,
            result: Some("Trojan.Generic".into()),
        },
    );
    scans.insert(
        "Avast".to_string(),
        EngineResult {
            detected: true,
            result: Some("Adware.Agent".into()),
        },
    );
    scans.insert("ESET-NOD32".to_string(), EngineResult::default());
    ProviderReport {
        scan_id: Some("scan-infected".into()),
        positives: 2,
        total: 67,
        scans,
        permalink: Some("https://www.virustotal.com/file/infected".into()),
    }
}

/// Scan provider that answers from scripted reports and counts calls.
#[derive(Default)]
pub struct FakeScanProvider {
    file_report: Mutex<Option<ProviderReport>>,
    url_report: Mutex<Option<ProviderReport>>,
    failing: AtomicBool,
    pub file_report_calls: AtomicUsize,
    pub submit_file_calls: AtomicUsize,
    pub url_report_calls: AtomicUsize,
    pub submit_url_calls: AtomicUsize,
    pub rescan_calls: AtomicUsize,
}

impl FakeScanProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_file_report(&self, report: Option<ProviderReport>) {
        *self.file_report.lock().unwrap() = report;
    }

    pub fn set_url_report(&self, report: Option<ProviderReport>) {
        *self.url_report.lock().unwrap() = report;
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Total provider calls of any kind.
    pub fn calls(&self) -> usize {
        self.file_report_calls.load(Ordering::SeqCst)
            + self.submit_file_calls.load(Ordering::SeqCst)
            + self.url_report_calls.load(Ordering::SeqCst)
            + self.submit_url_calls.load(Ordering::SeqCst)
            + self.rescan_calls.load(Ordering::SeqCst)
    }

    fn check(&self) -> VaultResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(VaultError::ProviderUnavailable(
                "rate limit exceeded (HTTP 204)".into(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl ScanProvider for FakeScanProvider {
    async fn file_report(&self, _resource: &str) -> VaultResult<Option<ProviderReport>> {
        self.file_report_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self.file_report.lock().unwrap().clone())
    }

    async fn submit_file(&self, file_name: &str, _payload: &[u8]) -> VaultResult<ScanHandle> {
        let n = self.submit_file_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(ScanHandle {
            scan_id: format!("file-scan-{n}"),
            permalink: Some(format!("https://www.virustotal.com/file/{file_name}")),
        })
    }

    async fn url_report(&self, _resource: &str) -> VaultResult<Option<ProviderReport>> {
        self.url_report_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self.url_report.lock().unwrap().clone())
    }

    async fn submit_url(&self, _url: &str) -> VaultResult<ScanHandle> {
        let n = self.submit_url_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(ScanHandle {
            scan_id: format!("url-scan-{n}"),
            permalink: None,
        })
    }

    async fn rescan(&self, kind: ResourceKind, _resource: &str) -> VaultResult<ScanHandle> {
        let n = self.rescan_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(ScanHandle {
            scan_id: format!("{kind}-rescan-{n}"),
            permalink: None,
        })
    }
}

/// A vault service wired to in-memory collaborators, with handles to each.
pub struct TestVault {
    pub service: VaultService,
    pub store: InMemoryVaultStore,
    pub objects: InMemoryObjectStore,
    pub directory: InMemoryKeyDirectory,
    pub provider: Arc<FakeScanProvider>,
    pub clock: Arc<ManualClock>,
}

impl TestVault {
    pub fn new() -> Self {
        init_tracing();
        let store = InMemoryVaultStore::new();
        let objects = InMemoryObjectStore::new();
        let directory = InMemoryKeyDirectory::new();
        let provider = FakeScanProvider::new();
        let clock = Arc::new(ManualClock::new(start_time()));

        let service = VaultService::new(
            Arc::new(store.clone()),
            Arc::new(objects.clone()),
            Arc::new(directory.clone()),
            provider.clone(),
            clock.clone(),
            scan_config(),
        );

        Self {
            service,
            store,
            objects,
            directory,
            provider,
            clock,
        }
    }

    /// Publishes alice's and bob's public keys.
    pub async fn with_principals() -> Self {
        let vault = Self::new();
        vault
            .service
            .publish_key("alice", &alice().public)
            .await
            .unwrap();
        vault.service.publish_key("bob", &bob().public).await.unwrap();
        vault
    }
}
