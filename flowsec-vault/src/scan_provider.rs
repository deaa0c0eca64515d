//! Threat-intelligence scanning provider seam.
//!
//! The provider is an external, rate-limited reputation service. The core
//! only needs report lookups and submissions; auth and quotas are the
//! adapter's concern.

use crate::error::VaultResult;
use crate::types::ResourceKind;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Provider reference to an accepted submission.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanHandle {
    pub scan_id: String,
    pub permalink: Option<String>,
}

/// One engine's result inside a report.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineResult {
    pub detected: bool,
    /// Detection name; absent when the engine found nothing.
    pub result: Option<String>,
}

/// An existing provider report for a resource.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderReport {
    pub scan_id: Option<String>,
    pub positives: u32,
    pub total: u32,
    pub scans: BTreeMap<String, EngineResult>,
    pub permalink: Option<String>,
}

/// Operations the scan orchestrator needs from a provider.
///
/// Report lookups return `Ok(None)` when the provider has no report yet.
/// Network and API failures are `VaultError::ProviderUnavailable`.
#[async_trait]
pub trait ScanProvider: Send + Sync {
    /// Looks up a file report by SHA-256 hex or provider scan id.
    async fn file_report(&self, resource: &str) -> VaultResult<Option<ProviderReport>>;

    /// Uploads a file for scanning.
    async fn submit_file(&self, file_name: &str, payload: &[u8]) -> VaultResult<ScanHandle>;

    /// Looks up a URL report by URL or provider scan id.
    async fn url_report(&self, resource: &str) -> VaultResult<Option<ProviderReport>>;

    /// Submits a URL for scanning.
    async fn submit_url(&self, url: &str) -> VaultResult<ScanHandle>;

    /// Asks the provider to scan an already-known resource again.
    async fn rescan(&self, kind: ResourceKind, resource: &str) -> VaultResult<ScanHandle>;
}
