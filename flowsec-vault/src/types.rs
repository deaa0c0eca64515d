//! Shared types: encrypted objects, vault records, scan results.

use crate::error::{VaultError, VaultResult};
use crate::fingerprint::Fingerprint;
use crate::verdict::Verdict;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Scan lifecycle state of a vault record.
///
/// `Pending → Scanning → {Safe | Malicious | Error}`; terminal states re-enter
/// `Scanning` on rescan. A cache hit may move `Pending` straight to the cached
/// state. Nothing ever moves back to `Pending`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    Pending,
    Scanning,
    Safe,
    Malicious,
    Error,
}

impl ScanStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Safe | Self::Malicious | Self::Error)
    }

    /// Returns true if the state machine allows `self → next`.
    pub fn can_transition_to(self, next: ScanStatus) -> bool {
        use ScanStatus::*;
        match (self, next) {
            (Pending, Scanning | Safe | Malicious) => true,
            (Scanning, Safe | Malicious | Error) => true,
            (Safe | Malicious | Error, Scanning) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Scanning => "scanning",
            Self::Safe => "safe",
            Self::Malicious => "malicious",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// Severity assigned to a single engine detection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreatLevel {
    Low,
    Medium,
    High,
}

/// One engine's positive detection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Threat {
    pub engine: String,
    pub name: String,
    pub level: ThreatLevel,
    pub description: String,
}

/// Engine totals reported by the provider.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineCounts {
    pub total: u32,
    pub positives: u32,
}

/// Provider verdict details attached to a record.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResults {
    pub engines: EngineCounts,
    pub threats: Vec<Threat>,
    pub permalink: Option<String>,
}

/// What a record tracks: an encrypted file or a plaintext link.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    File,
    Link,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File => f.write_str("file"),
            Self::Link => f.write_str("link"),
        }
    }
}

/// Opaque pointer into object storage.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StorageHandle(pub String);

impl StorageHandle {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Payload reference of an object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ObjectContent {
    File {
        size_bytes: u64,
        mime_type: String,
        /// AES-GCM IV, base64.
        iv: String,
        /// RSA-OAEP wrapped object key, base64.
        wrapped_key: String,
        storage: StorageHandle,
    },
    Link {
        url: String,
        domain: String,
    },
}

/// An object shared from one principal to another. Immutable once created.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedObject {
    pub id: String,
    pub owner_id: String,
    pub recipient_id: Option<String>,
    /// Original filename, or the URL for links.
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub content: ObjectContent,
}

impl EncryptedObject {
    pub fn kind(&self) -> ResourceKind {
        match self.content {
            ObjectContent::File { .. } => ResourceKind::File,
            ObjectContent::Link { .. } => ResourceKind::Link,
        }
    }
}

/// Mutable scan state for an object. Shares the object's id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultRecord {
    pub id: String,
    pub kind: ResourceKind,
    pub owner_id: String,
    pub recipient_id: Option<String>,
    /// Filename or URL.
    pub name: String,
    pub domain: Option<String>,
    pub fingerprint: Fingerprint,
    pub status: ScanStatus,
    pub provider_scan_id: Option<String>,
    pub results: ScanResults,
    pub quarantined_at: Option<DateTime<Utc>>,
    pub blocked_at: Option<DateTime<Utc>>,
    /// Number of provider submissions (first scan plus rescans).
    pub scan_count: u32,
    pub created_at: DateTime<Utc>,
    /// Time of the last status change; the cache retention clock.
    pub scan_date: DateTime<Utc>,
    pub last_scanned: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub clicks: u64,
}

impl VaultRecord {
    /// Creates the `pending` record for a freshly created object.
    pub fn pending(object: &EncryptedObject, fingerprint: Fingerprint) -> Self {
        let domain = match &object.content {
            ObjectContent::Link { domain, .. } => Some(domain.clone()),
            ObjectContent::File { .. } => None,
        };
        Self {
            id: object.id.clone(),
            kind: object.kind(),
            owner_id: object.owner_id.clone(),
            recipient_id: object.recipient_id.clone(),
            name: object.name.clone(),
            domain,
            fingerprint,
            status: ScanStatus::Pending,
            provider_scan_id: None,
            results: ScanResults::default(),
            quarantined_at: None,
            blocked_at: None,
            scan_count: 0,
            created_at: object.created_at,
            scan_date: object.created_at,
            last_scanned: None,
            last_error: None,
            clicks: 0,
        }
    }

    /// Moves to `next`, rejecting transitions the state machine forbids.
    pub fn transition(&mut self, next: ScanStatus, now: DateTime<Utc>) -> VaultResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(VaultError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.scan_date = now;
        Ok(())
    }

    /// Enters `scanning` for a provider submission and counts the attempt.
    pub fn begin_scan(&mut self, now: DateTime<Utc>) -> VaultResult<()> {
        self.transition(ScanStatus::Scanning, now)?;
        self.scan_count += 1;
        self.last_scanned = Some(now);
        self.last_error = None;
        Ok(())
    }

    /// Applies a formatted provider verdict.
    ///
    /// A `pending` verdict (no engine results yet) leaves the record in
    /// `scanning` and only refreshes the provider scan id.
    pub fn apply_verdict(&mut self, verdict: Verdict, now: DateTime<Utc>) -> VaultResult<()> {
        if verdict.scan_id.is_some() {
            self.provider_scan_id = verdict.scan_id;
        }
        if verdict.status == ScanStatus::Pending {
            return Ok(());
        }
        self.transition(verdict.status, now)?;
        self.results = verdict.results;
        Ok(())
    }

    /// Records a provider failure as the terminal `error` state.
    pub fn fail(&mut self, message: String, now: DateTime<Utc>) -> VaultResult<()> {
        self.transition(ScanStatus::Error, now)?;
        self.last_error = Some(message);
        Ok(())
    }

    /// Copies a cached record's scan state into this one.
    pub fn adopt_cached(&mut self, cached: &VaultRecord) -> VaultResult<()> {
        if !self.status.can_transition_to(cached.status) {
            return Err(VaultError::InvalidTransition {
                from: self.status,
                to: cached.status,
            });
        }
        self.status = cached.status;
        self.provider_scan_id = cached.provider_scan_id.clone();
        self.results = cached.results.clone();
        self.scan_date = cached.scan_date;
        self.last_scanned = cached.last_scanned;
        Ok(())
    }

    /// Sets the quarantine flag. Returns false if it was already set.
    pub fn mark_quarantined(&mut self, now: DateTime<Utc>) -> bool {
        if self.quarantined_at.is_some() {
            return false;
        }
        self.quarantined_at = Some(now);
        true
    }

    /// Sets the block flag. Returns false if it was already set.
    pub fn mark_blocked(&mut self, now: DateTime<Utc>) -> bool {
        if self.blocked_at.is_some() {
            return false;
        }
        self.blocked_at = Some(now);
        true
    }

    pub fn is_quarantined(&self) -> bool {
        self.quarantined_at.is_some()
    }

    pub fn is_blocked(&self) -> bool {
        self.blocked_at.is_some()
    }

    pub fn is_safe(&self) -> bool {
        self.status == ScanStatus::Safe && self.results.engines.positives == 0
    }

    /// Highest detection severity, or `None` unless the record is malicious.
    pub fn threat_level(&self) -> Option<ThreatLevel> {
        if self.status != ScanStatus::Malicious || self.results.engines.positives == 0 {
            return None;
        }
        self.results
            .threats
            .iter()
            .map(|t| t.level)
            .max()
            .or(Some(ThreatLevel::Low))
    }
}

/// Record counts per scan status.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStats {
    pub pending: usize,
    pub scanning: usize,
    pub safe: usize,
    pub malicious: usize,
    pub error: usize,
}

impl ScanStats {
    pub fn count(&mut self, status: ScanStatus) {
        match status {
            ScanStatus::Pending => self.pending += 1,
            ScanStatus::Scanning => self.scanning += 1,
            ScanStatus::Safe => self.safe += 1,
            ScanStatus::Malicious => self.malicious += 1,
            ScanStatus::Error => self.error += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.pending + self.scanning + self.safe + self.malicious + self.error
    }
}
