//! FlowSec file vault.
//!
//! Ties envelope encryption to an asynchronous malware/URL scanning pipeline:
//! - Envelope-encrypted file sharing against a public key directory
//! - Content-hash scan cache with a fixed retention window
//! - Scan state machine (`pending → scanning → safe | malicious | error`)
//! - One-way quarantine for files and domain blocking for links
//! - VirusTotal v2, S3 and HTTP key directory adapters
//!
//! The core depends only on the [`KeyDirectory`], [`ObjectStore`],
//! [`VaultStore`] and [`ScanProvider`] traits.

pub mod classifier;
pub mod clock;
pub mod config;
pub mod envelope;
pub mod error;
pub mod fingerprint;
pub mod hash_cache;
pub mod key_directory;
pub mod object_store;
pub mod orchestrator;
pub mod record_store;
pub mod s3_store;
pub mod scan_provider;
pub mod service;
pub mod types;
pub mod verdict;
pub mod virustotal;

pub use classifier::{KeywordClassifier, ThreatClassifier};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::VaultConfig;
pub use error::{VaultError, VaultResult};
pub use fingerprint::Fingerprint;
pub use hash_cache::HashCache;
pub use key_directory::{HttpKeyDirectory, InMemoryKeyDirectory, KeyDirectory};
pub use object_store::{InMemoryObjectStore, ObjectStore};
pub use orchestrator::ScanOrchestrator;
pub use record_store::{InMemoryVaultStore, VaultStore};
pub use s3_store::S3ObjectStore;
pub use scan_provider::{ProviderReport, ScanProvider};
pub use service::VaultService;
pub use types::*;
pub use virustotal::{ApiUsage, VirusTotalClient};
