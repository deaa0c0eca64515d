//! Vault error types.

use crate::types::{ResourceKind, ScanStatus};
use thiserror::Error;

/// Result type for vault operations.
pub type VaultResult<T> = Result<T, VaultError>;

/// Errors that can occur in vault operations.
///
/// A cache miss is not an error; `HashCache::lookup` returns `None`.
#[derive(Debug, Error)]
pub enum VaultError {
    #[error("no public key published for principal {0}")]
    KeyDirectoryMiss(String),

    #[error("crypto error: {0}")]
    Crypto(#[from] flowsec_crypto::CryptoError),

    #[error("scan provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("object storage error: {0}")]
    Storage(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid scan transition: {from} -> {to}")]
    InvalidTransition { from: ScanStatus, to: ScanStatus },

    #[error("record {id} is not a {expected}")]
    WrongKind { id: String, expected: ResourceKind },

    #[error("object {0} is quarantined")]
    Quarantined(String),

    #[error("API request failed: {0}")]
    Api(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}
