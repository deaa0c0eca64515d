//! Crypto error types.

use thiserror::Error;

/// Result type for crypto operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors that can occur during envelope encryption.
///
/// `KeyUnwrap` deliberately carries no detail: padding failures, wrong keys
/// and malformed key material all look the same to the caller.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("key generation failed: {0}")]
    KeyGeneration(String),

    #[error("encryption failed: {0}")]
    Encryption(String),

    #[error("integrity check failed: authentication tag mismatch")]
    Integrity,

    #[error("key unwrap failed")]
    KeyUnwrap,

    #[error("invalid key encoding: {0}")]
    KeyEncoding(String),

    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("decryption failed: {0}")]
    Decryption(String),
}
