//! Per-object symmetric keys.

use crate::error::{CryptoError, CryptoResult};
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of an object key in bytes (AES-256).
pub const KEY_SIZE: usize = 32;

/// A 256-bit key that encrypts exactly one object.
///
/// Not `Clone`: each key has a single owner and is zeroed when dropped.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct ObjectKey {
    bytes: [u8; KEY_SIZE],
}

impl ObjectKey {
    /// Builds a key from raw bytes.
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    /// Builds a key from a slice, checking its length.
    pub fn from_slice(bytes: &[u8]) -> CryptoResult<Self> {
        if bytes.len() != KEY_SIZE {
            return Err(CryptoError::InvalidKeyLength {
                expected: KEY_SIZE,
                actual: bytes.len(),
            });
        }
        let mut key = [0u8; KEY_SIZE];
        key.copy_from_slice(bytes);
        Ok(Self { bytes: key })
    }

    /// Returns the raw key material.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl std::fmt::Debug for ObjectKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ObjectKey(<redacted>)")
    }
}

/// Generates a fresh object key from the OS CSPRNG.
pub fn generate_object_key() -> ObjectKey {
    let mut bytes = [0u8; KEY_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    let key = ObjectKey::from_bytes(bytes);
    bytes.zeroize();
    key
}
