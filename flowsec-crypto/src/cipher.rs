//! AES-256-GCM payload encryption.

use crate::error::{CryptoError, CryptoResult};
use crate::key::ObjectKey;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use rand::RngCore;
use serde::{Deserialize, Serialize};

/// Size of the AES-GCM initialization vector in bytes (96 bits).
pub const IV_SIZE: usize = 12;

/// Size of the GCM authentication tag appended to the ciphertext.
pub const TAG_SIZE: usize = 16;

/// Ciphertext plus the IV it was produced with.
///
/// The ciphertext carries the 16-byte tag at its end.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedPayload {
    pub iv: [u8; IV_SIZE],
    pub ciphertext: Vec<u8>,
}

/// Encrypts `plaintext` under `key` with a fresh random IV.
pub fn encrypt(plaintext: &[u8], key: &ObjectKey) -> CryptoResult<EncryptedPayload> {
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| CryptoError::Encryption(format!("cipher init failed: {e}")))?;

    let mut iv = [0u8; IV_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut iv);

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&iv), plaintext)
        .map_err(|e| CryptoError::Encryption(format!("AES-GCM seal failed: {e}")))?;

    Ok(EncryptedPayload { iv, ciphertext })
}

/// Decrypts a payload, verifying the authentication tag.
///
/// Returns `CryptoError::Integrity` if the tag does not verify; no plaintext
/// is ever returned in that case.
pub fn decrypt(payload: &EncryptedPayload, key: &ObjectKey) -> CryptoResult<Vec<u8>> {
    if payload.ciphertext.len() < TAG_SIZE {
        return Err(CryptoError::Integrity);
    }

    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| CryptoError::Encryption(format!("cipher init failed: {e}")))?;

    cipher
        .decrypt(Nonce::from_slice(&payload.iv), payload.ciphertext.as_ref())
        .map_err(|_| CryptoError::Integrity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::generate_object_key;

    #[test]
    fn ciphertext_includes_tag() {
        let key = generate_object_key();
        let payload = encrypt(b"abc", &key).unwrap();
        assert_eq!(payload.ciphertext.len(), 3 + TAG_SIZE);
    }

    #[test]
    fn short_ciphertext_is_integrity_error() {
        let key = generate_object_key();
        let payload = EncryptedPayload {
            iv: [0u8; IV_SIZE],
            ciphertext: vec![1, 2, 3],
        };
        assert!(matches!(decrypt(&payload, &key), Err(CryptoError::Integrity)));
    }
}
