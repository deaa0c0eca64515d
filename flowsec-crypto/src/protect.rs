//! Passphrase protection for a principal's private key at rest.
//!
//! The private key never leaves the principal's device, but it still has to
//! be persisted there. It is stored as PKCS#8 DER encrypted with a key derived
//! from the user's passphrase (Argon2id -> AES-256-GCM).

use crate::cipher::{decrypt, encrypt, EncryptedPayload};
use crate::envelope::{private_key_from_pkcs8_der, private_key_to_pkcs8_der};
use crate::error::{CryptoError, CryptoResult};
use crate::key::{ObjectKey, KEY_SIZE};
use argon2::Argon2;
use rand::RngCore;
use rsa::RsaPrivateKey;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

/// Salt size for Argon2id.
pub const SALT_SIZE: usize = 16;

/// Private key encrypted with a passphrase.
///
/// Bundles the Argon2id salt with the encrypted data so the passphrase
/// is the only input needed for decryption.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProtectedPrivateKey {
    pub salt: [u8; SALT_SIZE],
    pub encrypted: EncryptedPayload,
}

fn derive_key(passphrase: &str, salt: &[u8; SALT_SIZE]) -> CryptoResult<ObjectKey> {
    let mut out = Zeroizing::new([0u8; KEY_SIZE]);
    Argon2::default()
        .hash_password_into(passphrase.as_bytes(), salt, &mut out[..])
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    Ok(ObjectKey::from_bytes(*out))
}

/// Encrypts a private key with a passphrase.
pub fn protect_private_key(
    key: &RsaPrivateKey,
    passphrase: &str,
) -> CryptoResult<ProtectedPrivateKey> {
    let mut salt = [0u8; SALT_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut salt);

    let derived = derive_key(passphrase, &salt)?;
    let der = private_key_to_pkcs8_der(key)?;
    let encrypted = encrypt(&der, &derived)?;

    Ok(ProtectedPrivateKey { salt, encrypted })
}

/// Decrypts a passphrase-protected private key.
pub fn open_protected_private_key(
    protected: &ProtectedPrivateKey,
    passphrase: &str,
) -> CryptoResult<RsaPrivateKey> {
    let derived = derive_key(passphrase, &protected.salt)?;
    let der = Zeroizing::new(decrypt(&protected.encrypted, &derived).map_err(|_| {
        CryptoError::Decryption("wrong passphrase or tampered key file".to_string())
    })?);
    private_key_from_pkcs8_der(&der)
}
