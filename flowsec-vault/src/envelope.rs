//! Envelope encryption against the key directory.
//!
//! Wraps flowsec-crypto primitives: looks up the recipient's public key,
//! encrypts under a fresh object key, and wraps that key for the recipient.

use crate::error::VaultResult;
use crate::key_directory::KeyDirectory;
use flowsec_crypto::{
    decrypt, encrypt, generate_object_key, public_key_from_spki_der, public_key_to_spki_der,
    unwrap_key, wrap_key, EncryptedPayload, RsaPrivateKey, RsaPublicKey,
};
use std::sync::Arc;
use tracing::debug;

/// Ciphertext and the object key wrapped for one recipient.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SealedObject {
    pub payload: EncryptedPayload,
    pub wrapped_key: Vec<u8>,
}

pub struct EnvelopeManager {
    directory: Arc<dyn KeyDirectory>,
}

impl EnvelopeManager {
    pub fn new(directory: Arc<dyn KeyDirectory>) -> Self {
        Self { directory }
    }

    /// Publishes a principal's public key to the directory.
    pub async fn publish_key(&self, principal_id: &str, public: &RsaPublicKey) -> VaultResult<()> {
        let der = public_key_to_spki_der(public)?;
        self.directory.publish_key(principal_id, der).await
    }

    /// Fetches and decodes a recipient's public key.
    pub async fn recipient_key(&self, principal_id: &str) -> VaultResult<RsaPublicKey> {
        let der = self.directory.get_key(principal_id).await?;
        Ok(public_key_from_spki_der(&der)?)
    }

    /// Encrypts `plaintext` for `recipient_id`.
    ///
    /// The key lookup happens first, so a missing recipient fails before any
    /// key material is generated.
    pub async fn seal_for(&self, recipient_id: &str, plaintext: &[u8]) -> VaultResult<SealedObject> {
        let public = self.recipient_key(recipient_id).await?;

        let key = generate_object_key();
        let payload = encrypt(plaintext, &key)?;
        let wrapped_key = wrap_key(&key, &public)?;

        debug!("sealed {} bytes for {recipient_id}", plaintext.len());
        Ok(SealedObject {
            payload,
            wrapped_key,
        })
    }

    /// Unwraps the object key with `private_key` and decrypts.
    pub fn open(&self, sealed: &SealedObject, private_key: &RsaPrivateKey) -> VaultResult<Vec<u8>> {
        let key = unwrap_key(&sealed.wrapped_key, private_key)?;
        Ok(decrypt(&sealed.payload, &key)?)
    }
}
