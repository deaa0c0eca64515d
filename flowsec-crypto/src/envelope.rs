//! Hybrid envelope encryption for object sharing.
//!
//! Each shared object is encrypted with its own AES-256 key; that key is then
//! wrapped with the recipient's RSA-2048 public key using OAEP with SHA-256.
//! Public keys travel as SPKI DER, private keys as PKCS#8 DER.

use crate::error::{CryptoError, CryptoResult};
use crate::key::ObjectKey;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use zeroize::Zeroizing;

/// Modulus size for principal key pairs.
pub const RSA_KEY_BITS: usize = 2048;

/// A principal's long-term key pair.
///
/// The private half zeroizes its limbs on drop (handled by `rsa`).
pub struct RecipientKeyPair {
    pub private: RsaPrivateKey,
    pub public: RsaPublicKey,
}

impl RecipientKeyPair {
    /// Returns the public key as SPKI DER, the form published to the key directory.
    pub fn public_spki_der(&self) -> CryptoResult<Vec<u8>> {
        public_key_to_spki_der(&self.public)
    }

    /// Reconstructs a key pair from a PKCS#8 DER private key.
    pub fn from_pkcs8_der(der: &[u8]) -> CryptoResult<Self> {
        let private = private_key_from_pkcs8_der(der)?;
        let public = RsaPublicKey::from(&private);
        Ok(Self { private, public })
    }
}

/// Generates a new RSA-2048 key pair.
pub fn generate_keypair() -> CryptoResult<RecipientKeyPair> {
    let private = RsaPrivateKey::new(&mut rand::rngs::OsRng, RSA_KEY_BITS)
        .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?;
    let public = RsaPublicKey::from(&private);
    Ok(RecipientKeyPair { private, public })
}

/// Wraps an object key for a recipient with RSA-OAEP/SHA-256.
pub fn wrap_key(key: &ObjectKey, recipient: &RsaPublicKey) -> CryptoResult<Vec<u8>> {
    recipient
        .encrypt(&mut rand::rngs::OsRng, Oaep::new::<Sha256>(), key.as_bytes())
        .map_err(|e| CryptoError::Encryption(format!("key wrap failed: {e}")))
}

/// Unwraps an object key with the recipient's private key.
///
/// Every failure mode maps to `CryptoError::KeyUnwrap` so callers cannot
/// distinguish a padding error from a wrong key.
pub fn unwrap_key(wrapped: &[u8], recipient: &RsaPrivateKey) -> CryptoResult<ObjectKey> {
    let raw = Zeroizing::new(
        recipient
            .decrypt(Oaep::new::<Sha256>(), wrapped)
            .map_err(|_| CryptoError::KeyUnwrap)?,
    );
    ObjectKey::from_slice(&raw).map_err(|_| CryptoError::KeyUnwrap)
}

/// Encodes a public key as SPKI DER.
pub fn public_key_to_spki_der(key: &RsaPublicKey) -> CryptoResult<Vec<u8>> {
    key.to_public_key_der()
        .map(|doc| doc.as_bytes().to_vec())
        .map_err(|e| CryptoError::KeyEncoding(format!("SPKI encode failed: {e}")))
}

/// Decodes an SPKI DER public key, rejecting moduli other than 2048 bits.
pub fn public_key_from_spki_der(der: &[u8]) -> CryptoResult<RsaPublicKey> {
    use rsa::traits::PublicKeyParts;

    let key = RsaPublicKey::from_public_key_der(der)
        .map_err(|e| CryptoError::KeyEncoding(format!("SPKI decode failed: {e}")))?;

    let bits = key.size() * 8;
    if bits != RSA_KEY_BITS {
        return Err(CryptoError::KeyEncoding(format!(
            "expected {RSA_KEY_BITS}-bit modulus, got {bits}"
        )));
    }
    Ok(key)
}

/// Encodes a private key as PKCS#8 DER. The buffer is zeroed on drop.
pub fn private_key_to_pkcs8_der(key: &RsaPrivateKey) -> CryptoResult<Zeroizing<Vec<u8>>> {
    key.to_pkcs8_der()
        .map(|doc| Zeroizing::new(doc.as_bytes().to_vec()))
        .map_err(|e| CryptoError::KeyEncoding(format!("PKCS#8 encode failed: {e}")))
}

/// Decodes a PKCS#8 DER private key.
pub fn private_key_from_pkcs8_der(der: &[u8]) -> CryptoResult<RsaPrivateKey> {
    RsaPrivateKey::from_pkcs8_der(der)
        .map_err(|e| CryptoError::KeyEncoding(format!("PKCS#8 decode failed: {e}")))
}
