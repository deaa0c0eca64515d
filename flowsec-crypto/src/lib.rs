//! Envelope encryption for FlowSec Vault.
//!
//! Provides per-object confidentiality using:
//! - AES-256-GCM for authenticated payload encryption
//! - RSA-OAEP (SHA-256) for wrapping object keys to a recipient
//! - Argon2id for protecting a principal's private key at rest
//!
//! # Architecture
//!
//! The encryption uses a two-tier key system:
//!
//! 1. **Object Key**: A random 256-bit key generated for exactly one shared
//!    object. It encrypts the payload and is never reused.
//!
//! 2. **Recipient Key Pair**: A long-term RSA-2048 key pair per principal.
//!    The object key is wrapped under the recipient's public key and stored
//!    next to the ciphertext; only the recipient's private key can unwrap it.
//!
//! No pre-shared secret is needed between sender and recipient. There is no
//! forward secrecy: whoever holds a recipient's private key can open every
//! object ever shared with that recipient.

mod cipher;
pub mod envelope;
mod error;
mod key;
pub mod protect;

pub use cipher::{decrypt, encrypt, EncryptedPayload, IV_SIZE, TAG_SIZE};
pub use envelope::{
    generate_keypair, private_key_from_pkcs8_der, private_key_to_pkcs8_der,
    public_key_from_spki_der, public_key_to_spki_der, unwrap_key, wrap_key, RecipientKeyPair,
    RSA_KEY_BITS,
};
pub use error::{CryptoError, CryptoResult};
pub use key::{generate_object_key, ObjectKey, KEY_SIZE};
pub use protect::{open_protected_private_key, protect_private_key, ProtectedPrivateKey};
pub use rsa::{RsaPrivateKey, RsaPublicKey};
