//! Content-addressable fingerprints used as scan cache keys.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 digest of a file payload or URL string.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fingerprints raw file bytes.
pub fn fingerprint_bytes(payload: &[u8]) -> Fingerprint {
    Fingerprint(hex::encode(Sha256::digest(payload)))
}

/// Fingerprints a URL exactly as given.
///
/// No normalization: `https://a.example/x` and `https://a.example/x/` are
/// different cache keys, as are URLs differing only in query string.
pub fn fingerprint_url(url: &str) -> Fingerprint {
    fingerprint_bytes(url.as_bytes())
}
