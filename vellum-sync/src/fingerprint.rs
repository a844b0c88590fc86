//! Content fingerprinting — SHA-256 over raw file bytes.
//!
//! The digest is the unit of change detection: a state entry is "unchanged"
//! only when the recomputed digest matches the stored one exactly.

use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 digest of `bytes`. Stable across runs and platforms.
pub fn digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
