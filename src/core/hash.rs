//! Hashing for Commitments and State Verification
//!
//! Provides deterministic SHA-256 hashing for:
//! - Commit-reveal secrets
//! - Address derivation
//! - Ledger state fingerprints

use sha2::{Digest, Sha256};

/// A SHA-256 digest.
pub type Hash256 = [u8; 32];

/// Deterministic hasher for ledger state.
///
/// SHA-256 with a domain prefix and length-prefixed fields, so adjacent
/// variable-length fields can't be shifted into each other.
pub struct StateHasher {
    hasher: Sha256,
}

impl StateHasher {
    /// Start a hasher under `domain`.
    pub fn new(domain: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(domain);
        Self { hasher }
    }

    /// Create hasher for a store fingerprint.
    pub fn for_store_state() -> Self {
        Self::new(b"LINKEDUP_STATE_V1")
    }

    /// Feed a little-endian u64.
    #[inline]
    pub fn update_u64(&mut self, value: u64) {
        self.hasher.update(value.to_le_bytes());
    }

    /// Update with a length prefix followed by the bytes.
    #[inline]
    pub fn update_len_prefixed(&mut self, bytes: &[u8]) {
        self.update_u64(bytes.len() as u64);
        self.hasher.update(bytes);
    }

    /// Finish and return the digest.
    pub fn finalize(self) -> Hash256 {
        self.hasher.finalize().into()
    }
}

/// Compute a plain SHA-256 of arbitrary data.
pub fn hash_bytes(data: &[u8]) -> Hash256 {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// SHA-256 of `domain || data`.
pub fn hash_with_domain(domain: &[u8], data: &[u8]) -> Hash256 {
    let mut hasher = Sha256::new();
    hasher.update(domain);
    hasher.update(data);
    hasher.finalize().into()
}
