//! Commit-Reveal for Key Custody
//!
//! The custodian publishes `sha256(secret)` on the attendee record when it
//! keys an account. The attendee later proves possession by revealing the
//! secret in a claim. The comparison is a plain equality check on digests
//! and is not hardened against timing side channels.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::address::{decode_fixed, hex_array, HexError};
use super::hash::{hash_bytes, Hash256};

/// Commitment length in bytes.
pub const COMMITMENT_LEN: usize = 32;

/// SHA-256 digest of a custody secret.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Commitment(#[serde(with = "hex_array")] Hash256);

impl Commitment {
    /// Commit to a secret.
    pub fn new(secret: &[u8]) -> Self {
        Self(hash_bytes(secret))
    }

    /// Generate a fresh random secret and its commitment.
    ///
    /// The secret is the hex encoding of a v4 UUID (32 characters).
    pub fn create() -> (String, Commitment) {
        let secret = Uuid::new_v4().simple().to_string();
        let commitment = Self::new(secret.as_bytes());
        (secret, commitment)
    }

    /// Parse from hex.
    pub fn from_hex(s: &str) -> Result<Self, HexError> {
        decode_fixed(s).map(Self)
    }

    /// Get raw digest bytes.
    pub fn as_bytes(&self) -> &Hash256 {
        &self.0
    }

    /// Check whether `reveal` hashes to this commitment.
    pub fn verify_reveal(&self, reveal: &[u8]) -> bool {
        hash_bytes(reveal) == self.0
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Commitment({})", hex::encode(self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_create_and_reveal() {
        let (secret, commitment) = Commitment::create();

        assert_eq!(secret.len(), 32);
        assert!(commitment.verify_reveal(secret.as_bytes()));
        assert!(!commitment.verify_reveal(b"wrong"));
        assert!(!commitment.verify_reveal(b""));
    }

    #[test]
    fn test_fresh_secrets_differ() {
        let (s1, c1) = Commitment::create();
        let (s2, c2) = Commitment::create();

        assert_ne!(s1, s2);
        assert_ne!(c1, c2);
    }

    #[test]
    fn test_hex_roundtrip() {
        let commitment = Commitment::new(b"secret");
        let parsed = Commitment::from_hex(&commitment.to_string()).unwrap();
        assert_eq!(parsed, commitment);
    }

    proptest! {
        #[test]
        fn prop_reveal_matches_only_own_secret(
            secret in proptest::collection::vec(any::<u8>(), 0..64),
            other in proptest::collection::vec(any::<u8>(), 0..64),
        ) {
            let commitment = Commitment::new(&secret);
            prop_assert!(commitment.verify_reveal(&secret));
            prop_assert_eq!(commitment.verify_reveal(&other), secret == other);
        }
    }
}
