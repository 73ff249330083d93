//! Account Addresses and Public Keys
//!
//! Fixed-length identifiers used throughout the ledger. Both types
//! serialize as lowercase hex so JSON payloads stay readable.

use std::fmt;

use ed25519_dalek::VerifyingKey;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::hash::hash_with_domain;

/// Address length in bytes.
pub const ADDRESS_LEN: usize = 20;

/// Ed25519 public key length in bytes.
pub const PUBLIC_KEY_LEN: usize = 32;

/// Domain separator for deriving attendee addresses from ticket ids.
const ATTENDEE_ADDRESS_DOMAIN: &[u8] = b"LINKEDUP_ATTENDEE_V1";

/// Domain separator for deriving addresses from public keys.
const KEY_ADDRESS_DOMAIN: &[u8] = b"LINKEDUP_PUBKEY_V1";

/// Errors decoding hex-encoded identifiers.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HexError {
    /// Input is not valid hex.
    #[error("invalid hex: {0}")]
    Invalid(#[from] hex::FromHexError),
    /// Decoded length doesn't match the expected length.
    #[error("expected {expected} bytes, got {got}")]
    Length {
        /// Expected byte length.
        expected: usize,
        /// Actual byte length.
        got: usize,
    },
    /// Bytes are not a valid ed25519 point.
    #[error("invalid ed25519 public key")]
    InvalidKey,
}

/// Strip an optional `0x` prefix and left-pad to an even number of digits.
pub fn trim_hex(s: &str) -> String {
    let s = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    if s.len() % 2 != 0 {
        format!("0{}", s)
    } else {
        s.to_string()
    }
}

/// Decode a hex string into a fixed-size array.
pub fn decode_fixed<const N: usize>(s: &str) -> Result<[u8; N], HexError> {
    let bytes = hex::decode(trim_hex(s))?;
    let got = bytes.len();
    bytes
        .try_into()
        .map_err(|_| HexError::Length { expected: N, got })
}

/// A ledger account address.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(#[serde(with = "hex_array")] pub [u8; ADDRESS_LEN]);

impl Address {
    /// The all-zero address, treated as empty.
    pub const ZERO: Address = Address([0; ADDRESS_LEN]);

    /// Create from raw bytes.
    pub const fn new(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    /// Derive the address of an attendee from their external ticket id.
    pub fn from_external_id(id: &str) -> Self {
        let hash = hash_with_domain(ATTENDEE_ADDRESS_DOMAIN, id.as_bytes());
        let mut bytes = [0u8; ADDRESS_LEN];
        bytes.copy_from_slice(&hash[..ADDRESS_LEN]);
        Self(bytes)
    }

    /// Derive the address controlled by a public key.
    pub fn from_public_key(key: &PublicKey) -> Self {
        let hash = hash_with_domain(KEY_ADDRESS_DOMAIN, key.as_bytes());
        let mut bytes = [0u8; ADDRESS_LEN];
        bytes.copy_from_slice(&hash[..ADDRESS_LEN]);
        Self(bytes)
    }

    /// Parse from a hex string (optional `0x` prefix).
    pub fn from_hex(s: &str) -> Result<Self, HexError> {
        decode_fixed(s).map(Self)
    }

    /// Whether this is the zero address.
    pub fn is_empty(&self) -> bool {
        self.0 == [0; ADDRESS_LEN]
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    /// Lowercase hex encoding.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

/// An ed25519 verification key in raw form.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PublicKey(#[serde(with = "hex_array")] pub [u8; PUBLIC_KEY_LEN]);

impl PublicKey {
    /// Create from raw bytes.
    pub const fn new(bytes: [u8; PUBLIC_KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Parse from a hex string and check it is a valid curve point.
    pub fn from_hex(s: &str) -> Result<Self, HexError> {
        let key = Self(decode_fixed(s)?);
        key.verifying_key()?;
        Ok(key)
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_LEN] {
        &self.0
    }

    /// Convert to a dalek verifying key.
    pub fn verifying_key(&self) -> Result<VerifyingKey, HexError> {
        VerifyingKey::from_bytes(&self.0).map_err(|_| HexError::InvalidKey)
    }

    /// Address controlled by this key.
    pub fn address(&self) -> Address {
        Address::from_public_key(self)
    }
}

impl From<&VerifyingKey> for PublicKey {
    fn from(key: &VerifyingKey) -> Self {
        Self(key.to_bytes())
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", hex::encode(self.0))
    }
}

/// Serde helpers for encoding `[u8; N]` as a lowercase hex string.
pub(crate) mod hex_array {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S, const N: usize>(bytes: &[u8; N], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D, const N: usize>(deserializer: D) -> Result<[u8; N], D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        super::decode_fixed::<N>(&s).map_err(serde::de::Error::custom)
    }
}

/// Serde helpers for encoding variable-length bytes as a lowercase hex string.
pub(crate) mod hex_vec {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        hex::decode(super::trim_hex(&s)).map_err(serde::de::Error::custom)
    }
}
