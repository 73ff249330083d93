//! Store Key Schema
//!
//! Every record lives under a one-byte class prefix. Collection keys are
//! `prefix || "::" || raw`, singleton keys are the bare prefix byte.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::address::{hex_vec, trim_hex, Address, HexError};

/// Attendee records.
pub const ATTENDEE_PREFIX: u8 = 0x00;
/// Scan records.
pub const SCAN_PREFIX: u8 = 0x01;
/// Prize records.
pub const PRIZE_PREFIX: u8 = 0x02;
/// Master (custodial) service address singleton.
pub const MASTER_PREFIX: u8 = 0x03;
/// Redemption service address singleton.
pub const REDEEM_PREFIX: u8 = 0x04;
/// Account records.
pub const ACCOUNT_PREFIX: u8 = 0x05;
/// Next account number singleton.
pub const ACCOUNT_NUMBER_PREFIX: u8 = 0x06;

/// Separator between prefix and raw key.
pub const KEY_SEPARATOR: &[u8] = b"::";

/// Errors when pairing two addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PairError {
    /// One side is the zero address.
    #[error("address is empty")]
    AddressEmpty,
    /// Both sides are the same account.
    #[error("accounts are the same")]
    AccountsSame,
}

/// Iteration prefix for a record class.
pub fn prefix(class: u8) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + KEY_SEPARATOR.len());
    key.push(class);
    key.extend_from_slice(KEY_SEPARATOR);
    key
}

/// Full store key for a record class and raw key.
pub fn derive_key(class: u8, raw: &[u8]) -> Vec<u8> {
    let mut key = prefix(class);
    key.extend_from_slice(raw);
    key
}

/// Store key of an attendee.
pub fn attendee_key(address: &Address) -> Vec<u8> {
    derive_key(ATTENDEE_PREFIX, address.as_bytes())
}

/// Store key of an account.
pub fn account_key(address: &Address) -> Vec<u8> {
    derive_key(ACCOUNT_PREFIX, address.as_bytes())
}

/// Store key of a prize tier.
pub fn prize_key(tier: u8) -> Vec<u8> {
    derive_key(PRIZE_PREFIX, &[tier])
}

/// Singleton key of the master service address.
pub fn master_key() -> Vec<u8> {
    vec![MASTER_PREFIX]
}

/// Singleton key of the redemption service address.
pub fn redeem_key() -> Vec<u8> {
    vec![REDEEM_PREFIX]
}

/// Singleton key of the account number counter.
pub fn account_number_key() -> Vec<u8> {
    vec![ACCOUNT_NUMBER_PREFIX]
}

/// Whether `key` belongs to a record class.
pub fn is_key_of(key: &[u8], class: u8) -> bool {
    key.starts_with(&prefix(class))
}

/// Canonical identifier of the scan between two attendees.
///
/// The greater address (by byte order) comes first so both orderings of a
/// pair map to the same id. The bytes double as the scan's store key.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScanId(#[serde(with = "hex_vec")] Vec<u8>);

impl ScanId {
    /// Compute the id for an unordered pair of distinct, non-empty addresses.
    pub fn for_pair(a: &Address, b: &Address) -> Result<Self, PairError> {
        if a.is_empty() || b.is_empty() {
            return Err(PairError::AddressEmpty);
        }
        if a == b {
            return Err(PairError::AccountsSame);
        }

        let (first, second) = if a > b { (a, b) } else { (b, a) };
        let mut raw = Vec::with_capacity(2 * first.as_bytes().len());
        raw.extend_from_slice(first.as_bytes());
        raw.extend_from_slice(second.as_bytes());
        Ok(Self(derive_key(SCAN_PREFIX, &raw)))
    }

    /// Parse from hex.
    pub fn from_hex(s: &str) -> Result<Self, HexError> {
        let bytes = hex::decode(trim_hex(s))?;
        Ok(Self(bytes))
    }

    /// Store key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for ScanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.0))
    }
}

impl fmt::Debug for ScanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ScanId({})", hex::encode(&self.0))
    }
}
