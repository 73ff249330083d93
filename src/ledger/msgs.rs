//! Ledger Operations
//!
//! Every state change enters the ledger as one of the [`Operation`]
//! variants. Each carries its own signer and a stateless sanity check
//! that runs before any handler sees it.

use serde::{Deserialize, Serialize};

use crate::core::address::hex_vec;
use crate::core::{Address, Commitment, PublicKey};

use super::errors::LedgerError;

/// Custodial keying of an attendee account, submitted by the master service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgKey {
    /// Attendee being keyed.
    pub attendee_address: Address,
    /// Submitting master service.
    pub master_address: Address,
    /// Key the attendee will sign with from now on.
    pub new_attendee_public_key: PublicKey,
    /// Commitment to the secret handed to the attendee.
    pub commitment: Commitment,
}

/// Claim of a keyed account by revealing the secret.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgClaimKey {
    /// Attendee claiming their account.
    pub attendee_address: Address,
    /// Display name.
    pub name: String,
    /// Revealed secret.
    pub secret: String,
    /// RSA public key for encrypted sharing.
    pub rsa_public_key: String,
    /// Attendee's encrypted profile.
    #[serde(with = "hex_vec")]
    pub encrypted_info: Vec<u8>,
}

/// One attendee scanning another's badge.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgScanQr {
    /// Scanning attendee.
    pub sender: Address,
    /// Ticket id read from the scanned badge.
    pub scanned_qr: String,
    /// Data shared with the scanned attendee. May be empty.
    #[serde(with = "hex_vec")]
    pub data: Vec<u8>,
}

/// Booth collection of an attendee's prizes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgRedeem {
    /// Redemption service.
    pub sender: Address,
    /// Ticket id read from the attendee's badge.
    pub scanned_qr: String,
}

/// All ledger operations.
///
/// Uses serde's default external tagging so the same type encodes under
/// both bincode (sign bytes) and JSON (wire).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// See [`MsgKey`].
    Key(MsgKey),
    /// See [`MsgClaimKey`].
    ClaimKey(MsgClaimKey),
    /// See [`MsgScanQr`].
    ScanQr(MsgScanQr),
    /// See [`MsgRedeem`].
    Redeem(MsgRedeem),
}

impl Operation {
    /// Operation type name.
    pub fn type_name(&self) -> &'static str {
        match self {
            Operation::Key(_) => "key",
            Operation::ClaimKey(_) => "claim_key",
            Operation::ScanQr(_) => "scan_qr",
            Operation::Redeem(_) => "redeem",
        }
    }

    /// Address that must sign the operation.
    pub fn signer(&self) -> Address {
        match self {
            Operation::Key(msg) => msg.master_address,
            Operation::ClaimKey(msg) => msg.attendee_address,
            Operation::ScanQr(msg) => msg.sender,
            Operation::Redeem(msg) => msg.sender,
        }
    }

    /// Stateless checks.
    pub fn validate_basic(&self) -> Result<(), LedgerError> {
        match self {
            Operation::Key(msg) => {
                if msg.attendee_address.is_empty() || msg.master_address.is_empty() {
                    return Err(LedgerError::AddressEmpty);
                }
                msg.new_attendee_public_key
                    .verifying_key()
                    .map_err(|_| LedgerError::InvalidPublicKey)?;
                Ok(())
            }
            Operation::ClaimKey(msg) => {
                if msg.attendee_address.is_empty() {
                    Err(LedgerError::AddressEmpty)
                } else if msg.name.is_empty() {
                    Err(LedgerError::EmptyName)
                } else if msg.secret.is_empty() {
                    Err(LedgerError::EmptySecret)
                } else if msg.rsa_public_key.is_empty() {
                    Err(LedgerError::EmptyRsaKey)
                } else if msg.encrypted_info.is_empty() {
                    Err(LedgerError::EmptyEncryptedInfo)
                } else {
                    Ok(())
                }
            }
            Operation::ScanQr(MsgScanQr {
                sender, scanned_qr, ..
            })
            | Operation::Redeem(MsgRedeem { sender, scanned_qr }) => {
                if sender.is_empty() {
                    return Err(LedgerError::AddressEmpty);
                }
                validate_qr(scanned_qr)
            }
        }
    }
}

/// A badge QR code must be the decimal string of a positive integer.
pub fn validate_qr(qr: &str) -> Result<(), LedgerError> {
    let canonical = !qr.is_empty()
        && qr.bytes().all(|b| b.is_ascii_digit())
        && !qr.starts_with('0');
    if canonical {
        Ok(())
    } else {
        Err(LedgerError::QrCodeInvalid)
    }
}
