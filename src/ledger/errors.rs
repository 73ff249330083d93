//! Ledger errors and their stable result codes.

use thiserror::Error;

use crate::core::PairError;

/// Result code of a successful operation.
pub const CODE_OK: u32 = 0;

/// Errors surfaced by ledger operations.
///
/// Every variant maps to a stable numeric code that travels back to
/// submitters in [`TxResponse`](super::tx::TxResponse).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// A stored record or operation failed to encode or decode.
    #[error("codec error: {0}")]
    Codec(String),
    /// No attendee (or no account) for the address.
    #[error("attendee not found")]
    AttendeeNotFound,
    /// Attendee already has a public key.
    #[error("attendee already key'ed")]
    AttendeeKeyed,
    /// Attendee already claimed their account.
    #[error("attendee already claimed")]
    AttendeeClaimed,
    /// Revealed secret does not match the stored commitment.
    #[error("invalid commitment reveal")]
    InvalidCommitmentReveal,
    /// Sender and scanned attendee are the same account.
    #[error("accounts are the same")]
    AccountsSame,
    /// A required address is empty.
    #[error("address is empty")]
    AddressEmpty,
    /// Scanned identifier is not a positive integer.
    #[error("invalid qr code")]
    QrCodeInvalid,
    /// Claim is missing a display name.
    #[error("name is empty")]
    EmptyName,
    /// Claim is missing the secret.
    #[error("secret is empty")]
    EmptySecret,
    /// Claim is missing the RSA public key.
    #[error("rsa public key is empty")]
    EmptyRsaKey,
    /// Claim is missing the encrypted info.
    #[error("encrypted info is empty")]
    EmptyEncryptedInfo,
    /// No scan record under the id.
    #[error("scan not found")]
    ScanNotFound,
    /// Sender is not allowed to submit this operation.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// Operation type not handled by the module it was routed to.
    #[error("unrecognized message type: {0}")]
    UnrecognizedMessageType(String),
    /// Transaction sequence or account number mismatch.
    #[error("invalid sequence: expected {expected}, got {got}")]
    InvalidSequence {
        /// Sequence the account expects next.
        expected: u64,
        /// Sequence carried by the transaction.
        got: u64,
    },
    /// Signer has no ledger account.
    #[error("unknown account")]
    UnknownAccount,
    /// Attendee has nothing left to redeem.
    #[error("no unclaimed winnings")]
    NoUnclaimedWinnings,
    /// No prize configured for the tier.
    #[error("prize not found")]
    PrizeNotFound,
    /// Bytes are not a valid ed25519 public key.
    #[error("invalid public key")]
    InvalidPublicKey,
}

impl LedgerError {
    /// Stable numeric result code.
    pub fn code(&self) -> u32 {
        match self {
            LedgerError::Codec(_) => 1,
            LedgerError::AttendeeNotFound => 101,
            LedgerError::AttendeeKeyed => 102,
            LedgerError::AttendeeClaimed => 103,
            LedgerError::InvalidCommitmentReveal => 104,
            LedgerError::AccountsSame => 105,
            LedgerError::AddressEmpty => 106,
            LedgerError::QrCodeInvalid => 107,
            LedgerError::EmptyName => 108,
            LedgerError::EmptySecret => 109,
            LedgerError::EmptyRsaKey => 110,
            LedgerError::EmptyEncryptedInfo => 111,
            LedgerError::ScanNotFound => 112,
            LedgerError::Unauthorized(_) => 113,
            LedgerError::UnrecognizedMessageType(_) => 114,
            LedgerError::InvalidSequence { .. } => 115,
            LedgerError::UnknownAccount => 116,
            LedgerError::NoUnclaimedWinnings => 117,
            LedgerError::PrizeNotFound => 118,
            LedgerError::InvalidPublicKey => 119,
        }
    }
}

impl From<PairError> for LedgerError {
    fn from(err: PairError) -> Self {
        match err {
            PairError::AddressEmpty => LedgerError::AddressEmpty,
            PairError::AccountsSame => LedgerError::AccountsSame,
        }
    }
}

impl From<bincode::Error> for LedgerError {
    fn from(err: bincode::Error) -> Self {
        LedgerError::Codec(err.to_string())
    }
}

/// Code returned when an attendee is already keyed.
pub const CODE_ATTENDEE_KEYED: u32 = 102;

/// Code returned on a sequence mismatch.
pub const CODE_INVALID_SEQUENCE: u32 = 115;
