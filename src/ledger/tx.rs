//! Signed Transactions
//!
//! A transaction wraps one [`Operation`] with the signer's account number
//! and sequence. The signature covers a domain tag, the chain id, both
//! counters and the bincode encoding of the operation, so a signature is
//! bound to one chain, one account and one position in its sequence.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier};
use serde::{Deserialize, Serialize};

use crate::core::address::hex_vec;
use crate::core::PublicKey;

use super::errors::{LedgerError, CODE_OK};
use super::msgs::Operation;

/// Domain separator for transaction sign bytes.
const SIGN_DOC_DOMAIN: &[u8] = b"LINKEDUP_TX_V1";

#[derive(Serialize)]
struct SignDoc<'a> {
    chain_id: &'a str,
    account_number: u64,
    sequence: u64,
    op: &'a Operation,
}

/// Bytes a signer signs for `op` at the given position.
pub fn sign_bytes(
    chain_id: &str,
    account_number: u64,
    sequence: u64,
    op: &Operation,
) -> Result<Vec<u8>, LedgerError> {
    let doc = SignDoc {
        chain_id,
        account_number,
        sequence,
        op,
    };
    let mut bytes = SIGN_DOC_DOMAIN.to_vec();
    bytes.extend(bincode::serialize(&doc)?);
    Ok(bytes)
}

/// An operation signed by its signer's account key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTx {
    /// The operation.
    pub op: Operation,
    /// Signer's account number.
    pub account_number: u64,
    /// Signer's sequence at signing time.
    pub sequence: u64,
    /// Key that produced the signature.
    pub pub_key: PublicKey,
    /// Ed25519 signature over [`sign_bytes`].
    #[serde(with = "hex_vec")]
    pub signature: Vec<u8>,
}

impl SignedTx {
    /// Sign `op` for the given chain position.
    pub fn sign(
        op: Operation,
        chain_id: &str,
        account_number: u64,
        sequence: u64,
        key: &SigningKey,
    ) -> Result<Self, LedgerError> {
        let bytes = sign_bytes(chain_id, account_number, sequence, &op)?;
        let signature = key.sign(&bytes);
        Ok(Self {
            op,
            account_number,
            sequence,
            pub_key: PublicKey::from(&key.verifying_key()),
            signature: signature.to_bytes().to_vec(),
        })
    }

    /// Check the signature against the embedded key.
    pub fn verify_signature(&self, chain_id: &str) -> Result<(), LedgerError> {
        let key = self
            .pub_key
            .verifying_key()
            .map_err(|_| LedgerError::InvalidPublicKey)?;
        let signature = Signature::from_slice(&self.signature)
            .map_err(|_| LedgerError::Unauthorized("malformed signature".into()))?;
        let bytes = sign_bytes(chain_id, self.account_number, self.sequence, &self.op)?;
        key.verify(&bytes, &signature)
            .map_err(|_| LedgerError::Unauthorized("signature verification failed".into()))
    }

    /// Encode for transport.
    pub fn to_bytes(&self) -> Result<Vec<u8>, LedgerError> {
        Ok(bincode::serialize(self)?)
    }

    /// Decode from transport.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, LedgerError> {
        Ok(bincode::deserialize(bytes)?)
    }
}

/// Outcome of a committed transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxResponse {
    /// Result code, 0 on success.
    pub code: u32,
    /// Raw log: empty on success, the error text otherwise.
    pub log: String,
    /// Height the transaction was committed at.
    pub height: u64,
    /// Whether the transaction passed admission and consumed its sequence.
    pub executed: bool,
}

impl TxResponse {
    /// Successful response.
    pub fn ok(height: u64) -> Self {
        Self {
            code: CODE_OK,
            log: String::new(),
            height,
            executed: true,
        }
    }

    /// Handler failure after admission. The sequence was consumed.
    pub fn from_error(err: &LedgerError, height: u64) -> Self {
        Self {
            code: err.code(),
            log: err.to_string(),
            height,
            executed: true,
        }
    }

    /// Rejection at admission. The signer's sequence is untouched.
    pub fn not_admitted(err: &LedgerError, height: u64) -> Self {
        Self {
            executed: false,
            ..Self::from_error(err, height)
        }
    }

    /// Whether the transaction succeeded.
    pub fn is_ok(&self) -> bool {
        self.code == CODE_OK
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::address::ADDRESS_LEN;
    use crate::core::Address;
    use crate::ledger::msgs::MsgScanQr;

    fn op() -> Operation {
        Operation::ScanQr(MsgScanQr {
            sender: Address::new([1; ADDRESS_LEN]),
            scanned_qr: "5".into(),
            data: b"hi".to_vec(),
        })
    }

    #[test]
    fn test_sign_and_verify() {
        let key = SigningKey::from_bytes(&[9; 32]);
        let tx = SignedTx::sign(op(), "chain-a", 3, 7, &key).unwrap();

        assert!(tx.verify_signature("chain-a").is_ok());
        assert!(matches!(
            tx.verify_signature("chain-b"),
            Err(LedgerError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_tampering_breaks_signature() {
        let key = SigningKey::from_bytes(&[9; 32]);
        let tx = SignedTx::sign(op(), "chain-a", 3, 7, &key).unwrap();

        let mut bumped = tx.clone();
        bumped.sequence = 8;
        assert!(bumped.verify_signature("chain-a").is_err());

        let mut truncated = tx.clone();
        truncated.signature.pop();
        assert!(truncated.verify_signature("chain-a").is_err());
    }

    #[test]
    fn test_transport_encoding() {
        let key = SigningKey::from_bytes(&[9; 32]);
        let tx = SignedTx::sign(op(), "chain-a", 0, 0, &key).unwrap();
        let decoded = SignedTx::from_bytes(&tx.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded, tx);
        assert!(SignedTx::from_bytes(&[1, 2, 3]).is_err());
    }

    #[test]
    fn test_response_from_error() {
        let resp = TxResponse::from_error(&LedgerError::AttendeeKeyed, 4);
        assert_eq!(resp.code, 102);
        assert!(!resp.is_ok());
        assert!(resp.executed);
        assert!(TxResponse::ok(4).is_ok());

        let rejected = TxResponse::not_admitted(&LedgerError::UnknownAccount, 4);
        assert_eq!(rejected.code, 116);
        assert!(!rejected.executed);
    }
}
