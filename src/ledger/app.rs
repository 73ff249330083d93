//! Local Ledger Application
//!
//! Executes signed transactions the way the external ledger does, one
//! block per transaction:
//!
//! 1. `validate_basic` on the operation
//! 2. Signer account lookup
//! 3. Key and signature check
//! 4. Account number and sequence check
//! 5. Sequence increment, persisted whatever the handler outcome
//! 6. Handler inside a transactional overlay
//!
//! Steps 1-4 reject without touching state. A transaction that gets past
//! them consumes its sequence number even if the handler fails.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::core::{Address, Hash256, MemStore, StateStore};

use super::errors::LedgerError;
use super::genesis::{init_genesis, GenesisState};
use super::handler::{self, Context};
use super::keeper;
use super::query::{self, Query, QueryResponse};
use super::tx::{SignedTx, TxResponse};
use super::types::Account;

/// In-process ledger over a [`MemStore`].
pub struct LedgerApp {
    chain_id: String,
    height: u64,
    store: MemStore,
}

impl LedgerApp {
    /// Create a ledger seeded from genesis.
    pub fn new(chain_id: impl Into<String>, genesis: &GenesisState) -> Result<Self, LedgerError> {
        let mut store = MemStore::new();
        init_genesis(&mut store, genesis)?;

        let chain_id = chain_id.into();
        info!(chain_id = %chain_id, "ledger started");
        Ok(Self {
            chain_id,
            height: 0,
            store,
        })
    }

    /// Chain identifier.
    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    /// Height of the last committed block.
    pub fn height(&self) -> u64 {
        self.height
    }

    /// Read access to the underlying store.
    pub fn store(&self) -> &MemStore {
        &self.store
    }

    /// Fingerprint of the current state.
    pub fn state_hash(&self) -> Hash256 {
        self.store.state_hash()
    }

    /// Look up an account.
    pub fn account(&self, address: &Address) -> Result<Option<Account>, LedgerError> {
        keeper::get_account(&self.store, address)
    }

    /// Answer a read-only query.
    pub fn query(&self, q: &Query) -> Result<QueryResponse, LedgerError> {
        query::query(&self.store, q)
    }

    /// Commit one transaction in its own block.
    pub fn deliver_tx(&mut self, tx: &SignedTx, block_time: DateTime<Utc>) -> TxResponse {
        self.height += 1;
        let height = self.height;

        let mut account = match self.admit(tx) {
            Ok(account) => account,
            Err(e) => {
                debug!(op = tx.op.type_name(), error = %e, "transaction not admitted");
                return TxResponse::not_admitted(&e, height);
            }
        };

        account.sequence += 1;
        if let Err(e) = keeper::set_account(&mut self.store, &account) {
            return TxResponse::not_admitted(&e, height);
        }

        let ctx = Context::new(self.chain_id.clone(), height, block_time);
        match handler::handle(&ctx, &mut self.store, &tx.op) {
            Ok(()) => TxResponse::ok(height),
            Err(e) => TxResponse::from_error(&e, height),
        }
    }

    fn admit(&self, tx: &SignedTx) -> Result<Account, LedgerError> {
        tx.op.validate_basic()?;

        let signer = tx.op.signer();
        let account = keeper::get_account(&self.store, &signer)?.ok_or(LedgerError::UnknownAccount)?;

        if account.pub_key != Some(tx.pub_key) {
            return Err(LedgerError::Unauthorized(format!(
                "key is not authorized for {}",
                signer
            )));
        }
        tx.verify_signature(&self.chain_id)?;

        if tx.account_number != account.account_number {
            return Err(LedgerError::Unauthorized(format!(
                "account number mismatch: expected {}, got {}",
                account.account_number, tx.account_number
            )));
        }
        if tx.sequence != account.sequence {
            return Err(LedgerError::InvalidSequence {
                expected: account.sequence,
                got: tx.sequence,
            });
        }

        Ok(account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Commitment, PublicKey};
    use crate::ledger::msgs::{MsgClaimKey, MsgKey, MsgScanQr, Operation};
    use crate::CLAIM_POINTS;
    use ed25519_dalek::SigningKey;

    struct Fixture {
        app: LedgerApp,
        master: SigningKey,
    }

    fn fixture() -> Fixture {
        let master = SigningKey::from_bytes(&[1; 32]);
        let redeem = SigningKey::from_bytes(&[2; 32]);
        let genesis = GenesisState::new(
            PublicKey::from(&master.verifying_key()),
            PublicKey::from(&redeem.verifying_key()),
        )
        .with_attendee("1", "GA")
        .with_attendee("2", "GA");

        Fixture {
            app: LedgerApp::new("test-chain", &genesis).unwrap(),
            master,
        }
    }

    impl Fixture {
        fn master_address(&self) -> Address {
            PublicKey::from(&self.master.verifying_key()).address()
        }

        fn submit(&mut self, op: Operation, key: &SigningKey) -> TxResponse {
            let signer = op.signer();
            let account = self.app.account(&signer).unwrap().unwrap();
            let tx = SignedTx::sign(op, "test-chain", account.account_number, account.sequence, key)
                .unwrap();
            self.app.deliver_tx(&tx, Utc::now())
        }

        fn key(&mut self, id: &str, attendee_key: &SigningKey, commitment: Commitment) -> TxResponse {
            let op = Operation::Key(MsgKey {
                attendee_address: Address::from_external_id(id),
                master_address: self.master_address(),
                new_attendee_public_key: PublicKey::from(&attendee_key.verifying_key()),
                commitment,
            });
            let master = self.master.clone();
            self.submit(op, &master)
        }
    }

    #[test]
    fn test_full_custody_flow() {
        let mut f = fixture();
        let alice_key = SigningKey::from_bytes(&[10; 32]);
        let (secret, commitment) = Commitment::create();

        assert!(f.key("1", &alice_key, commitment).is_ok());

        let claim = Operation::ClaimKey(MsgClaimKey {
            attendee_address: Address::from_external_id("1"),
            name: "Alice".into(),
            secret,
            rsa_public_key: "rsa".into(),
            encrypted_info: b"info".to_vec(),
        });
        let resp = f.submit(claim, &alice_key);
        assert!(resp.is_ok(), "claim failed: {}", resp.log);

        let attendee = match f.app.query(&Query::AttendeeById { id: "1".into() }).unwrap() {
            QueryResponse::Attendee(a) => a,
            other => panic!("unexpected response: {:?}", other),
        };
        assert!(attendee.claimed);
        assert_eq!(attendee.rep, CLAIM_POINTS);
    }

    #[test]
    fn test_second_key_is_committed_rejection() {
        let mut f = fixture();
        let key = SigningKey::from_bytes(&[10; 32]);
        let master = f.master_address();

        assert!(f.key("1", &key, Commitment::new(b"a")).is_ok());
        let seq_before = f.app.account(&master).unwrap().unwrap().sequence;

        let resp = f.key("1", &key, Commitment::new(b"b"));
        assert_eq!(resp.code, LedgerError::AttendeeKeyed.code());
        assert!(resp.executed);

        // rejected by the handler, sequence still consumed
        let seq_after = f.app.account(&master).unwrap().unwrap().sequence;
        assert_eq!(seq_after, seq_before + 1);
    }

    #[test]
    fn test_admission_failures_leave_state_unchanged() {
        let mut f = fixture();
        let before = f.app.state_hash();
        let master = f.master.clone();
        let account = f.app.account(&f.master_address()).unwrap().unwrap();

        let op = Operation::Key(MsgKey {
            attendee_address: Address::from_external_id("1"),
            master_address: f.master_address(),
            new_attendee_public_key: PublicKey::from(&SigningKey::from_bytes(&[3; 32]).verifying_key()),
            commitment: Commitment::new(b"x"),
        });

        // stale sequence
        let tx = SignedTx::sign(op.clone(), "test-chain", account.account_number, 5, &master).unwrap();
        let resp = f.app.deliver_tx(&tx, Utc::now());
        assert_eq!(resp.code, 115);
        assert!(!resp.executed);

        // wrong chain
        let tx = SignedTx::sign(op.clone(), "other-chain", account.account_number, 0, &master).unwrap();
        assert_eq!(f.app.deliver_tx(&tx, Utc::now()).code, 113);

        // wrong key for the signer
        let imposter = SigningKey::from_bytes(&[4; 32]);
        let tx = SignedTx::sign(op, "test-chain", account.account_number, 0, &imposter).unwrap();
        assert_eq!(f.app.deliver_tx(&tx, Utc::now()).code, 113);

        assert_eq!(f.app.state_hash(), before);
    }

    #[test]
    fn test_unclaimed_attendee_cannot_sign() {
        let mut f = fixture();
        let key = SigningKey::from_bytes(&[10; 32]);

        // attendee accounts start without a key
        let scan = Operation::ScanQr(MsgScanQr {
            sender: Address::from_external_id("1"),
            scanned_qr: "2".into(),
            data: Vec::new(),
        });
        assert_eq!(f.submit(scan, &key).code, 113);
    }

    #[test]
    fn test_empty_secret_rejected_at_admission() {
        let mut f = fixture();
        let key = SigningKey::from_bytes(&[10; 32]);
        f.key("1", &key, Commitment::new(b"s"));

        let claim = Operation::ClaimKey(MsgClaimKey {
            attendee_address: Address::from_external_id("1"),
            name: "Alice".into(),
            secret: String::new(),
            rsa_public_key: "rsa".into(),
            encrypted_info: b"info".to_vec(),
        });
        assert_eq!(f.submit(claim, &key).code, LedgerError::EmptySecret.code());
    }
}
