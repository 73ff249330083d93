//! Master-Key Relay
//!
//! Holds the custodial signing key and serializes custody submissions.
//! The sequence number is guarded by one async lock held across
//! build, sign, submit and await-commit, so at most one signed
//! transaction per sequence number is ever in flight.
//!
//! Sequence advancement rules:
//!
//! | Outcome                               | Sequence         |
//! |---------------------------------------|------------------|
//! | committed, code 0                     | advances         |
//! | committed, attendee already keyed     | advances         |
//! | committed, any other non-zero code    | advances         |
//! | rejected for a sequence mismatch      | resynced         |
//! | rejected at admission                 | unchanged        |
//! | invalid before signing                | unchanged        |
//! | transport failure                     | unchanged        |
//!
//! A caller that gives up waiting (lock timeout, dropped future) must
//! treat the custody outcome as unknown and re-read the attendee.

use std::time::Duration;

use ed25519_dalek::SigningKey;
use thiserror::Error;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{error, info, instrument, warn};

use crate::core::{Address, Commitment, PublicKey};
use crate::ledger::errors::{CODE_ATTENDEE_KEYED, CODE_INVALID_SEQUENCE};
use crate::ledger::{LedgerError, MsgKey, Operation, SignedTx};

use super::client::{ClientError, LedgerClient};

/// Errors from custody submission.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The attendee already has a key. Sequence advanced.
    #[error("account already key'ed")]
    AlreadyKeyed,

    /// The ledger rejected the transaction. Sequence advanced if it was executed.
    #[error("failed tx (code {code}): {log}")]
    FailedTx {
        /// Result code.
        code: u32,
        /// Raw log.
        log: String,
    },

    /// Submission never reached a terminal result. Sequence not advanced.
    #[error("submission failed: {0}")]
    Submission(ClientError),

    /// The request failed stateless validation. Nothing was submitted.
    #[error("invalid custody request: {0}")]
    InvalidRequest(LedgerError),

    /// The sequence lock was not acquired in time. Nothing was submitted.
    #[error("sequence lock not acquired within {0:?}")]
    Busy(Duration),

    /// The transaction could not be signed.
    #[error("signing failed: {0}")]
    Signing(LedgerError),

    /// The master account could not be looked up at startup.
    #[error("master account lookup failed: {0}")]
    AccountLookup(ClientError),
}

/// The custodial signer.
pub struct MasterKey<C> {
    signing_key: SigningKey,
    public_key: PublicKey,
    address: Address,
    chain_id: String,
    account_number: u64,
    sequence: Mutex<u64>,
    lock_timeout: Option<Duration>,
    client: C,
}

impl<C: LedgerClient> MasterKey<C> {
    /// Look up the master account and start a relay at its current sequence.
    pub async fn connect(
        signing_key: SigningKey,
        chain_id: impl Into<String>,
        client: C,
    ) -> Result<Self, RelayError> {
        let public_key = PublicKey::from(&signing_key.verifying_key());
        let address = public_key.address();
        let chain_id = chain_id.into();

        let info = client
            .account(&address)
            .await
            .map_err(RelayError::AccountLookup)?;

        info!(
            chain_id = %chain_id,
            address = %address,
            account_number = info.account_number,
            sequence = info.sequence,
            "master key relay ready"
        );

        Ok(Self {
            signing_key,
            public_key,
            address,
            chain_id,
            account_number: info.account_number,
            sequence: Mutex::new(info.sequence),
            lock_timeout: None,
            client,
        })
    }

    /// Bound how long callers wait for the sequence lock.
    pub fn with_lock_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Master account address.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Master public key.
    pub fn public_key(&self) -> PublicKey {
        self.public_key
    }

    /// Chain the relay signs for.
    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    /// Master account number.
    pub fn account_number(&self) -> u64 {
        self.account_number
    }

    /// The ledger client.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Key an attendee account with `new_public_key` and `commitment`.
    #[instrument(skip_all, fields(attendee = %attendee))]
    pub async fn submit_key_custody(
        &self,
        attendee: Address,
        new_public_key: PublicKey,
        commitment: Commitment,
    ) -> Result<(), RelayError> {
        let op = Operation::Key(MsgKey {
            attendee_address: attendee,
            master_address: self.address,
            new_attendee_public_key: new_public_key,
            commitment,
        });
        op.validate_basic().map_err(|e| {
            info!(error = %e, "custody request refused before signing");
            RelayError::InvalidRequest(e)
        })?;

        let mut sequence = self.lock_sequence().await?;
        let tx = SignedTx::sign(
            op,
            &self.chain_id,
            self.account_number,
            *sequence,
            &self.signing_key,
        )
        .map_err(|e| {
            error!(error = %e, "failed to sign custody transaction");
            RelayError::Signing(e)
        })?;

        let response = match self.client.broadcast_commit(&tx).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, sequence = *sequence, "custody submission failed");
                return Err(RelayError::Submission(e));
            }
        };

        if response.code == CODE_INVALID_SEQUENCE {
            self.resync(&mut sequence).await;
            return Err(RelayError::FailedTx {
                code: response.code,
                log: response.log,
            });
        }

        if response.executed {
            *sequence += 1;
        } else {
            warn!(
                code = response.code,
                raw_log = %response.log,
                sequence = *sequence,
                "custody transaction not admitted"
            );
        }

        if response.is_ok() {
            info!(sequence = tx.sequence, height = response.height, "attendee keyed");
            Ok(())
        } else if response.code == CODE_ATTENDEE_KEYED {
            Err(RelayError::AlreadyKeyed)
        } else {
            info!(code = response.code, raw_log = %response.log, "custody transaction rejected");
            Err(RelayError::FailedTx {
                code: response.code,
                log: response.log,
            })
        }
    }

    async fn lock_sequence(&self) -> Result<MutexGuard<'_, u64>, RelayError> {
        match self.lock_timeout {
            Some(limit) => tokio::time::timeout(limit, self.sequence.lock())
                .await
                .map_err(|_| RelayError::Busy(limit)),
            None => Ok(self.sequence.lock().await),
        }
    }

    async fn resync(&self, sequence: &mut MutexGuard<'_, u64>) {
        match self.client.account(&self.address).await {
            Ok(info) => {
                warn!(
                    local = **sequence,
                    ledger = info.sequence,
                    "sequence out of sync, adopting ledger value"
                );
                **sequence = info.sequence;
            }
            Err(e) => warn!(error = %e, "sequence resync failed"),
        }
    }
}
