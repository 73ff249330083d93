//! Ledger client seam.
//!
//! The relay talks to the ledger through [`LedgerClient`]. [`LocalLedger`]
//! is the in-process implementation backed by a [`LedgerApp`].

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::core::Address;
use crate::ledger::{LedgerApp, LedgerError, Query, QueryResponse, SignedTx, TxResponse};

/// Account counters needed to sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    /// Account number.
    pub account_number: u64,
    /// Next expected sequence.
    pub sequence: u64,
}

/// Errors talking to the ledger.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// The ledger could not be reached or the submission was lost in transit.
    #[error("ledger unreachable: {0}")]
    Unreachable(String),

    /// No account at the address.
    #[error("account not found: {0}")]
    AccountNotFound(Address),

    /// The ledger rejected a query.
    #[error("query rejected: {0}")]
    Query(LedgerError),
}

/// Access to an external ledger.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Look up account number and sequence.
    async fn account(&self, address: &Address) -> Result<AccountInfo, ClientError>;

    /// Submit and wait until the transaction is committed.
    async fn broadcast_commit(&self, tx: &SignedTx) -> Result<TxResponse, ClientError>;

    /// Run a read-only query.
    async fn query(&self, query: &Query) -> Result<QueryResponse, ClientError>;
}

/// In-process ledger.
#[derive(Clone)]
pub struct LocalLedger {
    app: Arc<Mutex<LedgerApp>>,
}

impl LocalLedger {
    /// Wrap a ledger application.
    pub fn new(app: LedgerApp) -> Self {
        Self {
            app: Arc::new(Mutex::new(app)),
        }
    }

    /// Shared handle to the application.
    pub fn app(&self) -> Arc<Mutex<LedgerApp>> {
        Arc::clone(&self.app)
    }
}

#[async_trait]
impl LedgerClient for LocalLedger {
    async fn account(&self, address: &Address) -> Result<AccountInfo, ClientError> {
        let app = self.app.lock().await;
        let account = app
            .account(address)
            .map_err(ClientError::Query)?
            .ok_or(ClientError::AccountNotFound(*address))?;
        Ok(AccountInfo {
            account_number: account.account_number,
            sequence: account.sequence,
        })
    }

    async fn broadcast_commit(&self, tx: &SignedTx) -> Result<TxResponse, ClientError> {
        let mut app = self.app.lock().await;
        Ok(app.deliver_tx(tx, Utc::now()))
    }

    async fn query(&self, query: &Query) -> Result<QueryResponse, ClientError> {
        let app = self.app.lock().await;
        app.query(query).map_err(ClientError::Query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PublicKey;
    use crate::ledger::GenesisState;
    use ed25519_dalek::SigningKey;

    fn ledger() -> (LocalLedger, PublicKey) {
        let master = PublicKey::from(&SigningKey::from_bytes(&[1; 32]).verifying_key());
        let redeem = PublicKey::from(&SigningKey::from_bytes(&[2; 32]).verifying_key());
        let genesis = GenesisState::new(master, redeem).with_attendee("1", "GA");
        (
            LocalLedger::new(LedgerApp::new("local", &genesis).unwrap()),
            master,
        )
    }

    #[tokio::test]
    async fn test_account_lookup() {
        let (ledger, master) = ledger();

        let info = ledger.account(&master.address()).await.unwrap();
        assert_eq!(info.sequence, 0);

        let missing = Address::from_external_id("404");
        assert!(matches!(
            ledger.account(&missing).await,
            Err(ClientError::AccountNotFound(a)) if a == missing
        ));
    }

    #[tokio::test]
    async fn test_query_passthrough() {
        let (ledger, _) = ledger();

        let resp = ledger.query(&Query::Keyed { id: "1".into() }).await.unwrap();
        assert_eq!(resp, QueryResponse::Flag(false));

        assert!(matches!(
            ledger.query(&Query::Keyed { id: "2".into() }).await,
            Err(ClientError::Query(LedgerError::AttendeeNotFound))
        ));
    }
}
