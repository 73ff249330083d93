//! Ledger state machines.
//!
//! Deterministic handlers for attendee key custody, scans and prizes,
//! plus the transaction admission that the external ledger performs in
//! front of them. Handlers assume they run one at a time and take no
//! locks.

pub mod app;
pub mod custody;
pub mod errors;
pub mod genesis;
pub mod handler;
pub mod keeper;
pub mod msgs;
pub mod prize;
pub mod query;
pub mod scan;
pub mod tx;
pub mod types;

pub use app::LedgerApp;
pub use errors::LedgerError;
pub use genesis::{GenesisAttendee, GenesisState};
pub use handler::{handle, Context};
pub use msgs::{MsgClaimKey, MsgKey, MsgRedeem, MsgScanQr, Operation};
pub use query::{LeaderboardEntry, Query, QueryResponse};
pub use tx::{SignedTx, TxResponse};
pub use types::{Account, Attendee, Prize, Scan, Win};
