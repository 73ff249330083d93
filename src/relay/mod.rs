//! Off-ledger custody relay.
//!
//! The only component holding the custodial signing key. Everything here
//! is async and non-deterministic; it reaches the ledger through a
//! [`LedgerClient`].

pub mod client;
pub mod config;
pub mod masterkey;

pub use client::{AccountInfo, ClientError, LedgerClient, LocalLedger};
pub use config::{ConfigError, RelayConfig};
pub use masterkey::{MasterKey, RelayError};
