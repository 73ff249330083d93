//! # LinkedUp
//!
//! Attendee key custody, commit-reveal claims and scan rewards for the
//! LinkedUp conference ledger.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        LINKEDUP                              │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  ├── address.rs  - Addresses and public keys                 │
//! │  ├── hash.rs     - Domain-separated SHA-256                  │
//! │  ├── commitment.rs - Commit-reveal secrets                   │
//! │  ├── keys.rs     - Store key layout, scan ids                │
//! │  └── store.rs    - Key-value store and write overlay         │
//! │                                                              │
//! │  ledger/         - State machines (deterministic)            │
//! │  ├── custody.rs  - Key and ClaimKey                          │
//! │  ├── scan.rs     - ScanQr and data sharing                   │
//! │  ├── prize.rs    - Tiers, winnings, Redeem                   │
//! │  ├── query.rs    - Read paths and leaderboard                │
//! │  └── app.rs      - Transaction admission                     │
//! │                                                              │
//! │  relay/          - Master-key relay (async)                  │
//! │  └── masterkey.rs- Serialized custodial signing              │
//! │                                                              │
//! │  network/        - Front door (non-deterministic)            │
//! │  ├── service.rs  - Custody requests, claim links             │
//! │  ├── server.rs   - WebSocket server                          │
//! │  └── auth.rs     - Attendee JWT validation                   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism
//!
//! `core/` and `ledger/` never read the clock, use randomness or
//! iterate a `HashMap`. Block time arrives through
//! [`ledger::Context`]; secrets are generated only in `core::commitment`
//! and only ever called from the relay side.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod ledger;
pub mod network;
pub mod relay;

// Re-export commonly used types
pub use core::{Address, Commitment, PublicKey, ScanId};
pub use ledger::{GenesisState, LedgerApp, LedgerError, Operation, SignedTx, TxResponse};
pub use relay::{LedgerClient, LocalLedger, MasterKey, RelayConfig, RelayError};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Reputation for claiming a keyed account.
pub const CLAIM_POINTS: u64 = 5;

/// Reputation each side earns the first time a pair scans.
pub const SCAN_POINTS: u64 = 1;

/// Reputation for sharing profile data in a scan.
pub const SHARE_INFO_POINTS: u64 = 3;
