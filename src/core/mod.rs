//! Core primitives.
//!
//! Identifiers, hashing, commit-reveal and the key-value store that the
//! ledger state machines are written against. Nothing here performs I/O.

pub mod address;
pub mod commitment;
pub mod hash;
pub mod keys;
pub mod store;

// Re-export core types
pub use address::{Address, HexError, PublicKey};
pub use commitment::Commitment;
pub use hash::{hash_bytes, Hash256};
pub use keys::{PairError, ScanId};
pub use store::{CacheStore, MemStore, StateStore};
