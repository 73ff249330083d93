//! Operation dispatch.
//!
//! [`handle`] routes an operation to its module handler inside a
//! [`CacheStore`] overlay. Writes reach the store only when the handler
//! returns `Ok`.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::core::{CacheStore, StateStore};

use super::errors::LedgerError;
use super::msgs::Operation;
use super::{custody, prize, scan};

/// Execution context supplied by the ledger for each operation.
#[derive(Clone, Debug, Default)]
pub struct Context {
    /// Chain identifier.
    pub chain_id: String,
    /// Height of the block containing the operation.
    pub block_height: u64,
    /// Block timestamp.
    pub block_time: DateTime<Utc>,
}

impl Context {
    /// Create a context.
    pub fn new(chain_id: impl Into<String>, block_height: u64, block_time: DateTime<Utc>) -> Self {
        Self {
            chain_id: chain_id.into(),
            block_height,
            block_time,
        }
    }
}

/// Apply one operation atomically.
pub fn handle(ctx: &Context, store: &mut dyn StateStore, op: &Operation) -> Result<(), LedgerError> {
    let mut cache = CacheStore::new(&*store);
    let result = route(ctx, &mut cache, op);
    let writes = cache.into_writes();

    match result {
        Ok(()) => {
            debug!(op = op.type_name(), writes = writes.len(), "operation applied");
            store.write_batch(writes);
            Ok(())
        }
        Err(e) => {
            debug!(op = op.type_name(), error = %e, code = e.code(), "operation rejected");
            Err(e)
        }
    }
}

fn route(ctx: &Context, store: &mut dyn StateStore, op: &Operation) -> Result<(), LedgerError> {
    match op {
        Operation::Key(_) | Operation::ClaimKey(_) => custody::handle(ctx, store, op),
        Operation::ScanQr(_) => scan::handle(ctx, store, op),
        Operation::Redeem(_) => prize::handle(ctx, store, op),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::address::ADDRESS_LEN;
    use crate::core::{Address, MemStore};
    use crate::ledger::keeper;
    use crate::ledger::msgs::MsgScanQr;
    use crate::ledger::types::Attendee;

    #[test]
    fn test_failed_operation_leaves_store_unchanged() {
        let mut store = MemStore::new();
        keeper::set_attendee(&mut store, &Attendee::new("1", "GA")).unwrap();
        let before = store.state_hash();

        // sender has no attendee record, so the scan fails after the
        // scanned attendee resolves
        let op = Operation::ScanQr(MsgScanQr {
            sender: Address::new([5; ADDRESS_LEN]),
            scanned_qr: "1".into(),
            data: b"hello".to_vec(),
        });

        assert_eq!(
            handle(&Context::default(), &mut store, &op),
            Err(LedgerError::AttendeeNotFound)
        );
        assert_eq!(store.state_hash(), before);
    }
}
