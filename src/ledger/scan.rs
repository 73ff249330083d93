//! Scan and Share
//!
//! Two attendees meeting produce one [`Scan`] record keyed by their
//! canonical pair id, however many times and in whichever direction they
//! scan each other. The first scan awards both sides; each side sharing
//! data for the first time earns the sharer a bonus.

use tracing::debug;

use crate::core::{Address, ScanId, StateStore};
use crate::{SCAN_POINTS, SHARE_INFO_POINTS};

use super::errors::LedgerError;
use super::handler::Context;
use super::keeper;
use super::msgs::{MsgScanQr, Operation};
use super::prize;
use super::types::Scan;

/// Route scan operations.
pub fn handle(ctx: &Context, store: &mut dyn StateStore, op: &Operation) -> Result<(), LedgerError> {
    match op {
        Operation::ScanQr(msg) => handle_scan_qr(ctx, store, msg),
        other => Err(LedgerError::UnrecognizedMessageType(
            other.type_name().to_string(),
        )),
    }
}

fn handle_scan_qr(ctx: &Context, store: &mut dyn StateStore, msg: &MsgScanQr) -> Result<(), LedgerError> {
    let scanned_address = Address::from_external_id(&msg.scanned_qr);
    let mut scanned = keeper::get_attendee(store, &scanned_address)?
        .ok_or(LedgerError::AttendeeNotFound)?;

    let id = ScanId::for_pair(&msg.sender, &scanned.address)?;
    let mut sender = keeper::get_attendee(store, &msg.sender)?
        .ok_or(LedgerError::AttendeeNotFound)?;

    let mut scan = match keeper::get_scan(store, &id)? {
        Some(scan) => scan,
        None => {
            let mut scan = Scan::new(msg.sender, scanned.address, ctx.block_time.timestamp())?;
            scan.add_points(SCAN_POINTS, SCAN_POINTS);
            prize::award_points(store, &mut sender, SCAN_POINTS)?;
            prize::award_points(store, &mut scanned, SCAN_POINTS)?;
            debug!(scan = %scan.id, "scan created");
            scan
        }
    };

    sender.add_scan_id(&scan.id);
    scanned.add_scan_id(&scan.id);

    let (slot, points) = scan.side_mut(&msg.sender);
    if slot.is_empty() && !msg.data.is_empty() {
        slot.extend_from_slice(&msg.data);
        *points = points.saturating_add(SHARE_INFO_POINTS);
        prize::award_points(store, &mut sender, SHARE_INFO_POINTS)?;
        debug!(scan = %scan.id, sender = %msg.sender, "info shared");
    }

    keeper::set_scan(store, &scan)?;
    keeper::set_attendee(store, &sender)?;
    keeper::set_attendee(store, &scanned)?;
    Ok(())
}

/// All scans an attendee participates in.
pub fn scans_of(store: &dyn StateStore, address: &Address) -> Result<Vec<Scan>, LedgerError> {
    let attendee = keeper::get_attendee(store, address)?.ok_or(LedgerError::AttendeeNotFound)?;
    attendee
        .scan_ids
        .iter()
        .map(|id| keeper::get_scan(store, id)?.ok_or(LedgerError::ScanNotFound))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::MemStore;
    use crate::ledger::handler;
    use chrono::{TimeZone, Utc};
    use crate::ledger::types::Attendee;

    fn setup() -> (MemStore, Address, Address) {
        let mut store = MemStore::new();
        let alice = Attendee::new("1", "GA");
        let bob = Attendee::new("2", "GA");
        keeper::set_attendee(&mut store, &alice).unwrap();
        keeper::set_attendee(&mut store, &bob).unwrap();
        (store, alice.address, bob.address)
    }

    fn scan_op(sender: Address, qr: &str, data: &[u8]) -> Operation {
        Operation::ScanQr(MsgScanQr {
            sender,
            scanned_qr: qr.into(),
            data: data.to_vec(),
        })
    }

    fn apply(store: &mut MemStore, op: &Operation) -> Result<(), LedgerError> {
        handler::handle(&Context::default(), store, op)
    }

    fn rep(store: &MemStore, address: &Address) -> u64 {
        keeper::get_attendee(store, address).unwrap().unwrap().rep
    }

    #[test]
    fn test_first_scan_awards_both() {
        let (mut store, alice, bob) = setup();

        apply(&mut store, &scan_op(alice, "2", b"")).unwrap();

        let id = ScanId::for_pair(&alice, &bob).unwrap();
        let scan = keeper::get_scan(&store, &id).unwrap().unwrap();
        assert_eq!(scan.s1, alice);
        assert_eq!(scan.s2, bob);
        assert_eq!((scan.p1, scan.p2), (SCAN_POINTS, SCAN_POINTS));
        assert!(scan.d1.is_empty() && scan.d2.is_empty());
        assert_eq!(rep(&store, &alice), SCAN_POINTS);
        assert_eq!(rep(&store, &bob), SCAN_POINTS);
    }

    #[test]
    fn test_scan_records_block_time_of_first_scan() {
        let (mut store, alice, bob) = setup();
        let at = |secs| Context::new("c", 1, Utc.timestamp_opt(secs, 0).unwrap());

        handler::handle(&at(1_700_000_000), &mut store, &scan_op(alice, "2", b"")).unwrap();
        handler::handle(&at(1_700_000_900), &mut store, &scan_op(bob, "1", b"card")).unwrap();

        let id = ScanId::for_pair(&alice, &bob).unwrap();
        let scan = keeper::get_scan(&store, &id).unwrap().unwrap();
        assert_eq!(scan.unix_time_sec, 1_700_000_000);
    }

    #[test]
    fn test_share_both_directions_once() {
        let (mut store, alice, bob) = setup();

        apply(&mut store, &scan_op(alice, "2", b"alice-card")).unwrap();
        apply(&mut store, &scan_op(bob, "1", b"bob-card")).unwrap();
        let settled = store.state_hash();

        let id = ScanId::for_pair(&alice, &bob).unwrap();
        let scan = keeper::get_scan(&store, &id).unwrap().unwrap();
        assert_eq!(scan.d1, b"alice-card");
        assert_eq!(scan.d2, b"bob-card");
        assert_eq!(scan.p1, SCAN_POINTS + SHARE_INFO_POINTS);
        assert_eq!(scan.p2, SCAN_POINTS + SHARE_INFO_POINTS);
        assert_eq!(rep(&store, &alice), SCAN_POINTS + SHARE_INFO_POINTS);
        assert_eq!(rep(&store, &bob), SCAN_POINTS + SHARE_INFO_POINTS);

        // resending in either direction changes nothing
        apply(&mut store, &scan_op(alice, "2", b"other")).unwrap();
        apply(&mut store, &scan_op(bob, "1", b"")).unwrap();
        assert_eq!(store.state_hash(), settled);
    }

    #[test]
    fn test_scan_ids_indexed_once() {
        let (mut store, alice, bob) = setup();
        apply(&mut store, &scan_op(alice, "2", b"")).unwrap();
        apply(&mut store, &scan_op(bob, "1", b"x")).unwrap();

        let alice_scans = scans_of(&store, &alice).unwrap();
        let bob_scans = scans_of(&store, &bob).unwrap();
        assert_eq!(alice_scans.len(), 1);
        assert_eq!(alice_scans, bob_scans);
    }

    #[test]
    fn test_scan_errors() {
        let (mut store, alice, _) = setup();

        assert_eq!(
            apply(&mut store, &scan_op(alice, "1", b"")),
            Err(LedgerError::AccountsSame)
        );
        assert_eq!(
            apply(&mut store, &scan_op(alice, "99", b"")),
            Err(LedgerError::AttendeeNotFound)
        );
        assert_eq!(
            apply(&mut store, &scan_op(Address::ZERO, "2", b"")),
            Err(LedgerError::AddressEmpty)
        );
    }
}
