//! Typed access to ledger records in a [`StateStore`].
//!
//! Free functions over the store capability; handlers compose them and
//! never touch raw keys themselves.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::core::keys::{
    account_key, account_number_key, attendee_key, is_key_of, master_key, prefix, prize_key,
    redeem_key, ATTENDEE_PREFIX, PRIZE_PREFIX, SCAN_PREFIX,
};
use crate::core::{Address, PublicKey, ScanId, StateStore};

use super::errors::LedgerError;
use super::types::{Account, Attendee, Prize, Scan};

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, LedgerError> {
    Ok(bincode::serialize(value)?)
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, LedgerError> {
    Ok(bincode::deserialize(bytes)?)
}

fn read<T: DeserializeOwned>(store: &dyn StateStore, key: &[u8]) -> Result<Option<T>, LedgerError> {
    store.get(key).map(|bytes| decode(&bytes)).transpose()
}

fn write<T: Serialize>(store: &mut dyn StateStore, key: &[u8], value: &T) -> Result<(), LedgerError> {
    let bytes = encode(value)?;
    store.set(key, bytes);
    Ok(())
}

// =============================================================================
// ACCOUNTS
// =============================================================================

/// Look up an account.
pub fn get_account(store: &dyn StateStore, address: &Address) -> Result<Option<Account>, LedgerError> {
    read(store, &account_key(address))
}

/// Persist an account.
pub fn set_account(store: &mut dyn StateStore, account: &Account) -> Result<(), LedgerError> {
    write(store, &account_key(&account.address), account)
}

/// Create an account with the next account number.
///
/// An existing account is returned unchanged.
pub fn create_account(
    store: &mut dyn StateStore,
    address: Address,
    pub_key: Option<PublicKey>,
) -> Result<Account, LedgerError> {
    if let Some(existing) = get_account(store, &address)? {
        return Ok(existing);
    }

    let number: u64 = read(store, &account_number_key())?.unwrap_or(0);
    write(store, &account_number_key(), &(number + 1))?;

    let account = Account::new(address, number, pub_key);
    set_account(store, &account)?;
    Ok(account)
}

// =============================================================================
// ATTENDEES
// =============================================================================

/// Look up an attendee by address.
pub fn get_attendee(store: &dyn StateStore, address: &Address) -> Result<Option<Attendee>, LedgerError> {
    read(store, &attendee_key(address))
}

/// Look up an attendee by ticket id.
pub fn get_attendee_by_id(store: &dyn StateStore, id: &str) -> Result<Option<Attendee>, LedgerError> {
    get_attendee(store, &Address::from_external_id(id))
}

/// Persist an attendee.
pub fn set_attendee(store: &mut dyn StateStore, attendee: &Attendee) -> Result<(), LedgerError> {
    write(store, &attendee_key(&attendee.address), attendee)
}

/// All attendees in address order.
pub fn all_attendees(store: &dyn StateStore) -> Result<Vec<Attendee>, LedgerError> {
    store
        .scan_prefix(&prefix(ATTENDEE_PREFIX))
        .iter()
        .map(|(_, bytes)| decode(bytes))
        .collect()
}

// =============================================================================
// SCANS
// =============================================================================

/// Look up a scan. Ids outside the scan key class never match.
pub fn get_scan(store: &dyn StateStore, id: &ScanId) -> Result<Option<Scan>, LedgerError> {
    if !is_key_of(id.as_bytes(), SCAN_PREFIX) {
        return Ok(None);
    }
    read(store, id.as_bytes())
}

/// Persist a scan under its id.
pub fn set_scan(store: &mut dyn StateStore, scan: &Scan) -> Result<(), LedgerError> {
    write(store, scan.id.as_bytes(), scan)
}

// =============================================================================
// PRIZES
// =============================================================================

/// Look up a prize tier.
pub fn get_prize(store: &dyn StateStore, tier: u8) -> Result<Option<Prize>, LedgerError> {
    read(store, &prize_key(tier))
}

/// Persist a prize tier.
pub fn set_prize(store: &mut dyn StateStore, prize: &Prize) -> Result<(), LedgerError> {
    write(store, &prize_key(prize.tier), prize)
}

/// All prize tiers in tier order.
pub fn all_prizes(store: &dyn StateStore) -> Result<Vec<Prize>, LedgerError> {
    store
        .scan_prefix(&prefix(PRIZE_PREFIX))
        .iter()
        .map(|(_, bytes)| decode(bytes))
        .collect()
}

// =============================================================================
// SERVICE ADDRESSES
// =============================================================================

/// Address of the custodial master service.
pub fn master_address(store: &dyn StateStore) -> Result<Option<Address>, LedgerError> {
    read(store, &master_key())
}

/// Set the custodial master service address.
pub fn set_master_address(store: &mut dyn StateStore, address: &Address) -> Result<(), LedgerError> {
    write(store, &master_key(), address)
}

/// Address of the booth redemption service.
pub fn redeem_address(store: &dyn StateStore) -> Result<Option<Address>, LedgerError> {
    read(store, &redeem_key())
}

/// Set the booth redemption service address.
pub fn set_redeem_address(store: &mut dyn StateStore, address: &Address) -> Result<(), LedgerError> {
    write(store, &redeem_key(), address)
}
