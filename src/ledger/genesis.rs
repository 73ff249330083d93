//! Genesis state.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core::{Address, PublicKey, StateStore};

use super::errors::LedgerError;
use super::keeper;
use super::prize::default_prizes;
use super::types::{Attendee, Prize};

/// A roster entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisAttendee {
    /// Ticket id.
    pub id: String,
    /// Ticket class.
    pub ticket_class: String,
}

/// Initial ledger contents.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenesisState {
    /// Public key of the custodial master service.
    pub key_service: PublicKey,
    /// Public key of the booth redemption service.
    pub redeem_service: PublicKey,
    /// Attendee roster.
    pub attendees: Vec<GenesisAttendee>,
    /// Prize tiers.
    pub prizes: Vec<Prize>,
}

impl GenesisState {
    /// Genesis with the default prize table and an empty roster.
    pub fn new(key_service: PublicKey, redeem_service: PublicKey) -> Self {
        Self {
            key_service,
            redeem_service,
            attendees: Vec::new(),
            prizes: default_prizes(),
        }
    }

    /// Add a roster entry.
    pub fn with_attendee(mut self, id: impl Into<String>, ticket_class: impl Into<String>) -> Self {
        self.attendees.push(GenesisAttendee {
            id: id.into(),
            ticket_class: ticket_class.into(),
        });
        self
    }
}

/// Seed an empty store from genesis.
pub fn init_genesis(store: &mut dyn StateStore, genesis: &GenesisState) -> Result<(), LedgerError> {
    let master = Address::from_public_key(&genesis.key_service);
    keeper::create_account(store, master, Some(genesis.key_service))?;
    keeper::set_master_address(store, &master)?;

    let redeem = Address::from_public_key(&genesis.redeem_service);
    keeper::create_account(store, redeem, Some(genesis.redeem_service))?;
    keeper::set_redeem_address(store, &redeem)?;

    for entry in &genesis.attendees {
        let attendee = Attendee::new(entry.id.as_str(), entry.ticket_class.as_str());
        keeper::create_account(store, attendee.address, None)?;
        keeper::set_attendee(store, &attendee)?;
    }

    for prize in &genesis.prizes {
        keeper::set_prize(store, prize)?;
    }

    info!(
        master = %master,
        redeem = %redeem,
        attendees = genesis.attendees.len(),
        prizes = genesis.prizes.len(),
        "genesis initialized"
    );
    Ok(())
}
