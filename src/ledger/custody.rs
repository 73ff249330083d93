//! Attendee Key Custody
//!
//! Lifecycle of an attendee account:
//!
//! ```text
//! Unkeyed ──Key──▶ Keyed ──ClaimKey──▶ Claimed
//! ```
//!
//! `Key` is submitted by the master service. It installs a public key the
//! attendee controls and stores a commitment to a secret sent to them
//! out of band. `ClaimKey` is signed by the attendee with that key and
//! reveals the secret. Claimed is terminal: `Key` is rejected for any
//! attendee that already has a key, claimed or not.

use tracing::debug;

use crate::core::StateStore;
use crate::CLAIM_POINTS;

use super::errors::LedgerError;
use super::handler::Context;
use super::keeper;
use super::msgs::{MsgClaimKey, MsgKey, Operation};
use super::prize;
use super::types::Attendee;

/// Route custody operations.
pub fn handle(_ctx: &Context, store: &mut dyn StateStore, op: &Operation) -> Result<(), LedgerError> {
    match op {
        Operation::Key(msg) => handle_key(store, msg),
        Operation::ClaimKey(msg) => handle_claim_key(store, msg),
        other => Err(LedgerError::UnrecognizedMessageType(
            other.type_name().to_string(),
        )),
    }
}

fn handle_key(store: &mut dyn StateStore, msg: &MsgKey) -> Result<(), LedgerError> {
    let master = keeper::master_address(store)?;
    if master != Some(msg.master_address) {
        return Err(LedgerError::Unauthorized(format!(
            "{} is not the master service",
            msg.master_address
        )));
    }

    let mut account = keeper::get_account(store, &msg.attendee_address)?
        .ok_or(LedgerError::AttendeeNotFound)?;

    let mut attendee = keeper::get_attendee(store, &msg.attendee_address)?
        .unwrap_or_else(|| Attendee::with_address(msg.attendee_address));
    if attendee.is_keyed() {
        return Err(LedgerError::AttendeeKeyed);
    }

    account.pub_key = Some(msg.new_attendee_public_key);
    keeper::set_account(store, &account)?;

    attendee.pub_key = Some(msg.new_attendee_public_key);
    attendee.commitment = Some(msg.commitment);
    keeper::set_attendee(store, &attendee)?;

    debug!(attendee = %attendee.address, "attendee keyed");
    Ok(())
}

fn handle_claim_key(store: &mut dyn StateStore, msg: &MsgClaimKey) -> Result<(), LedgerError> {
    let mut attendee = keeper::get_attendee(store, &msg.attendee_address)?
        .ok_or(LedgerError::AttendeeNotFound)?;
    if attendee.claimed {
        return Err(LedgerError::AttendeeClaimed);
    }

    let revealed = attendee
        .commitment
        .map(|c| c.verify_reveal(msg.secret.as_bytes()))
        .unwrap_or(false);
    if !revealed {
        return Err(LedgerError::InvalidCommitmentReveal);
    }

    // the key that signed this claim is the one installed on the account
    if let Some(account) = keeper::get_account(store, &msg.attendee_address)? {
        if account.pub_key.is_some() {
            attendee.pub_key = account.pub_key;
        }
    }

    attendee.commitment = None;
    attendee.claimed = true;
    attendee.name = msg.name.clone();
    attendee.rsa_public_key = msg.rsa_public_key.clone();
    attendee.encrypted_info = msg.encrypted_info.clone();
    prize::award_points(store, &mut attendee, CLAIM_POINTS)?;
    keeper::set_attendee(store, &attendee)?;

    debug!(attendee = %attendee.address, rep = attendee.rep, "attendee claimed");
    Ok(())
}
