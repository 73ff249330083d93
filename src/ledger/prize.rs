//! Prize Tiers and Redemption
//!
//! Reputation thresholds map to tiers. Every point change re-evaluates the
//! attendee's tier; reaching a new tier appends a [`Win`] while the prize
//! still has stock. Booth operators collect winnings with `Redeem`.

use tracing::debug;

use crate::core::{Address, StateStore};

use super::errors::LedgerError;
use super::handler::Context;
use super::keeper;
use super::msgs::{MsgRedeem, Operation};
use super::types::{Attendee, Prize, Win};

/// The five-tier table used when genesis doesn't provide one.
pub fn default_prizes() -> Vec<Prize> {
    let tiers: [(u64, &str, u32); 5] = [
        (5, "Sticker pack", 500),
        (20, "T-shirt", 200),
        (50, "Hoodie", 100),
        (100, "Hardware wallet", 25),
        (200, "Conference pass", 5),
    ];

    tiers
        .iter()
        .enumerate()
        .map(|(i, (rep_needed, text, quantity))| Prize {
            tier: (i + 1) as u8,
            rep_needed: *rep_needed,
            prize_text: (*text).to_string(),
            quantity: *quantity,
        })
        .collect()
}

/// Highest tier whose threshold is at most `rep`, or 0.
pub fn tier_for(prizes: &[Prize], rep: u64) -> u8 {
    prizes
        .iter()
        .filter(|p| p.rep_needed <= rep)
        .map(|p| p.tier)
        .max()
        .unwrap_or(0)
}

/// Add points to an attendee and bring their tier up to date.
///
/// The attendee is modified in place; persisting it is up to the caller.
pub fn award_points(
    store: &mut dyn StateStore,
    attendee: &mut Attendee,
    points: u64,
) -> Result<(), LedgerError> {
    attendee.add_rep(points);
    update_tier(store, attendee)
}

/// Re-evaluate the tier and hand out winnings for newly reached tiers.
pub fn update_tier(store: &mut dyn StateStore, attendee: &mut Attendee) -> Result<(), LedgerError> {
    let prizes = keeper::all_prizes(store)?;
    let new_tier = tier_for(&prizes, attendee.rep);
    if new_tier <= attendee.tier {
        return Ok(());
    }

    for mut prize in prizes
        .into_iter()
        .filter(|p| p.tier > attendee.tier && p.tier <= new_tier)
    {
        if prize.quantity == 0 {
            debug!(tier = prize.tier, "prize out of stock");
            continue;
        }
        prize.quantity -= 1;
        attendee.winnings.push(Win {
            tier: prize.tier,
            name: prize.prize_text.clone(),
            claimed: false,
        });
        keeper::set_prize(store, &prize)?;
    }

    debug!(
        attendee = %attendee.address,
        from = attendee.tier,
        to = new_tier,
        "tier advanced"
    );
    attendee.tier = new_tier;
    Ok(())
}

/// Route prize operations.
pub fn handle(_ctx: &Context, store: &mut dyn StateStore, op: &Operation) -> Result<(), LedgerError> {
    match op {
        Operation::Redeem(msg) => handle_redeem(store, msg),
        other => Err(LedgerError::UnrecognizedMessageType(
            other.type_name().to_string(),
        )),
    }
}

fn handle_redeem(store: &mut dyn StateStore, msg: &MsgRedeem) -> Result<(), LedgerError> {
    let redeem = keeper::redeem_address(store)?;
    if redeem != Some(msg.sender) {
        return Err(LedgerError::Unauthorized(format!(
            "{} is not the redeem service",
            msg.sender
        )));
    }

    let mut attendee = keeper::get_attendee(store, &Address::from_external_id(&msg.scanned_qr))?
        .ok_or(LedgerError::AttendeeNotFound)?;

    let mut redeemed = 0usize;
    for win in attendee.winnings.iter_mut().filter(|w| !w.claimed) {
        win.claimed = true;
        redeemed += 1;
    }
    if redeemed == 0 {
        return Err(LedgerError::NoUnclaimedWinnings);
    }

    keeper::set_attendee(store, &attendee)?;
    debug!(attendee = %attendee.address, redeemed, "winnings redeemed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::address::ADDRESS_LEN;
    use crate::core::MemStore;

    fn seeded_store() -> MemStore {
        let mut store = MemStore::new();
        for prize in default_prizes() {
            keeper::set_prize(&mut store, &prize).unwrap();
        }
        store
    }

    #[test]
    fn test_tier_lookup() {
        let prizes = default_prizes();
        assert_eq!(tier_for(&prizes, 0), 0);
        assert_eq!(tier_for(&prizes, 4), 0);
        assert_eq!(tier_for(&prizes, 5), 1);
        assert_eq!(tier_for(&prizes, 49), 2);
        assert_eq!(tier_for(&prizes, 50), 3);
        assert_eq!(tier_for(&prizes, 10_000), 5);
        assert_eq!(tier_for(&[], 10_000), 0);
    }

    #[test]
    fn test_tier_skip_awards_each_tier() {
        let mut store = seeded_store();
        let mut attendee = Attendee::new("1", "GA");

        award_points(&mut store, &mut attendee, 25).unwrap();

        assert_eq!(attendee.tier, 2);
        assert_eq!(attendee.winnings.len(), 2);
        assert_eq!(attendee.winnings[0].tier, 1);
        assert_eq!(attendee.winnings[1].tier, 2);
        assert_eq!(keeper::get_prize(&store, 1).unwrap().unwrap().quantity, 499);
    }

    #[test]
    fn test_no_win_without_stock() {
        let mut store = MemStore::new();
        keeper::set_prize(
            &mut store,
            &Prize {
                tier: 1,
                rep_needed: 1,
                prize_text: "Pin".into(),
                quantity: 0,
            },
        )
        .unwrap();
        let mut attendee = Attendee::new("1", "GA");

        award_points(&mut store, &mut attendee, 1).unwrap();

        assert_eq!(attendee.tier, 1);
        assert!(attendee.winnings.is_empty());
    }

    #[test]
    fn test_redeem_flow() {
        let mut store = seeded_store();
        let booth = Address::new([7; ADDRESS_LEN]);
        keeper::set_redeem_address(&mut store, &booth).unwrap();

        let mut attendee = Attendee::new("3", "GA");
        award_points(&mut store, &mut attendee, 5).unwrap();
        keeper::set_attendee(&mut store, &attendee).unwrap();

        let ctx = Context::default();
        let redeem = |sender| {
            Operation::Redeem(MsgRedeem {
                sender,
                scanned_qr: "3".into(),
            })
        };

        assert!(matches!(
            handle(&ctx, &mut store, &redeem(Address::new([8; ADDRESS_LEN]))),
            Err(LedgerError::Unauthorized(_))
        ));

        handle(&ctx, &mut store, &redeem(booth)).unwrap();
        let stored = keeper::get_attendee_by_id(&store, "3").unwrap().unwrap();
        assert_eq!(stored.unclaimed_winnings().count(), 0);

        assert_eq!(
            handle(&ctx, &mut store, &redeem(booth)),
            Err(LedgerError::NoUnclaimedWinnings)
        );
    }
}
