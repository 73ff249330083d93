//! Read-only query paths.

use serde::{Deserialize, Serialize};

use crate::core::{Address, ScanId, StateStore};

use super::errors::LedgerError;
use super::keeper;
use super::scan::scans_of;
use super::types::{Attendee, Prize, Scan, Win};

/// Default number of leaderboard rows.
pub const DEFAULT_LEADERBOARD_LIMIT: usize = 10;

/// A read request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "path", rename_all = "snake_case")]
pub enum Query {
    /// Attendee by address.
    Attendee {
        /// Attendee address.
        address: Address,
    },
    /// Attendee by ticket id.
    AttendeeById {
        /// Ticket id.
        id: String,
    },
    /// Whether the attendee has a key installed.
    Keyed {
        /// Ticket id.
        id: String,
    },
    /// Whether the attendee claimed their account.
    Claimed {
        /// Ticket id.
        id: String,
    },
    /// Scan by pair id.
    Scan {
        /// Pair id.
        id: ScanId,
    },
    /// Every scan an attendee participates in.
    AttendeeScans {
        /// Attendee address.
        address: Address,
    },
    /// Every attendee, by address.
    Attendees,
    /// Prize tiers.
    Prizes,
    /// One prize tier.
    Prize {
        /// Tier number.
        tier: u8,
    },
    /// Top attendees by reputation.
    Leaderboard {
        /// Maximum rows.
        #[serde(default = "default_limit")]
        limit: usize,
    },
    /// Unclaimed winnings of an attendee.
    Redeemable {
        /// Attendee address.
        address: Address,
    },
}

fn default_limit() -> usize {
    DEFAULT_LEADERBOARD_LIMIT
}

/// One leaderboard row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    /// Attendee address.
    pub address: Address,
    /// Display name (empty until claimed).
    pub name: String,
    /// Reputation.
    pub rep: u64,
    /// Tier reached.
    pub tier: u8,
}

/// Query result.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum QueryResponse {
    /// An attendee record.
    Attendee(Attendee),
    /// Several attendee records.
    Attendees(Vec<Attendee>),
    /// A yes/no answer.
    Flag(bool),
    /// A scan record.
    Scan(Scan),
    /// Several scan records.
    Scans(Vec<Scan>),
    /// The prize table.
    Prizes(Vec<Prize>),
    /// One prize tier.
    Prize(Prize),
    /// Leaderboard rows.
    Leaderboard(Vec<LeaderboardEntry>),
    /// Unclaimed winnings.
    Redeemable(Vec<Win>),
}

/// Answer a query against the store.
pub fn query(store: &dyn StateStore, query: &Query) -> Result<QueryResponse, LedgerError> {
    match query {
        Query::Attendee { address } => attendee(store, address).map(QueryResponse::Attendee),
        Query::AttendeeById { id } => {
            attendee(store, &Address::from_external_id(id)).map(QueryResponse::Attendee)
        }
        Query::Keyed { id } => attendee(store, &Address::from_external_id(id))
            .map(|a| QueryResponse::Flag(a.is_keyed())),
        Query::Claimed { id } => attendee(store, &Address::from_external_id(id))
            .map(|a| QueryResponse::Flag(a.claimed)),
        Query::Scan { id } => keeper::get_scan(store, id)?
            .map(QueryResponse::Scan)
            .ok_or(LedgerError::ScanNotFound),
        Query::AttendeeScans { address } => scans_of(store, address).map(QueryResponse::Scans),
        Query::Attendees => keeper::all_attendees(store).map(QueryResponse::Attendees),
        Query::Prizes => keeper::all_prizes(store).map(QueryResponse::Prizes),
        Query::Prize { tier } => keeper::get_prize(store, *tier)?
            .map(QueryResponse::Prize)
            .ok_or(LedgerError::PrizeNotFound),
        Query::Leaderboard { limit } => leaderboard(store, *limit).map(QueryResponse::Leaderboard),
        Query::Redeemable { address } => {
            let a = attendee(store, address)?;
            Ok(QueryResponse::Redeemable(
                a.unclaimed_winnings().cloned().collect(),
            ))
        }
    }
}

fn attendee(store: &dyn StateStore, address: &Address) -> Result<Attendee, LedgerError> {
    keeper::get_attendee(store, address)?.ok_or(LedgerError::AttendeeNotFound)
}

/// Attendees by reputation descending, ties broken by address ascending.
pub fn leaderboard(store: &dyn StateStore, limit: usize) -> Result<Vec<LeaderboardEntry>, LedgerError> {
    let mut rows: Vec<LeaderboardEntry> = keeper::all_attendees(store)?
        .into_iter()
        .map(|a| LeaderboardEntry {
            address: a.address,
            name: a.name,
            rep: a.rep,
            tier: a.tier,
        })
        .collect();

    rows.sort_by(|a, b| b.rep.cmp(&a.rep).then_with(|| a.address.cmp(&b.address)));
    rows.truncate(limit);
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::keys::attendee_key;
    use crate::core::MemStore;

    fn store_with_reps(reps: &[(&str, u64)]) -> MemStore {
        let mut store = MemStore::new();
        for (id, rep) in reps {
            let mut attendee = Attendee::new(*id, "GA");
            attendee.rep = *rep;
            keeper::set_attendee(&mut store, &attendee).unwrap();
        }
        store
    }

    #[test]
    fn test_leaderboard_ordering() {
        let store = store_with_reps(&[("1", 3), ("2", 10), ("3", 3), ("4", 0)]);

        let rows = leaderboard(&store, 3).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].rep, 10);
        assert_eq!(rows[1].rep, 3);
        assert_eq!(rows[2].rep, 3);
        assert!(rows[1].address < rows[2].address);
    }

    #[test]
    fn test_flags_and_not_found() {
        let store = store_with_reps(&[("1", 0)]);

        assert_eq!(
            query(&store, &Query::Keyed { id: "1".into() }).unwrap(),
            QueryResponse::Flag(false)
        );
        assert_eq!(
            query(&store, &Query::Claimed { id: "1".into() }).unwrap(),
            QueryResponse::Flag(false)
        );
        assert_eq!(
            query(&store, &Query::AttendeeById { id: "2".into() }),
            Err(LedgerError::AttendeeNotFound)
        );
    }

    #[test]
    fn test_attendees_lists_everyone() {
        let store = store_with_reps(&[("1", 3), ("2", 10)]);

        let listed = match query(&store, &Query::Attendees).unwrap() {
            QueryResponse::Attendees(list) => list,
            other => panic!("unexpected response: {:?}", other),
        };
        assert_eq!(listed.len(), 2);
        assert!(listed[0].address < listed[1].address);

        let empty = MemStore::new();
        assert_eq!(
            query(&empty, &Query::Attendees).unwrap(),
            QueryResponse::Attendees(Vec::new())
        );
    }

    #[test]
    fn test_scan_lookup_ignores_other_key_classes() {
        let store = store_with_reps(&[("1", 0)]);
        let attendee_id = ScanId::from_hex(&hex::encode(attendee_key(&Address::from_external_id("1"))))
            .unwrap();

        // the attendee record exists under this key, but it is not a scan
        assert_eq!(
            query(&store, &Query::Scan { id: attendee_id }),
            Err(LedgerError::ScanNotFound)
        );

        let pair = ScanId::for_pair(&Address::from_external_id("1"), &Address::from_external_id("2"))
            .unwrap();
        assert_eq!(
            query(&store, &Query::Scan { id: pair }),
            Err(LedgerError::ScanNotFound)
        );
    }

    #[test]
    fn test_prize_by_tier() {
        let mut store = MemStore::new();
        let prize = Prize {
            tier: 1,
            rep_needed: 5,
            prize_text: "sticker".into(),
            quantity: 10,
        };
        keeper::set_prize(&mut store, &prize).unwrap();

        assert_eq!(
            query(&store, &Query::Prize { tier: 1 }).unwrap(),
            QueryResponse::Prize(prize)
        );
        assert_eq!(
            query(&store, &Query::Prize { tier: 9 }),
            Err(LedgerError::PrizeNotFound)
        );
    }

    #[test]
    fn test_query_json_shape() {
        let q: Query = serde_json::from_str(r#"{"path":"leaderboard"}"#).unwrap();
        assert_eq!(
            q,
            Query::Leaderboard {
                limit: DEFAULT_LEADERBOARD_LIMIT
            }
        );

        let json = serde_json::to_value(QueryResponse::Flag(true)).unwrap();
        assert_eq!(json["type"], "flag");
        assert_eq!(json["data"], true);
    }
}
