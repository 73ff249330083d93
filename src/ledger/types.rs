//! Ledger Records
//!
//! Plain data stored under the key schema. Records are bincode-encoded
//! in the store and JSON-encoded on the wire.

use serde::{Deserialize, Serialize};

use crate::core::address::hex_vec;
use crate::core::{Address, Commitment, PairError, PublicKey, ScanId};

/// A ledger account: the unit that signs and sequences transactions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Account address.
    pub address: Address,
    /// Number assigned at creation, bound into every signature.
    pub account_number: u64,
    /// Next expected transaction sequence.
    pub sequence: u64,
    /// Key currently authorized to sign for the account.
    pub pub_key: Option<PublicKey>,
}

impl Account {
    /// Create an account with sequence zero.
    pub fn new(address: Address, account_number: u64, pub_key: Option<PublicKey>) -> Self {
        Self {
            address,
            account_number,
            sequence: 0,
            pub_key,
        }
    }
}

/// An event attendee.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attendee {
    /// Ledger address, derived from the ticket id at genesis.
    pub address: Address,
    /// External ticket id (the value encoded in the attendee's QR code).
    pub id: String,
    /// Ticket class from the roster.
    pub ticket_class: String,
    /// Display name, set on claim.
    pub name: String,
    /// Verification key, present once keyed.
    pub pub_key: Option<PublicKey>,
    /// Outstanding commitment, present only while keyed and unclaimed.
    pub commitment: Option<Commitment>,
    /// Whether the attendee has claimed their account.
    pub claimed: bool,
    /// Reputation points. Never decreases.
    pub rep: u64,
    /// Highest prize tier reached.
    pub tier: u8,
    /// RSA public key used by peers to encrypt shared info.
    pub rsa_public_key: String,
    /// Attendee's own profile, encrypted client-side.
    #[serde(with = "hex_vec")]
    pub encrypted_info: Vec<u8>,
    /// Scans this attendee participates in.
    pub scan_ids: Vec<ScanId>,
    /// Prizes won, in tier order.
    pub winnings: Vec<Win>,
}

impl Attendee {
    /// Create a roster attendee from their ticket id.
    pub fn new(id: impl Into<String>, ticket_class: impl Into<String>) -> Self {
        let id = id.into();
        let mut attendee = Self::with_address(Address::from_external_id(&id));
        attendee.id = id;
        attendee.ticket_class = ticket_class.into();
        attendee
    }

    /// Create a bare attendee record for an address.
    pub fn with_address(address: Address) -> Self {
        Self {
            address,
            id: String::new(),
            ticket_class: String::new(),
            name: String::new(),
            pub_key: None,
            commitment: None,
            claimed: false,
            rep: 0,
            tier: 0,
            rsa_public_key: String::new(),
            encrypted_info: Vec::new(),
            scan_ids: Vec::new(),
            winnings: Vec::new(),
        }
    }

    /// Whether a public key has been installed.
    pub fn is_keyed(&self) -> bool {
        self.pub_key.is_some()
    }

    /// Add reputation points, saturating.
    pub fn add_rep(&mut self, points: u64) {
        self.rep = self.rep.saturating_add(points);
    }

    /// Record participation in a scan. Returns false if already present.
    pub fn add_scan_id(&mut self, id: &ScanId) -> bool {
        if self.scan_ids.contains(id) {
            return false;
        }
        self.scan_ids.push(id.clone());
        true
    }

    /// Winnings not yet collected.
    pub fn unclaimed_winnings(&self) -> impl Iterator<Item = &Win> {
        self.winnings.iter().filter(|w| !w.claimed)
    }
}

/// The interaction record between two attendees.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scan {
    /// Canonical pair id.
    pub id: ScanId,
    /// Attendee who scanned first.
    pub s1: Address,
    /// The other attendee.
    pub s2: Address,
    /// Data shared by `s1`.
    #[serde(with = "hex_vec")]
    pub d1: Vec<u8>,
    /// Data shared by `s2`.
    #[serde(with = "hex_vec")]
    pub d2: Vec<u8>,
    /// Points earned by `s1` through this scan.
    pub p1: u64,
    /// Points earned by `s2` through this scan.
    pub p2: u64,
    /// Block time of the first scan.
    pub unix_time_sec: i64,
}

impl Scan {
    /// Create the record for a first scan by `s1` of `s2`.
    pub fn new(s1: Address, s2: Address, unix_time_sec: i64) -> Result<Self, PairError> {
        let id = ScanId::for_pair(&s1, &s2)?;
        Ok(Self {
            id,
            s1,
            s2,
            d1: Vec::new(),
            d2: Vec::new(),
            p1: 0,
            p2: 0,
            unix_time_sec,
        })
    }

    /// Credit both sides.
    pub fn add_points(&mut self, p1: u64, p2: u64) {
        self.p1 = self.p1.saturating_add(p1);
        self.p2 = self.p2.saturating_add(p2);
    }

    /// The data slot and point counter belonging to `address`.
    ///
    /// Anything other than `s1` maps to the `s2` side.
    pub fn side_mut(&mut self, address: &Address) -> (&mut Vec<u8>, &mut u64) {
        if self.s1 == *address {
            (&mut self.d1, &mut self.p1)
        } else {
            (&mut self.d2, &mut self.p2)
        }
    }
}

/// A prize tier.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prize {
    /// Tier number, starting at 1.
    pub tier: u8,
    /// Reputation needed to reach the tier.
    pub rep_needed: u64,
    /// What the tier awards.
    pub prize_text: String,
    /// Units left to give away.
    pub quantity: u32,
}

/// A prize awarded to an attendee.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Win {
    /// Tier the prize belongs to.
    pub tier: u8,
    /// Prize description.
    pub name: String,
    /// Whether the prize was collected at the booth.
    pub claimed: bool,
}
