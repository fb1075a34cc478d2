//! Diff remote listings against local state.

use std::collections::HashSet;

use crate::catalog::Listing;
use crate::lock::{LockState, RejectionLedger};

/// Listings split by what has to happen to them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    pub listed: usize,
    pub known: usize,
    pub rejected: usize,
    /// Absent from both the lock state and the ledger; each listed once.
    pub pending: Vec<Listing>,
}

/// Keep only listings with no lock entry and no recorded rejection.
/// Duplicate (version, build) pairs in the listing are scheduled once.
pub fn plan(listings: Vec<Listing>, state: &LockState, ledger: &RejectionLedger) -> Plan {
    let mut out = Plan {
        listed: listings.len(),
        ..Plan::default()
    };
    let mut seen = HashSet::new();
    for listing in listings {
        if state.contains(&listing.version, &listing.build) {
            out.known += 1;
        } else if ledger.contains(&listing.version, &listing.build) {
            out.rejected += 1;
        } else if seen.insert((listing.version.clone(), listing.build.clone())) {
            out.pending.push(listing);
        }
    }
    out
}
