// crates/trustchain-store/src/roster.rs
//
// Address roster: every address that has appeared as truster or trustee in
// an accepted submission, in first-seen order, each exactly once.

use std::collections::HashSet;

/// Insertion-ordered, de-duplicated set of addresses.
///
/// Order drives the pairwise recomputation pass; membership is a hash-set
/// lookup so `insert` stays O(1) as the roster grows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressRoster {
    order: Vec<String>,
    members: HashSet<String>,
}

impl AddressRoster {
    /// Create an empty roster.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an address if it is not already present.
    ///
    /// Returns `true` if the address was newly added.
    pub fn insert(&mut self, address: &str) -> bool {
        if self.members.contains(address) {
            return false;
        }
        self.members.insert(address.to_string());
        self.order.push(address.to_string());
        true
    }

    /// Whether the address is in the roster.
    pub fn contains(&self, address: &str) -> bool {
        self.members.contains(address)
    }

    /// Addresses in first-seen order.
    pub fn addresses(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
