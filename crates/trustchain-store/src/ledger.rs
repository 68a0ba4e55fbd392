// crates/trustchain-store/src/ledger.rs
//
// LedgerState: the current-tip ledger state, owned explicitly by the engine.
//
// Holds the three commitment stores (identity, direct trust, computed
// trust) plus the trust graph and address roster. The graph and roster are
// plain in-memory structures kept consistent with the direct-trust store:
// every direct-trust write goes through `record_direct_trust`.
//
// Key formats:
//   - direct trust:   `{i}{j}`  -> shortest decimal of the value
//   - computed trust: `{i}&{j}` -> value with six decimals

use std::fmt;

use trustchain_core::{CommitmentMap, IdentityRegistry, StateRoots, TrustchainError};

use crate::graph::TrustGraph;
use crate::identity::InMemoryIdentityRegistry;
use crate::merkle::MerkleMap;
use crate::roster::AddressRoster;

/// The mutable ledger state at the chain tip.
pub struct LedgerState {
    identity: Box<dyn IdentityRegistry>,
    direct_trust: Box<dyn CommitmentMap>,
    comp_trust: Box<dyn CommitmentMap>,
    graph: TrustGraph,
    roster: AddressRoster,
}

impl LedgerState {
    /// Create an empty, fully in-memory ledger state.
    pub fn new() -> Self {
        Self::with_stores(
            Box::new(InMemoryIdentityRegistry::new()),
            Box::new(MerkleMap::new()),
            Box::new(MerkleMap::new()),
        )
    }

    /// Create a ledger state over caller-provided stores (e.g. disk-backed).
    pub fn with_stores(
        identity: Box<dyn IdentityRegistry>,
        direct_trust: Box<dyn CommitmentMap>,
        comp_trust: Box<dyn CommitmentMap>,
    ) -> Self {
        Self {
            identity,
            direct_trust,
            comp_trust,
            graph: TrustGraph::new(),
            roster: AddressRoster::new(),
        }
    }

    /// Build the direct-trust store key: `{i}{j}`.
    pub fn direct_trust_key(address_i: &str, address_j: &str) -> Vec<u8> {
        format!("{}{}", address_i, address_j).into_bytes()
    }

    /// Build the computed-trust store key: `{i}&{j}`.
    pub fn comp_trust_key(address_i: &str, address_j: &str) -> Vec<u8> {
        format!("{}&{}", address_i, address_j).into_bytes()
    }

    /// Current roots of the three commitment stores.
    pub fn roots(&self) -> StateRoots {
        StateRoots {
            pki: self.identity.root(),
            direct_trust: self.direct_trust.root(),
            comp_trust: self.comp_trust.root(),
        }
    }

    /// Read access to the identity registry.
    pub fn identity(&self) -> &dyn IdentityRegistry {
        self.identity.as_ref()
    }

    /// Write access to the identity registry, for registration workflows.
    pub fn identity_mut(&mut self) -> &mut dyn IdentityRegistry {
        self.identity.as_mut()
    }

    /// The trust graph (authoritative direct trust).
    pub fn graph(&self) -> &TrustGraph {
        &self.graph
    }

    /// The address roster.
    pub fn roster(&self) -> &AddressRoster {
        &self.roster
    }

    /// Record T(i, j) = value in the direct-trust store, the graph, and the roster.
    ///
    /// The store write happens first so a failing backend leaves the
    /// in-memory structures untouched.
    pub fn record_direct_trust(
        &mut self,
        address_i: &str,
        address_j: &str,
        value: f64,
    ) -> Result<(), TrustchainError> {
        self.direct_trust.put(
            &Self::direct_trust_key(address_i, address_j),
            value.to_string().as_bytes(),
        )?;
        self.graph.set_trust(address_i, address_j, value);
        self.roster.insert(address_i);
        self.roster.insert(address_j);
        Ok(())
    }

    /// The stored direct-trust string for (i, j), if any.
    pub fn direct_trust_value(
        &self,
        address_i: &str,
        address_j: &str,
    ) -> Result<Option<String>, TrustchainError> {
        let raw = self
            .direct_trust
            .get(&Self::direct_trust_key(address_i, address_j))?;
        raw.map(decode_utf8).transpose()
    }

    /// Store a computed-trust value for (i, j), formatted to six decimals.
    pub fn put_comp_trust(
        &mut self,
        address_i: &str,
        address_j: &str,
        value: f64,
    ) -> Result<(), TrustchainError> {
        self.comp_trust.put(
            &Self::comp_trust_key(address_i, address_j),
            format!("{:.6}", value).as_bytes(),
        )
    }

    /// The last bulk-computed trust string for (i, j), if any.
    pub fn comp_trust_value(
        &self,
        address_i: &str,
        address_j: &str,
    ) -> Result<Option<String>, TrustchainError> {
        let raw = self
            .comp_trust
            .get(&Self::comp_trust_key(address_i, address_j))?;
        raw.map(decode_utf8).transpose()
    }

    /// Number of entries in the computed-trust store.
    pub fn comp_trust_len(&self) -> usize {
        self.comp_trust.len()
    }
}

fn decode_utf8(bytes: Vec<u8>) -> Result<String, TrustchainError> {
    String::from_utf8(bytes)
        .map_err(|e| TrustchainError::Storage(format!("stored value is not UTF-8: {}", e)))
}

impl Default for LedgerState {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for LedgerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LedgerState")
            .field("roots", &self.roots())
            .field("edges", &self.graph.edge_count())
            .field("roster", &self.roster.len())
            .finish()
    }
}
