// crates/trustchain-reputation/src/propagation.rs
//
// Computed trust: blends the direct trust T(i, j) with the weighted
// opinion of i's positive-trust neighbors about j.
//
// For a pair (i, j) with a direct edge:
//
//   N     = { k != j : T(i, k) > 0 }
//   iT    = sum_k T(i,k) * T(k,j) / sum_k T(i,k)      (0 if N is empty)
//   sigma = 1 / (1 + sqrt(sum_k (T(k,j) - iT)^2 / m))  (0 if m is 0)
//   mu    = m / (m + c)
//   alpha = (mu + sigma) / 4
//   C     = (1 - alpha) * T(i,j) + alpha * iT
//
// A missing T(k, j) counts as 0. How `m` is accumulated depends on
// `PathCountMode`: `Reference` adds each neighbor in both the mean
// pass and the spread pass.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use trustchain_core::{LedgerParams, PathCountMode, TrustchainError};
use trustchain_store::{LedgerState, TrustGraph};

/// The subset of ledger parameters the propagation formula depends on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PropagationParams {
    /// Smoothing constant `c` in `mu = m / (m + c)`.
    pub smoothing_constant: f64,
    /// How the neighbor count is accumulated.
    pub path_count: PathCountMode,
}

impl Default for PropagationParams {
    fn default() -> Self {
        Self {
            smoothing_constant: 1.0,
            path_count: PathCountMode::Reference,
        }
    }
}

impl From<&LedgerParams> for PropagationParams {
    fn from(params: &LedgerParams) -> Self {
        Self {
            smoothing_constant: params.smoothing_constant,
            path_count: params.path_count,
        }
    }
}

/// Compute C(i, j) from the current trust graph.
///
/// Returns 0 when there is no direct edge from `i` to `j`. Pure function of
/// the graph: nothing is written.
pub fn comp_trust(graph: &TrustGraph, address_i: &str, address_j: &str, params: &PropagationParams) -> f64 {
    let direct = match graph.get_trust(address_i, address_j) {
        Some(value) => value,
        None => return 0.0,
    };

    let neighbors: Vec<(&str, f64)> = graph
        .outgoing(address_i)
        .filter(|&(k, weight)| k != address_j && weight > 0.0)
        .collect();

    let mut m: usize = 0;
    let mut weight_sum = 0.0;
    let mut indirect = 0.0;
    for &(k, weight) in &neighbors {
        m += 1;
        weight_sum += weight;
        indirect += weight * graph.get_trust(k, address_j).unwrap_or(0.0);
    }
    if m > 0 {
        indirect /= weight_sum;
    }

    let mut spread = 0.0;
    for &(k, _) in &neighbors {
        if params.path_count == PathCountMode::Reference {
            m += 1;
        }
        let deviation = graph.get_trust(k, address_j).unwrap_or(0.0) - indirect;
        spread += deviation * deviation;
    }

    let m = m as f64;
    let mu = m / (m + params.smoothing_constant);
    let sigma = if m > 0.0 {
        1.0 / (1.0 + (spread / m).sqrt())
    } else {
        0.0
    };
    let alpha = (mu + sigma) / 4.0;

    (1.0 - alpha) * direct + alpha * indirect
}

/// Recompute C(i, j) for every ordered pair of distinct roster addresses
/// and write each value into the computed-trust store.
///
/// Pairs are evaluated in parallel against a read-only view of the graph,
/// then written sequentially. Returns the number of pairs written.
pub fn calculate_all_comp_trust(
    state: &mut LedgerState,
    params: &PropagationParams,
) -> Result<usize, TrustchainError> {
    let addresses = state.roster().addresses().to_vec();
    let n = addresses.len();

    let values: Vec<(usize, usize, f64)> = {
        let graph = state.graph();
        let addresses = &addresses;
        (0..n)
            .into_par_iter()
            .flat_map_iter(move |a| {
                (0..n).filter(move |&b| b != a).map(move |b| {
                    (a, b, comp_trust(graph, &addresses[a], &addresses[b], params))
                })
            })
            .collect()
    };

    for &(a, b, value) in &values {
        state.put_comp_trust(&addresses[a], &addresses[b], value)?;
    }

    debug!(
        addresses = n,
        pairs = values.len(),
        "Recomputed computed-trust store"
    );
    Ok(values.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    /// A->B 0.5, A->C 0.2, B->C 0.8.
    fn example_graph() -> TrustGraph {
        let mut graph = TrustGraph::new();
        graph.set_trust("A", "B", 0.5);
        graph.set_trust("A", "C", 0.2);
        graph.set_trust("B", "C", 0.8);
        graph
    }

    #[test]
    fn test_no_direct_edge_is_zero() {
        let graph = example_graph();
        let params = PropagationParams::default();
        assert_eq!(comp_trust(&graph, "C", "A", &params), 0.0);
        assert_eq!(comp_trust(&graph, "B", "A", &params), 0.0);
    }

    #[test]
    fn test_worked_example_reference_count() {
        // N = {B}, iT = 0.8, m = 2, sigma = 1, mu = 2/3, alpha = 5/12.
        // The commonly quoted 0.45005 comes from rounding mu to 0.6667.
        let graph = example_graph();
        let value = comp_trust(&graph, "A", "C", &PropagationParams::default());
        assert!((value - 0.45).abs() < EPS, "got {}", value);
        assert!((value - 0.45005).abs() < 1e-4);
    }

    #[test]
    fn test_worked_example_single_count() {
        // m = 1, mu = 1/2, alpha = 3/8.
        let graph = example_graph();
        let params = PropagationParams {
            path_count: PathCountMode::Single,
            ..PropagationParams::default()
        };
        let value = comp_trust(&graph, "A", "C", &params);
        assert!((value - 0.425).abs() < EPS, "got {}", value);
    }

    #[test]
    fn test_no_neighbors_returns_direct_trust() {
        // A->B only: N is empty, so alpha = 0 and C = T.
        let mut graph = TrustGraph::new();
        graph.set_trust("A", "B", -0.7);
        let value = comp_trust(&graph, "A", "B", &PropagationParams::default());
        assert!((value + 0.7).abs() < EPS);
    }

    #[test]
    fn test_non_positive_neighbors_are_ignored() {
        let mut graph = example_graph();
        graph.set_trust("A", "D", 0.0);
        graph.set_trust("A", "E", -0.4);
        graph.set_trust("D", "C", -1.0);
        graph.set_trust("E", "C", -1.0);
        let value = comp_trust(&graph, "A", "C", &PropagationParams::default());
        assert!((value - 0.45).abs() < EPS);
    }

    #[test]
    fn test_missing_neighbor_opinion_counts_as_zero() {
        // A->B 1.0, A->C 1.0, A->D 0.5 ; B->D 0.6 ; C has no opinion of D.
        let mut graph = TrustGraph::new();
        graph.set_trust("A", "B", 1.0);
        graph.set_trust("A", "C", 1.0);
        graph.set_trust("A", "D", 0.5);
        graph.set_trust("B", "D", 0.6);

        let params = PropagationParams {
            path_count: PathCountMode::Single,
            ..PropagationParams::default()
        };
        // iT = (0.6 + 0) / 2 = 0.3 ; spread = 0.09 + 0.09 ; sd = 0.3
        let indirect = 0.3;
        let sigma = 1.0 / 1.3;
        let mu = 2.0 / 3.0;
        let alpha = (mu + sigma) / 4.0;
        let expected = (1.0 - alpha) * 0.5 + alpha * indirect;
        let value = comp_trust(&graph, "A", "D", &params);
        assert!((value - expected).abs() < EPS);
    }

    #[test]
    fn test_smoothing_constant_changes_mu() {
        let graph = example_graph();
        let params = PropagationParams {
            smoothing_constant: 2.0,
            path_count: PathCountMode::Reference,
        };
        // mu = 2/4, alpha = 3/8 -> same as single-count with c = 1
        let value = comp_trust(&graph, "A", "C", &params);
        assert!((value - 0.425).abs() < EPS);
    }

    #[test]
    fn test_calculate_all_writes_every_ordered_pair() {
        let mut state = LedgerState::new();
        state.record_direct_trust("A", "B", 0.5).unwrap();
        state.record_direct_trust("A", "C", 0.2).unwrap();
        state.record_direct_trust("B", "C", 0.8).unwrap();

        let written = calculate_all_comp_trust(&mut state, &PropagationParams::default()).unwrap();
        assert_eq!(written, 6);
        assert_eq!(state.comp_trust_len(), 6);
        assert_eq!(state.comp_trust_value("A", "C").unwrap().unwrap(), "0.450000");
        // N = {C} and C has no opinion of B: iT = 0, alpha = 5/12
        assert_eq!(state.comp_trust_value("A", "B").unwrap().unwrap(), "0.291667");
        assert_eq!(state.comp_trust_value("C", "A").unwrap().unwrap(), "0.000000");
        assert_eq!(state.comp_trust_value("A", "A").unwrap(), None);
    }

    #[test]
    fn test_calculate_all_is_deterministic() {
        let build = || {
            let mut state = LedgerState::new();
            for (i, j, v) in [("A", "B", 0.3), ("B", "C", 0.9), ("A", "C", -0.1), ("C", "A", 0.4)] {
                state.record_direct_trust(i, j, v).unwrap();
            }
            calculate_all_comp_trust(&mut state, &PropagationParams::default()).unwrap();
            state.roots()
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn test_calculate_all_on_empty_roster() {
        let mut state = LedgerState::new();
        let written = calculate_all_comp_trust(&mut state, &PropagationParams::default()).unwrap();
        assert_eq!(written, 0);
    }
}
