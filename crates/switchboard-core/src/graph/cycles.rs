//! Acyclicity validation for REQUIRES edges.
//!
//! # Overview
//!
//! REQUIRES edges form a directed graph that must never contain a cycle: a
//! cycle would make the modules in the loop impossible to ever activate
//! (each waits on another). Validation runs **before** an edge is persisted
//! — the graph is kept acyclic at all times, never merely detected after
//! the fact — which is why edge insertion must be serialized with other
//! edge insertions on the same graph.
//!
//! # Design
//!
//! - **DFS-based**: walk the candidate dependency's REQUIRES closure looking
//!   for a path back to the source module. Finding one means the new edge
//!   would close a cycle.
//! - **Chain diagnostics**: the error carries the full chain of keys walked,
//!   in traversal order (`module, candidate, …, module`), for display.
//! - **O(V+E)**: a visited set guards against re-walking diamond joins, so
//!   each node and edge is visited at most once.

use std::fmt;

use super::snapshot::GraphSnapshot;

// ---------------------------------------------------------------------------
// CycleError
// ---------------------------------------------------------------------------

/// Error raised when a candidate REQUIRES edge would close a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleError {
    /// The ordered chain of keys walked, starting and ending at the module
    /// whose edge was being inserted. For example, inserting `c requires a`
    /// over `a → b → c` yields `["c", "a", "b", "c"]`.
    pub chain: Vec<String>,
}

impl CycleError {
    /// Number of distinct modules in the cycle (chain length minus the
    /// repeated endpoint).
    pub fn cycle_len(&self) -> usize {
        self.chain.len().saturating_sub(1)
    }

    /// Returns `true` if the module would require itself.
    pub fn is_self_requirement(&self) -> bool {
        self.cycle_len() == 1
    }
}

impl fmt::Display for CycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_self_requirement() {
            write!(
                f,
                "circular dependency: '{}' cannot require itself",
                self.chain.first().map_or("?", String::as_str)
            )
        } else {
            write!(
                f,
                "circular dependency detected ({} modules): {}",
                self.cycle_len(),
                self.chain.join(" → ")
            )
        }
    }
}

impl std::error::Error for CycleError {}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate that inserting the REQUIRES edge `module → candidate` keeps the
/// graph acyclic.
///
/// Walks `candidate`'s existing REQUIRES closure; if the walk reaches
/// `module` again, the edge would close a cycle and the full walked chain
/// is returned as the error.
///
/// # Complexity
///
/// O(V+E) over the REQUIRES subgraph — each node is visited at most once.
pub fn ensure_acyclic(
    snapshot: &GraphSnapshot,
    module: &str,
    candidate: &str,
) -> Result<(), CycleError> {
    let mut chain = vec![module.to_string()];

    if candidate == module {
        chain.push(candidate.to_string());
        return Err(CycleError { chain });
    }

    let mut visited = std::collections::HashSet::new();
    walk(snapshot, module, candidate, &mut visited, &mut chain)
}

fn walk(
    snapshot: &GraphSnapshot,
    module: &str,
    current: &str,
    visited: &mut std::collections::HashSet<String>,
    chain: &mut Vec<String>,
) -> Result<(), CycleError> {
    chain.push(current.to_string());

    if current == module {
        return Err(CycleError {
            chain: chain.clone(),
        });
    }

    if !visited.insert(current.to_string()) {
        // Diamond join: this subtree was already cleared.
        chain.pop();
        return Ok(());
    }

    for next in snapshot.requires_of(current) {
        walk(snapshot, module, next, visited, chain)?;
    }

    chain.pop();
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::snapshot::testkit::snapshot;
    use crate::model::{DeactivationPolicy, EdgeKind};

    const RESTRICT: DeactivationPolicy = DeactivationPolicy::Restrict;

    fn requires_graph(edges: &[(&str, &str)]) -> GraphSnapshot {
        let mut keys: Vec<&str> = Vec::new();
        for &(from, to) in edges {
            if !keys.contains(&from) {
                keys.push(from);
            }
            if !keys.contains(&to) {
                keys.push(to);
            }
        }
        let modules: Vec<(&str, bool, bool, DeactivationPolicy)> =
            keys.into_iter().map(|k| (k, false, false, RESTRICT)).collect();
        let typed: Vec<(&str, &str, EdgeKind)> = edges
            .iter()
            .map(|(from, to)| (*from, *to, EdgeKind::Requires))
            .collect();
        snapshot(&modules, &typed)
    }

    #[test]
    fn self_requirement_rejected() {
        let snap = requires_graph(&[]);
        let err = ensure_acyclic(&snap, "a", "a").unwrap_err();
        assert!(err.is_self_requirement());
        assert_eq!(err.chain, ["a", "a"]);
        assert!(err.to_string().contains("itself"));
    }

    #[test]
    fn two_module_cycle_rejected() {
        // a requires b; inserting b requires a closes the loop.
        let snap = requires_graph(&[("a", "b")]);
        let err = ensure_acyclic(&snap, "b", "a").unwrap_err();
        assert_eq!(err.chain, ["b", "a", "b"]);
        assert_eq!(err.cycle_len(), 2);
    }

    #[test]
    fn three_module_cycle_chain_in_traversal_order() {
        // a requires b, b requires c; inserting c requires a.
        let snap = requires_graph(&[("a", "b"), ("b", "c")]);
        let err = ensure_acyclic(&snap, "c", "a").unwrap_err();
        assert_eq!(err.chain, ["c", "a", "b", "c"]);
        assert!(err.to_string().contains("c → a → b → c"), "{err}");
    }

    #[test]
    fn acyclic_insert_is_accepted() {
        let snap = requires_graph(&[("a", "b"), ("b", "c")]);
        assert!(ensure_acyclic(&snap, "d", "a").is_ok());
        assert!(ensure_acyclic(&snap, "a", "c").is_ok());
    }

    #[test]
    fn diamond_is_not_a_cycle() {
        let snap = requires_graph(&[("a", "b"), ("a", "c"), ("b", "d"), ("c", "d")]);
        assert!(ensure_acyclic(&snap, "e", "a").is_ok());
    }

    #[test]
    fn cycle_behind_a_diamond_is_still_found() {
        // d is reachable twice; the cycle closes through e.
        let snap = requires_graph(&[("a", "b"), ("a", "c"), ("b", "d"), ("c", "d"), ("d", "e")]);
        let err = ensure_acyclic(&snap, "e", "a").unwrap_err();
        assert_eq!(err.chain.first().map(String::as_str), Some("e"));
        assert_eq!(err.chain.last().map(String::as_str), Some("e"));
        assert!(err.chain.len() >= 4);
    }

    #[test]
    fn disconnected_subgraphs_do_not_interfere() {
        let snap = requires_graph(&[("x", "y"), ("a", "b")]);
        assert!(ensure_acyclic(&snap, "x", "a").is_ok());
        let err = ensure_acyclic(&snap, "b", "a").unwrap_err();
        assert_eq!(err.chain, ["b", "a", "b"]);
    }

    #[test]
    fn long_chain_cycle_reports_every_hop() {
        let names: Vec<String> = (0..20).map(|i| format!("m{i:02}")).collect();
        let edges: Vec<(&str, &str)> = names
            .windows(2)
            .map(|pair| (pair[0].as_str(), pair[1].as_str()))
            .collect();
        let snap = requires_graph(&edges);

        // Closing the chain end-to-start walks all 20 modules.
        let err = ensure_acyclic(&snap, names[19].as_str(), names[0].as_str()).unwrap_err();
        assert_eq!(err.cycle_len(), 20);
    }

    #[test]
    fn existing_duplicate_edge_is_not_a_cycle() {
        let snap = requires_graph(&[("a", "b")]);
        assert!(ensure_acyclic(&snap, "a", "b").is_ok());
    }
}
