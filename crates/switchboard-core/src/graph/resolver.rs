//! Activation and deactivation eligibility over a graph snapshot.
//!
//! # Overview
//!
//! Pure, side-effect-free decision logic. Every function takes a
//! [`GraphSnapshot`] and answers one question about one module; nothing here
//! mutates state, so callers can report issues, retry after external
//! changes, or feed the answers into the state machine's commit path.
//!
//! # Design
//!
//! - Eligibility checks compute **all** reasons at once (no short-circuit
//!   between missing dependencies and conflicts), so a caller can report
//!   every problem in a single round trip.
//! - Traversals run over the snapshot's explicit adjacency maps with
//!   visited-set guards, which tolerates diamonds without revisiting and
//!   keeps recursion bounded by the closure size.

use serde::Serialize;

use crate::model::DeactivationPolicy;

use super::snapshot::GraphSnapshot;

// ---------------------------------------------------------------------------
// Issue sets
// ---------------------------------------------------------------------------

/// Why a module cannot be activated right now.
///
/// Empty on both fields ⇒ activation is permitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActivationIssues {
    /// REQUIRES targets that are currently inactive.
    pub missing_dependencies: Vec<String>,
    /// CONFLICTS targets that are currently active.
    pub conflicts: Vec<String>,
}

impl ActivationIssues {
    /// Returns `true` if activation is permitted.
    pub fn is_clear(&self) -> bool {
        self.missing_dependencies.is_empty() && self.conflicts.is_empty()
    }
}

/// Why a module cannot be deactivated right now.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeactivationIssues {
    /// The module is a system module; nothing else matters.
    pub system_module: bool,
    /// Active dependents blocking a RESTRICT-policy deactivation.
    pub active_dependents: Vec<String>,
}

impl DeactivationIssues {
    /// Returns `true` if deactivation is permitted.
    pub fn is_clear(&self) -> bool {
        !self.system_module && self.active_dependents.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Direct queries
// ---------------------------------------------------------------------------

/// REQUIRES targets of `key` that are currently inactive.
pub fn missing_dependencies(snapshot: &GraphSnapshot, key: &str) -> Vec<String> {
    snapshot
        .requires_of(key)
        .filter(|target| !snapshot.is_active(target))
        .map(str::to_string)
        .collect()
}

/// CONFLICTS targets of `key` that are currently active.
pub fn active_conflicts(snapshot: &GraphSnapshot, key: &str) -> Vec<String> {
    snapshot
        .conflicts_of(key)
        .filter(|target| snapshot.is_active(target))
        .map(str::to_string)
        .collect()
}

/// Modules that REQUIRE `key` and are themselves active.
pub fn active_dependents(snapshot: &GraphSnapshot, key: &str) -> Vec<String> {
    snapshot
        .required_by_of(key)
        .filter(|dependent| snapshot.is_active(dependent))
        .map(str::to_string)
        .collect()
}

// ---------------------------------------------------------------------------
// Eligibility
// ---------------------------------------------------------------------------

/// Collect every reason `key` cannot be activated.
///
/// Both checks always run, even if the first already failed.
pub fn can_activate(snapshot: &GraphSnapshot, key: &str) -> ActivationIssues {
    ActivationIssues {
        missing_dependencies: missing_dependencies(snapshot, key),
        conflicts: active_conflicts(snapshot, key),
    }
}

/// Collect every reason `key` cannot be deactivated.
///
/// A system module short-circuits: the dependents check is skipped entirely.
/// Under `Cascade` or `None` the dependents check is not performed here —
/// cascades are computed separately by [`cascade_deactivations`].
pub fn can_deactivate(snapshot: &GraphSnapshot, key: &str) -> DeactivationIssues {
    if snapshot.is_system(key) {
        return DeactivationIssues {
            system_module: true,
            active_dependents: Vec::new(),
        };
    }

    let active_dependents = if snapshot.policy(key) == DeactivationPolicy::Restrict {
        active_dependents(snapshot, key)
    } else {
        Vec::new()
    };

    DeactivationIssues {
        system_module: false,
        active_dependents,
    }
}

// ---------------------------------------------------------------------------
// Traversals
// ---------------------------------------------------------------------------

/// How cascade results are ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CascadeOrder {
    /// Each dependent before its own dependents (collection order).
    TopDown,
    /// Each dependent after its own dependents (commit order).
    InnermostFirst,
}

/// Collect the modules a CASCADE deactivation of `key` would also turn off.
///
/// Walks active dependents depth-first, top-down: each active dependent is
/// collected, then its own active dependents, recursively. System modules
/// are never included (and never force-deactivated); the result is
/// de-duplicated by key. Returns an empty set unless `key`'s policy is
/// `Cascade`.
///
/// The state machine commits the same set via [`cascade_apply_order`].
pub fn cascade_deactivations(snapshot: &GraphSnapshot, key: &str) -> Vec<String> {
    cascade(snapshot, key, CascadeOrder::TopDown)
}

/// The cascade set of `key`, ordered innermost-first for the commit path:
/// every module appears after all of its own in-set active dependents, so
/// by the time a module flips none of its dependents remain active.
pub fn cascade_apply_order(snapshot: &GraphSnapshot, key: &str) -> Vec<String> {
    cascade(snapshot, key, CascadeOrder::InnermostFirst)
}

fn cascade(snapshot: &GraphSnapshot, key: &str, order: CascadeOrder) -> Vec<String> {
    if snapshot.policy(key) != DeactivationPolicy::Cascade {
        return Vec::new();
    }

    let mut collected = Vec::new();
    let mut seen = std::collections::HashSet::new();
    seen.insert(key.to_string());
    collect_cascade(snapshot, key, order, &mut seen, &mut collected);
    collected
}

fn collect_cascade(
    snapshot: &GraphSnapshot,
    key: &str,
    order: CascadeOrder,
    seen: &mut std::collections::HashSet<String>,
    collected: &mut Vec<String>,
) {
    for dependent in active_dependents(snapshot, key) {
        if snapshot.is_system(&dependent) {
            continue;
        }
        if !seen.insert(dependent.clone()) {
            continue;
        }
        if order == CascadeOrder::TopDown {
            collected.push(dependent.clone());
        }
        collect_cascade(snapshot, &dependent, order, seen, collected);
        if order == CascadeOrder::InnermostFirst {
            collected.push(dependent.clone());
        }
    }
}

/// Full transitive REQUIRES closure of `key`, depth-first, de-duplicated.
///
/// The visited guard tolerates diamonds; true cycles are excluded by
/// construction (edge insertion keeps the graph acyclic).
pub fn requires_closure(snapshot: &GraphSnapshot, key: &str) -> Vec<String> {
    let mut collected = Vec::new();
    let mut seen = std::collections::HashSet::new();
    seen.insert(key.to_string());
    collect_closure(snapshot, key, &mut seen, &mut collected);
    collected
}

fn collect_closure(
    snapshot: &GraphSnapshot,
    key: &str,
    seen: &mut std::collections::HashSet<String>,
    collected: &mut Vec<String>,
) {
    for target in snapshot.requires_of(key) {
        if !seen.insert(target.to_string()) {
            continue;
        }
        collected.push(target.to_string());
        collect_closure(snapshot, target, seen, collected);
    }
}

/// Diagnostic: active modules whose REQUIRES targets are inactive.
///
/// Deactivating a `None`-policy module with active dependents is permitted
/// and leaves exactly this kind of dangling requirement behind. Returns
/// `(module, inactive_target)` pairs in sorted order.
pub fn dangling_requirements(snapshot: &GraphSnapshot) -> Vec<(String, String)> {
    let mut dangling = Vec::new();
    for key in snapshot.keys() {
        if !snapshot.is_active(key) {
            continue;
        }
        for target in snapshot.requires_of(key) {
            if !snapshot.is_active(target) {
                dangling.push((key.to_string(), target.to_string()));
            }
        }
    }
    dangling
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
