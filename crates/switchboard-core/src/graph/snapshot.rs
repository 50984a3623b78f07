//! Immutable adjacency snapshot of the dependency graph.
//!
//! # Overview
//!
//! The resolver never touches the store directly: a [`GraphSnapshot`] is
//! materialized once per operation and all eligibility checks, cascade
//! collection, and cycle validation run against it. The snapshot is
//! immutable once built — load it again after any mutation.
//!
//! Neighbor sets are `BTreeSet`s so traversal order (and therefore every
//! reported key list and cycle chain) is deterministic.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::Result;
use rusqlite::Connection;

use crate::model::{DeactivationPolicy, EdgeKind, ModuleRecord};
use crate::store::query;

/// A point-in-time view of modules and their typed edges.
#[derive(Debug, Clone, Default)]
pub struct GraphSnapshot {
    /// module → REQUIRES targets.
    requires: BTreeMap<String, BTreeSet<String>>,
    /// target → modules that REQUIRE it (reverse adjacency).
    required_by: BTreeMap<String, BTreeSet<String>>,
    /// module → CONFLICTS targets (stored symmetrically by the writer).
    conflicts: BTreeMap<String, BTreeSet<String>>,
    active: BTreeSet<String>,
    system: BTreeSet<String>,
    policies: BTreeMap<String, DeactivationPolicy>,
    keys: BTreeSet<String>,
}

impl GraphSnapshot {
    /// Load a snapshot from the store in two queries.
    pub fn load(conn: &Connection) -> Result<Self> {
        let modules = query::list_all(conn)?;
        let edges = query::all_edges(conn)?;
        let edges: Vec<(String, String, EdgeKind)> = edges
            .into_iter()
            .map(|e| (e.module, e.target, e.kind))
            .collect();
        Ok(Self::from_parts(&modules, &edges))
    }

    /// Build a snapshot from in-memory parts. Primarily for tests.
    pub fn from_parts(modules: &[ModuleRecord], edges: &[(String, String, EdgeKind)]) -> Self {
        let mut snapshot = Self::default();

        for module in modules {
            snapshot.keys.insert(module.key.clone());
            if module.is_active {
                snapshot.active.insert(module.key.clone());
            }
            if module.is_system {
                snapshot.system.insert(module.key.clone());
            }
            snapshot
                .policies
                .insert(module.key.clone(), module.on_deactivate);
        }

        for (module, target, kind) in edges {
            match kind {
                EdgeKind::Requires => {
                    snapshot
                        .requires
                        .entry(module.clone())
                        .or_default()
                        .insert(target.clone());
                    snapshot
                        .required_by
                        .entry(target.clone())
                        .or_default()
                        .insert(module.clone());
                }
                EdgeKind::Conflicts => {
                    snapshot
                        .conflicts
                        .entry(module.clone())
                        .or_default()
                        .insert(target.clone());
                }
                EdgeKind::Suggests => {} // advisory only, never consulted
            }
        }

        snapshot
    }

    /// Returns `true` if the key exists in the snapshot.
    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    pub fn is_active(&self, key: &str) -> bool {
        self.active.contains(key)
    }

    pub fn is_system(&self, key: &str) -> bool {
        self.system.contains(key)
    }

    /// Deactivation policy for a key; defaults for unknown keys.
    pub fn policy(&self, key: &str) -> DeactivationPolicy {
        self.policies
            .get(key)
            .copied()
            .unwrap_or_default()
    }

    /// Direct REQUIRES targets of `key`, in sorted order.
    pub fn requires_of(&self, key: &str) -> impl Iterator<Item = &str> {
        self.requires
            .get(key)
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    /// Modules holding a REQUIRES edge to `key`, in sorted order.
    pub fn required_by_of(&self, key: &str) -> impl Iterator<Item = &str> {
        self.required_by
            .get(key)
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    /// Direct CONFLICTS targets of `key`, in sorted order.
    pub fn conflicts_of(&self, key: &str) -> impl Iterator<Item = &str> {
        self.conflicts
            .get(key)
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    /// All known module keys, in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    /// Number of modules in the snapshot.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns `true` if the snapshot has no modules.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
