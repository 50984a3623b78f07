//! Declarative bulk loading of module definitions.
//!
//! # Overview
//!
//! A TOML manifest declares modules, optionally nested:
//!
//! ```toml
//! [modules.shop]
//! name = "Shop"
//! group = "commerce"
//! on_deactivate = "cascade"
//!
//! [modules.shop.records.simple_product]
//! name = "Simple Product"
//! requires = ["shop"]
//! ```
//!
//! Nested `records` children inherit the parent's group (unless they set
//! their own) and get their `parent` assigned automatically. Definitions
//! are ordered so parents are upserted before children via an iterative
//! fixed point; entries whose declared parent never completes (a dangling
//! or self-referential forward reference) are skipped and reported. Edges
//! are authored after all definitions, tolerating and logging individual
//! failures rather than aborting; the run finishes with one cache
//! invalidation.
//!
//! Module-definition failures, by contrast, are fatal to the sync run.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

use crate::error::Result;
use crate::manager::{DefineOptions, ModuleManager};
use crate::model::{DeactivationPolicy, EdgeKind};

// ---------------------------------------------------------------------------
// Manifest types
// ---------------------------------------------------------------------------

/// One declared module, possibly carrying nested children.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModuleSpec {
    /// Display name; defaults to the key.
    pub name: Option<String>,
    pub description: Option<String>,
    pub group: Option<String>,
    pub icon: Option<String>,
    pub sort_order: i64,
    pub is_active: bool,
    pub is_system: bool,
    pub on_deactivate: Option<DeactivationPolicy>,
    pub metadata: Option<serde_json::Value>,
    pub parent: Option<String>,
    pub requires: Vec<String>,
    pub conflicts: Vec<String>,
    pub suggests: Vec<String>,
    /// Nested children: inherit this module's group, get `parent` set.
    pub records: BTreeMap<String, ModuleSpec>,
}

/// A full manifest file: `[modules.<key>]` tables.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncManifest {
    pub modules: BTreeMap<String, ModuleSpec>,
}

/// What a sync run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Keys upserted, in apply order.
    pub defined: Vec<String>,
    /// Keys skipped because their declared parent never completed.
    pub skipped: Vec<String>,
    /// Edges that failed to author, with the reason.
    pub edge_failures: Vec<EdgeFailure>,
}

/// A tolerated per-edge failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeFailure {
    pub module: String,
    pub target: String,
    pub kind: EdgeKind,
    pub reason: String,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load a manifest from a TOML file.
pub fn load_manifest(path: &Path) -> anyhow::Result<SyncManifest> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    toml::from_str::<SyncManifest>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

// ---------------------------------------------------------------------------
// Flattening
// ---------------------------------------------------------------------------

/// A flattened entry ready to define: the spec with nesting resolved.
#[derive(Debug, Clone)]
struct FlatEntry {
    key: String,
    spec: ModuleSpec,
}

/// Flatten nested `records` into a flat list, resolving group inheritance
/// and parent assignment.
fn flatten_specs(modules: &BTreeMap<String, ModuleSpec>) -> Vec<FlatEntry> {
    let mut flat = Vec::new();
    for (key, spec) in modules {
        flatten_one(key, spec, None, None, &mut flat);
    }
    flat
}

fn flatten_one(
    key: &str,
    spec: &ModuleSpec,
    inherited_group: Option<&str>,
    parent: Option<&str>,
    out: &mut Vec<FlatEntry>,
) {
    let mut resolved = spec.clone();
    resolved.records = BTreeMap::new();

    if resolved.group.is_none() {
        resolved.group = inherited_group.map(String::from);
    }
    if let Some(parent) = parent {
        resolved.parent = Some(parent.to_string());
    }

    let child_group = resolved.group.clone();
    out.push(FlatEntry {
        key: key.to_string(),
        spec: resolved,
    });

    for (child_key, child_spec) in &spec.records {
        flatten_one(child_key, child_spec, child_group.as_deref(), Some(key), out);
    }
}

/// Order entries so parents are defined before their children.
///
/// Iterative fixed point: repeatedly emit any not-yet-emitted entry whose
/// parent is absent from the manifest's key set or already emitted. Entries
/// whose parent never completes are returned as skipped.
fn order_by_parent(entries: Vec<FlatEntry>) -> (Vec<FlatEntry>, Vec<String>) {
    let key_set: HashSet<String> = entries.iter().map(|e| e.key.clone()).collect();
    let mut emitted: HashSet<String> = HashSet::new();
    let mut ordered: Vec<FlatEntry> = Vec::new();
    let mut pending: Vec<FlatEntry> = entries;

    loop {
        let mut progress = false;
        let mut still_pending = Vec::new();

        for entry in pending {
            let ready = match entry.spec.parent.as_deref() {
                None => true,
                Some(parent) => !key_set.contains(parent) || emitted.contains(parent),
            };
            if ready {
                emitted.insert(entry.key.clone());
                ordered.push(entry);
                progress = true;
            } else {
                still_pending.push(entry);
            }
        }

        if still_pending.is_empty() {
            return (ordered, Vec::new());
        }
        if !progress {
            let skipped = still_pending.into_iter().map(|e| e.key).collect();
            return (ordered, skipped);
        }
        pending = still_pending;
    }
}

// ---------------------------------------------------------------------------
// Sync
// ---------------------------------------------------------------------------

/// Apply a manifest to the registry.
///
/// Definitions are fatal on failure; edge authoring is tolerant (failures
/// are logged and reported). Finishes with one cache invalidation.
pub fn sync(manager: &mut ModuleManager, manifest: &SyncManifest) -> Result<SyncReport> {
    let flat = flatten_specs(&manifest.modules);
    let (ordered, skipped) = order_by_parent(flat);

    for key in &skipped {
        tracing::warn!(%key, "skipping module: declared parent never defined");
    }

    let mut report = SyncReport {
        skipped,
        ..SyncReport::default()
    };

    for entry in &ordered {
        let spec = &entry.spec;
        let name = spec.name.clone().unwrap_or_else(|| entry.key.clone());
        manager.define(
            &entry.key,
            &name,
            DefineOptions {
                description: spec.description.clone(),
                group: spec.group.clone(),
                icon: spec.icon.clone(),
                sort_order: spec.sort_order,
                is_active: spec.is_active,
                is_system: spec.is_system,
                on_deactivate: spec.on_deactivate,
                metadata: spec.metadata.clone(),
                parent: spec.parent.clone(),
            },
        )?;
        report.defined.push(entry.key.clone());
    }

    // Edges only after every definition exists, so forward references
    // inside the manifest resolve.
    for entry in &ordered {
        for target in &entry.spec.requires {
            author_edge(manager, &mut report, &entry.key, target, EdgeKind::Requires);
        }
        for target in &entry.spec.conflicts {
            author_edge(manager, &mut report, &entry.key, target, EdgeKind::Conflicts);
        }
        for target in &entry.spec.suggests {
            author_edge(manager, &mut report, &entry.key, target, EdgeKind::Suggests);
        }
    }

    manager.flush_cache();
    tracing::info!(
        defined = report.defined.len(),
        skipped = report.skipped.len(),
        edge_failures = report.edge_failures.len(),
        "module sync finished"
    );
    Ok(report)
}

fn author_edge(
    manager: &mut ModuleManager,
    report: &mut SyncReport,
    module: &str,
    target: &str,
    kind: EdgeKind,
) {
    let result = match kind {
        EdgeKind::Requires => manager.requires(module, target),
        EdgeKind::Conflicts => manager.conflicts(module, target),
        EdgeKind::Suggests => manager.suggests(module, target),
    };
    if let Err(e) = result {
        tracing::warn!(module, target, %kind, error = %e, "skipping edge");
        report.edge_failures.push(EdgeFailure {
            module: module.to_string(),
            target: target.to_string(),
            kind,
            reason: e.to_string(),
        });
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
