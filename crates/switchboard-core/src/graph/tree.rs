//! Hierarchical projection of the parent-pointer forest.
//!
//! # Overview
//!
//! Modules carry an optional `parent` key, forming a forest (multiple roots
//! allowed). This module derives the nested parent→children view used by
//! listings and admin surfaces, annotated with each node's `depth` (count
//! of ancestors) and `path` (dot-joined keys, root to leaf).
//!
//! The projection is read-only and independent of the dependency graph:
//! it is built from one ordered store read into an explicit children index,
//! then walked index-first rather than chasing parent pointers per node.

use anyhow::Result;
use rusqlite::Connection;
use serde::Serialize;
use std::collections::HashMap;

use crate::model::ModuleRecord;
use crate::store::query;

// ---------------------------------------------------------------------------
// Node types
// ---------------------------------------------------------------------------

/// A module with its computed position in the hierarchy and its children.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeNode {
    pub key: String,
    pub name: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub group: String,
    pub is_active: bool,
    pub is_system: bool,
    /// Count of ancestors; roots are 0.
    pub depth: usize,
    /// Dot-joined ancestor keys followed by the module's own key.
    pub path: String,
    pub metadata: Option<serde_json::Value>,
    pub children: Vec<TreeNode>,
}

/// A pre-order tree entry without the nested `children` field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlatNode {
    pub key: String,
    pub name: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub group: String,
    pub is_active: bool,
    pub is_system: bool,
    pub depth: usize,
    pub path: String,
    pub metadata: Option<serde_json::Value>,
}

// ---------------------------------------------------------------------------
// Building
// ---------------------------------------------------------------------------

/// Build the nested module tree.
///
/// Roots (modules without a parent) are selected first, optionally filtered
/// by `group`; children attach recursively. Both levels keep the store's
/// `sort_order`-then-`name` ordering.
pub fn build_tree(conn: &Connection, group: Option<&str>) -> Result<Vec<TreeNode>> {
    let modules = query::list_all(conn)?;
    Ok(build_from_records(&modules, group))
}

/// Pure tree construction over an already-loaded module list.
///
/// The list must be in listing order (`sort_order`, then `name`); the
/// children index preserves it.
pub fn build_from_records(modules: &[ModuleRecord], group: Option<&str>) -> Vec<TreeNode> {
    // key → indexes of direct children, in listing order.
    let mut children_of: HashMap<&str, Vec<usize>> = HashMap::new();
    for (index, module) in modules.iter().enumerate() {
        if let Some(parent) = module.parent.as_deref() {
            children_of.entry(parent).or_default().push(index);
        }
    }

    modules
        .iter()
        .filter(|module| module.is_root())
        .filter(|module| group.is_none_or(|g| module.group == g))
        .map(|module| attach(modules, &children_of, module, 0, ""))
        .collect()
}

fn attach(
    modules: &[ModuleRecord],
    children_of: &HashMap<&str, Vec<usize>>,
    module: &ModuleRecord,
    depth: usize,
    parent_path: &str,
) -> TreeNode {
    let path = if parent_path.is_empty() {
        module.key.clone()
    } else {
        format!("{parent_path}.{}", module.key)
    };

    let children = children_of
        .get(module.key.as_str())
        .into_iter()
        .flatten()
        .map(|&index| attach(modules, children_of, &modules[index], depth + 1, &path))
        .collect();

    TreeNode {
        key: module.key.clone(),
        name: module.name.clone(),
        description: module.description.clone(),
        icon: module.icon.clone(),
        group: module.group.clone(),
        is_active: module.is_active,
        is_system: module.is_system,
        depth,
        path,
        metadata: module.metadata.clone(),
        children,
    }
}

/// Flatten the tree into a pre-order sequence, dropping the nesting.
pub fn flatten(conn: &Connection, group: Option<&str>) -> Result<Vec<FlatNode>> {
    let tree = build_tree(conn, group)?;
    let mut flat = Vec::new();
    flatten_nodes(&tree, &mut flat);
    Ok(flat)
}

fn flatten_nodes(nodes: &[TreeNode], out: &mut Vec<FlatNode>) {
    for node in nodes {
        out.push(FlatNode {
            key: node.key.clone(),
            name: node.name.clone(),
            description: node.description.clone(),
            icon: node.icon.clone(),
            group: node.group.clone(),
            is_active: node.is_active,
            is_system: node.is_system,
            depth: node.depth,
            path: node.path.clone(),
            metadata: node.metadata.clone(),
        });
        flatten_nodes(&node.children, out);
    }
}

/// Sorted distinct non-empty group names, independent of hierarchy.
pub fn groups(conn: &Connection) -> Result<Vec<String>> {
    query::distinct_groups(conn)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
