//! Graph-level abstractions over the module registry.
//!
//! This module groups the read-only relational logic that operates across
//! many modules at once:
//!
//! - [`snapshot`] — immutable adjacency view of the dependency graph.
//! - [`resolver`] — activation/deactivation eligibility and cascades.
//! - [`cycles`] — acyclicity validation for REQUIRES edges.
//! - [`tree`] — hierarchical projection of the parent-pointer forest.

pub mod cycles;
pub mod resolver;
pub mod snapshot;
pub mod tree;

pub use snapshot::GraphSnapshot;
