//! Shared data model: module records, edge kinds, and metadata documents.

pub mod metadata;
pub mod module;

pub use module::{
    DEFAULT_GROUP, DeactivationPolicy, EdgeKind, ModuleEdge, ModuleRecord, ParseEnumError,
};
