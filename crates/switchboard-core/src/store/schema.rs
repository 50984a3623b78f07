//! Canonical SQLite schema for the module registry.
//!
//! The schema is normalized for queryability:
//! - `modules` keeps the aggregate fields for each module, including the
//!   parent pointer that drives the tree projection
//! - `module_edges` models the typed dependency graph; the composite
//!   primary key makes `(module, target, kind)` unique so re-linking the
//!   same pair is an upsert no-op

/// Migration v1: core tables.
pub const MIGRATION_V1_SQL: &str = r"
CREATE TABLE IF NOT EXISTS modules (
    key TEXT PRIMARY KEY CHECK (length(trim(key)) > 0),
    name TEXT NOT NULL,
    description TEXT,
    module_group TEXT NOT NULL DEFAULT 'general',
    icon TEXT,
    sort_order INTEGER NOT NULL DEFAULT 0,
    is_active INTEGER NOT NULL DEFAULT 0 CHECK (is_active IN (0, 1)),
    is_system INTEGER NOT NULL DEFAULT 0 CHECK (is_system IN (0, 1)),
    on_deactivate TEXT NOT NULL DEFAULT 'restrict'
        CHECK (on_deactivate IN ('cascade', 'restrict', 'none')),
    metadata TEXT,
    parent_key TEXT REFERENCES modules(key) ON DELETE SET NULL,
    created_at_us INTEGER NOT NULL,
    updated_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS module_edges (
    module_key TEXT NOT NULL REFERENCES modules(key) ON DELETE CASCADE,
    target_key TEXT NOT NULL REFERENCES modules(key) ON DELETE CASCADE,
    edge_kind TEXT NOT NULL CHECK (edge_kind IN ('requires', 'conflicts', 'suggests')),
    created_at_us INTEGER NOT NULL,
    PRIMARY KEY (module_key, target_key, edge_kind),
    CHECK (module_key <> target_key)
);
";

/// Migration v2: read-path indexes.
pub const MIGRATION_V2_SQL: &str = r"
CREATE INDEX IF NOT EXISTS idx_modules_group_order
    ON modules(module_group, sort_order, name);

CREATE INDEX IF NOT EXISTS idx_modules_parent
    ON modules(parent_key);

CREATE INDEX IF NOT EXISTS idx_module_edges_target_kind
    ON module_edges(target_key, edge_kind, module_key);
";
