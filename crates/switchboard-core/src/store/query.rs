//! Typed read helpers for the registry database.
//!
//! All functions take a shared `&Connection` reference and return
//! `anyhow::Result<T>` with typed structs (never raw rows). Listings are
//! ordered by `sort_order`, ties broken by `name`.

use anyhow::{Context, Result};
use rusqlite::{Connection, Row, params};
use std::collections::HashMap;
use std::str::FromStr;

use crate::model::{DeactivationPolicy, EdgeKind, ModuleEdge, ModuleRecord};

const MODULE_COLUMNS: &str = "key, name, description, module_group, icon, sort_order, \
     is_active, is_system, on_deactivate, metadata, parent_key, created_at_us, updated_at_us";

const ORDERED: &str = "ORDER BY sort_order, name";

/// Which end of an edge the given module key sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeDirection {
    /// Edges authored by the module (`module → target`).
    Outgoing,
    /// Edges pointing at the module (`other → module`).
    Incoming,
}

fn row_to_module(row: &Row<'_>) -> rusqlite::Result<ModuleRecord> {
    let policy: String = row.get(8)?;
    let metadata: Option<String> = row.get(9)?;

    Ok(ModuleRecord {
        key: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        group: row.get(3)?,
        icon: row.get(4)?,
        sort_order: row.get(5)?,
        is_active: row.get(6)?,
        is_system: row.get(7)?,
        on_deactivate: DeactivationPolicy::from_str(&policy).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                8,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })?,
        metadata: metadata
            .map(|raw| {
                serde_json::from_str(&raw).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        9,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })
            })
            .transpose()?,
        parent: row.get(10)?,
        created_at_us: row.get(11)?,
        updated_at_us: row.get(12)?,
    })
}

fn row_to_edge(row: &Row<'_>) -> rusqlite::Result<ModuleEdge> {
    let kind: String = row.get(2)?;
    Ok(ModuleEdge {
        module: row.get(0)?,
        target: row.get(1)?,
        kind: EdgeKind::from_str(&kind).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
        })?,
        created_at_us: row.get(3)?,
    })
}

fn collect_modules(
    conn: &Connection,
    sql: &str,
    params: &[&dyn rusqlite::ToSql],
) -> Result<Vec<ModuleRecord>> {
    let mut stmt = conn
        .prepare(sql)
        .with_context(|| format!("prepare module query: {sql}"))?;
    let rows = stmt
        .query_map(params, row_to_module)
        .context("execute module query")?;

    let mut modules = Vec::new();
    for row in rows {
        modules.push(row.context("read module row")?);
    }
    Ok(modules)
}

/// Fetch a single module by exact key. Returns `None` if absent.
pub fn get_module(conn: &Connection, key: &str) -> Result<Option<ModuleRecord>> {
    let sql = format!("SELECT {MODULE_COLUMNS} FROM modules WHERE key = ?1");
    let mut stmt = conn.prepare(&sql).context("prepare get_module query")?;

    match stmt.query_row(params![key], row_to_module) {
        Ok(module) => Ok(Some(module)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e).context(format!("get_module for '{key}'")),
    }
}

/// Returns `true` if a module with the given key exists.
pub fn module_exists(conn: &Connection, key: &str) -> Result<bool> {
    let count: i64 = conn
        .query_row(
            "SELECT count(*) FROM modules WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .with_context(|| format!("module_exists for '{key}'"))?;
    Ok(count > 0)
}

/// List every module, ordered.
pub fn list_all(conn: &Connection) -> Result<Vec<ModuleRecord>> {
    let sql = format!("SELECT {MODULE_COLUMNS} FROM modules {ORDERED}");
    collect_modules(conn, &sql, params![])
}

/// List modules in a group, ordered.
pub fn list_group(conn: &Connection, group: &str) -> Result<Vec<ModuleRecord>> {
    let sql = format!("SELECT {MODULE_COLUMNS} FROM modules WHERE module_group = ?1 {ORDERED}");
    collect_modules(conn, &sql, params![group])
}

/// List root modules (no parent), ordered.
pub fn list_roots(conn: &Connection) -> Result<Vec<ModuleRecord>> {
    let sql = format!("SELECT {MODULE_COLUMNS} FROM modules WHERE parent_key IS NULL {ORDERED}");
    collect_modules(conn, &sql, params![])
}

/// List direct children of `parent_key`, ordered.
pub fn list_children(conn: &Connection, parent_key: &str) -> Result<Vec<ModuleRecord>> {
    let sql = format!("SELECT {MODULE_COLUMNS} FROM modules WHERE parent_key = ?1 {ORDERED}");
    collect_modules(conn, &sql, params![parent_key])
}

/// List edges touching `key`, optionally narrowed to one kind.
pub fn list_edges(
    conn: &Connection,
    key: &str,
    kind: Option<EdgeKind>,
    direction: EdgeDirection,
) -> Result<Vec<ModuleEdge>> {
    let anchor = match direction {
        EdgeDirection::Outgoing => "module_key",
        EdgeDirection::Incoming => "target_key",
    };

    let mut sql = format!(
        "SELECT module_key, target_key, edge_kind, created_at_us \
         FROM module_edges WHERE {anchor} = ?1"
    );
    if kind.is_some() {
        sql.push_str(" AND edge_kind = ?2");
    }
    sql.push_str(" ORDER BY module_key, target_key");

    let mut stmt = conn.prepare(&sql).context("prepare list_edges query")?;

    let rows = match kind {
        Some(kind) => stmt.query_map(params![key, kind.as_str()], row_to_edge),
        None => stmt.query_map(params![key], row_to_edge),
    }
    .context("execute list_edges query")?;

    let mut edges = Vec::new();
    for row in rows {
        edges.push(row.context("read edge row")?);
    }
    Ok(edges)
}

/// All edges in the registry, in stable order. Used to build graph snapshots.
pub fn all_edges(conn: &Connection) -> Result<Vec<ModuleEdge>> {
    let mut stmt = conn
        .prepare(
            "SELECT module_key, target_key, edge_kind, created_at_us \
             FROM module_edges ORDER BY module_key, target_key, edge_kind",
        )
        .context("prepare all_edges query")?;

    let rows = stmt
        .query_map([], row_to_edge)
        .context("execute all_edges query")?;

    let mut edges = Vec::new();
    for row in rows {
        edges.push(row.context("read edge row")?);
    }
    Ok(edges)
}

/// Map of every module key to its activation flag.
pub fn active_map(conn: &Connection) -> Result<HashMap<String, bool>> {
    let mut stmt = conn
        .prepare("SELECT key, is_active FROM modules")
        .context("prepare active_map query")?;

    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, bool>(1)?)))
        .context("execute active_map query")?;

    let mut map = HashMap::new();
    for row in rows {
        let (key, active) = row.context("read active_map row")?;
        map.insert(key, active);
    }
    Ok(map)
}

/// Sorted distinct non-empty group names across all modules.
pub fn distinct_groups(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare(
            "SELECT DISTINCT module_group FROM modules \
             WHERE length(trim(module_group)) > 0 ORDER BY module_group",
        )
        .context("prepare distinct_groups query")?;

    let rows = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .context("execute distinct_groups query")?;

    let mut groups = Vec::new();
    for row in rows {
        groups.push(row.context("read group row")?);
    }
    Ok(groups)
}
