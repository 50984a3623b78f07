//! Write helpers for the registry database.
//!
//! All helpers take a shared `&Connection` so callers can group them inside
//! a transaction; the cascade path in the state machine relies on this to
//! flip several modules as one unit of work.

use anyhow::{Context, Result};
use rusqlite::{Connection, params};

use crate::model::{DEFAULT_GROUP, DeactivationPolicy, EdgeKind, ModuleRecord};
use crate::store::query;

/// The definable fields of a module, as accepted by the `define` upsert.
///
/// `is_active` is honored on first insert only: the activation flag is
/// owned by the state machine and a repeated define never touches it.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleFields {
    pub name: String,
    pub description: Option<String>,
    pub group: String,
    pub icon: Option<String>,
    pub sort_order: i64,
    pub is_active: bool,
    pub is_system: bool,
    pub on_deactivate: DeactivationPolicy,
    pub metadata: Option<serde_json::Value>,
    pub parent: Option<String>,
}

impl Default for ModuleFields {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: None,
            group: DEFAULT_GROUP.to_string(),
            icon: None,
            sort_order: 0,
            is_active: false,
            is_system: false,
            on_deactivate: DeactivationPolicy::default(),
            metadata: None,
            parent: None,
        }
    }
}

/// Idempotent module upsert keyed by `key`. Returns the stored record.
///
/// On conflict every definable field is replaced except `is_active` and
/// `created_at_us`.
pub fn upsert_module(
    conn: &Connection,
    key: &str,
    fields: &ModuleFields,
    now_us: i64,
) -> Result<ModuleRecord> {
    let metadata = fields
        .metadata
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .context("serialize module metadata")?;

    conn.execute(
        "INSERT INTO modules (key, name, description, module_group, icon, sort_order, \
             is_active, is_system, on_deactivate, metadata, parent_key, \
             created_at_us, updated_at_us) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12) \
         ON CONFLICT(key) DO UPDATE SET \
             name = excluded.name, \
             description = excluded.description, \
             module_group = excluded.module_group, \
             icon = excluded.icon, \
             sort_order = excluded.sort_order, \
             is_system = excluded.is_system, \
             on_deactivate = excluded.on_deactivate, \
             metadata = excluded.metadata, \
             parent_key = excluded.parent_key, \
             updated_at_us = excluded.updated_at_us",
        params![
            key,
            fields.name,
            fields.description,
            fields.group,
            fields.icon,
            fields.sort_order,
            fields.is_active,
            fields.is_system,
            fields.on_deactivate.to_string(),
            metadata,
            fields.parent,
            now_us,
        ],
    )
    .with_context(|| format!("upsert module '{key}'"))?;

    query::get_module(conn, key)?
        .with_context(|| format!("module '{key}' vanished after upsert"))
}

/// Flip a module's activation flag.
pub fn set_active(conn: &Connection, key: &str, active: bool, now_us: i64) -> Result<()> {
    let changed = conn
        .execute(
            "UPDATE modules SET is_active = ?2, updated_at_us = ?3 WHERE key = ?1",
            params![key, active, now_us],
        )
        .with_context(|| format!("set_active for '{key}'"))?;
    anyhow::ensure!(changed == 1, "set_active touched {changed} rows for '{key}'");
    Ok(())
}

/// Replace a module's metadata document.
pub fn update_metadata(
    conn: &Connection,
    key: &str,
    metadata: Option<&serde_json::Value>,
    now_us: i64,
) -> Result<()> {
    let raw = metadata
        .map(serde_json::to_string)
        .transpose()
        .context("serialize module metadata")?;
    let changed = conn
        .execute(
            "UPDATE modules SET metadata = ?2, updated_at_us = ?3 WHERE key = ?1",
            params![key, raw, now_us],
        )
        .with_context(|| format!("update_metadata for '{key}'"))?;
    anyhow::ensure!(changed == 1, "update_metadata touched {changed} rows for '{key}'");
    Ok(())
}

/// Upsert a typed edge. Re-linking the same `(module, target, kind)` is a
/// no-op; edges are never updated in place.
pub fn upsert_edge(
    conn: &Connection,
    module: &str,
    target: &str,
    kind: EdgeKind,
    now_us: i64,
) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO module_edges (module_key, target_key, edge_kind, created_at_us) \
         VALUES (?1, ?2, ?3, ?4)",
        params![module, target, kind.as_str(), now_us],
    )
    .with_context(|| format!("upsert {kind} edge '{module}' → '{target}'"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store;
    use serde_json::json;

    #[test]
    fn define_upsert_is_idempotent_and_latest_wins() {
        let conn = store::open_in_memory().expect("open");

        upsert_module(
            &conn,
            "shop",
            &ModuleFields {
                name: "Shop".into(),
                sort_order: 3,
                ..ModuleFields::default()
            },
            100,
        )
        .expect("first define");

        let updated = upsert_module(
            &conn,
            "shop",
            &ModuleFields {
                name: "Shop v2".into(),
                sort_order: 7,
                ..ModuleFields::default()
            },
            200,
        )
        .expect("second define");

        assert_eq!(updated.name, "Shop v2");
        assert_eq!(updated.sort_order, 7);
        assert_eq!(updated.created_at_us, 100, "created_at preserved");
        assert_eq!(updated.updated_at_us, 200);

        let count: i64 = conn
            .query_row("SELECT count(*) FROM modules", [], |row| row.get(0))
            .expect("count");
        assert_eq!(count, 1, "module count does not grow");
    }

    #[test]
    fn redefine_does_not_touch_activation_flag() {
        let conn = store::open_in_memory().expect("open");

        upsert_module(&conn, "shop", &ModuleFields::default(), 0).expect("define");
        set_active(&conn, "shop", true, 1).expect("activate");

        let redefined = upsert_module(
            &conn,
            "shop",
            &ModuleFields {
                is_active: false,
                ..ModuleFields::default()
            },
            2,
        )
        .expect("redefine");
        assert!(redefined.is_active, "redefine must not flip is_active");
    }

    #[test]
    fn initial_define_honors_is_active() {
        let conn = store::open_in_memory().expect("open");
        let record = upsert_module(
            &conn,
            "core",
            &ModuleFields {
                is_active: true,
                ..ModuleFields::default()
            },
            0,
        )
        .expect("define");
        assert!(record.is_active);
    }

    #[test]
    fn set_active_on_missing_module_fails() {
        let conn = store::open_in_memory().expect("open");
        assert!(set_active(&conn, "ghost", true, 0).is_err());
    }

    #[test]
    fn metadata_round_trips() {
        let conn = store::open_in_memory().expect("open");
        upsert_module(
            &conn,
            "shop",
            &ModuleFields {
                metadata: Some(json!({"billing": {"provider": "stripe"}})),
                ..ModuleFields::default()
            },
            0,
        )
        .expect("define");

        let module = query::get_module(&conn, "shop").expect("get").expect("found");
        assert_eq!(module.meta("billing.provider"), Some(&json!("stripe")));

        update_metadata(&conn, "shop", Some(&json!({"billing": null})), 1).expect("update");
        let module = query::get_module(&conn, "shop").expect("get").expect("found");
        assert_eq!(module.meta("billing"), Some(&json!(null)));
    }

    #[test]
    fn relink_same_edge_is_noop() {
        let conn = store::open_in_memory().expect("open");
        upsert_module(&conn, "a", &ModuleFields::default(), 0).expect("define a");
        upsert_module(&conn, "b", &ModuleFields::default(), 0).expect("define b");

        upsert_edge(&conn, "a", "b", EdgeKind::Requires, 10).expect("link");
        upsert_edge(&conn, "a", "b", EdgeKind::Requires, 99).expect("relink");

        let edges = query::all_edges(&conn).expect("edges");
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].created_at_us, 10, "relink keeps the original row");
    }

    #[test]
    fn same_pair_can_carry_one_edge_per_kind() {
        let conn = store::open_in_memory().expect("open");
        upsert_module(&conn, "a", &ModuleFields::default(), 0).expect("define a");
        upsert_module(&conn, "b", &ModuleFields::default(), 0).expect("define b");

        upsert_edge(&conn, "a", "b", EdgeKind::Requires, 0).expect("requires");
        upsert_edge(&conn, "a", "b", EdgeKind::Suggests, 0).expect("suggests");

        assert_eq!(query::all_edges(&conn).expect("edges").len(), 2);
    }
}
