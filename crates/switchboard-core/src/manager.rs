//! The activation state machine.
//!
//! # Overview
//!
//! [`ModuleManager`] orchestrates the only two mutating transitions —
//! activate and deactivate — by consulting the resolver over a fresh
//! [`GraphSnapshot`], applying state changes through the store (atomically
//! for cascades), invalidating the status cache, and dispatching
//! non-vetoing observer notifications. It also owns edge authoring (with
//! pre-insertion cycle validation), the idempotent `define` upsert, and the
//! read-side conveniences built on top of the same parts.
//!
//! # Concurrency
//!
//! Every mutation is a read-check-then-write sequence and must not race
//! with another writer on the same graph. In-process this is `&mut self`;
//! across processes, file-backed registries hold an exclusive advisory lock
//! for the span of each mutation. All operations are synchronous and
//! bounded by the size of the dependency closure.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use rusqlite::Connection;

use crate::cache::{self, StatusCache};
use crate::config::ManagerConfig;
use crate::error::{Result, SwitchboardError};
use crate::graph::resolver::{self, ActivationIssues, DeactivationIssues};
use crate::graph::snapshot::GraphSnapshot;
use crate::graph::tree::{self, FlatNode, TreeNode};
use crate::lock::{DEFAULT_LOCK_TIMEOUT, RegistryLock};
use crate::model::{DEFAULT_GROUP, DeactivationPolicy, EdgeKind, ModuleRecord};
use crate::notify::ModuleObserver;
use crate::store::query::{self, EdgeDirection};
use crate::store::write::{self, ModuleFields};
use crate::store::{self, now_us};

// ---------------------------------------------------------------------------
// Define options
// ---------------------------------------------------------------------------

/// Optional fields accepted by [`ModuleManager::define`].
#[derive(Debug, Clone, Default)]
pub struct DefineOptions {
    pub description: Option<String>,
    /// Defaults to [`DEFAULT_GROUP`] when unset.
    pub group: Option<String>,
    pub icon: Option<String>,
    pub sort_order: i64,
    /// Initial activation state; honored on first insert only.
    pub is_active: bool,
    pub is_system: bool,
    /// Defaults to the configured `default_deactivation` when unset.
    pub on_deactivate: Option<DeactivationPolicy>,
    pub metadata: Option<serde_json::Value>,
    /// Parent module key; must already be defined.
    pub parent: Option<String>,
}

// ---------------------------------------------------------------------------
// Advisory results
// ---------------------------------------------------------------------------

/// Soft answer to "why can't this module be activated?".
///
/// Advisory endpoints never fail on an unknown key — that is a distinct
/// marker, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivationAdvice {
    UnknownModule,
    Issues(ActivationIssues),
}

/// Soft answer to "why can't this module be deactivated?".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeactivationAdvice {
    UnknownModule,
    Issues(DeactivationIssues),
}

// ---------------------------------------------------------------------------
// ModuleManager
// ---------------------------------------------------------------------------

/// The module registry: store handle, configuration, cache, and observers.
pub struct ModuleManager {
    conn: Connection,
    config: ManagerConfig,
    cache: RefCell<Box<dyn StatusCache>>,
    observers: Vec<Box<dyn ModuleObserver>>,
    lock_path: Option<PathBuf>,
}

impl ModuleManager {
    /// Open (or create) a file-backed registry at `path`.
    ///
    /// Mutating operations on a file-backed registry serialize through an
    /// exclusive advisory lock on a sibling `.lock` file.
    pub fn open(path: &Path, config: ManagerConfig) -> Result<Self> {
        let conn = store::open(path)?;
        let lock_path = path.with_extension("lock");
        Ok(Self::from_connection(conn, config, Some(lock_path)))
    }

    /// Open an ephemeral in-memory registry. Used by tests and tooling.
    pub fn open_in_memory(config: ManagerConfig) -> Result<Self> {
        let conn = store::open_in_memory()?;
        Ok(Self::from_connection(conn, config, None))
    }

    fn from_connection(
        conn: Connection,
        config: ManagerConfig,
        lock_path: Option<PathBuf>,
    ) -> Self {
        let cache = RefCell::new(cache::from_config(&config.cache));
        Self {
            conn,
            config,
            cache,
            observers: Vec::new(),
            lock_path,
        }
    }

    /// Register a transition observer. Observers are invoked synchronously,
    /// in registration order, and cannot veto transitions.
    pub fn register_observer(&mut self, observer: Box<dyn ModuleObserver>) {
        self.observers.push(observer);
    }

    /// The effective configuration.
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    fn write_guard(&self) -> Result<Option<RegistryLock>> {
        match &self.lock_path {
            Some(path) => Ok(Some(RegistryLock::exclusive(path, DEFAULT_LOCK_TIMEOUT)?)),
            None => Ok(None),
        }
    }

    fn snapshot(&self) -> Result<GraphSnapshot> {
        Ok(GraphSnapshot::load(&self.conn)?)
    }

    // -----------------------------------------------------------------------
    // Lookup
    // -----------------------------------------------------------------------

    /// Fetch a module by key, or `None`.
    pub fn find(&self, key: &str) -> Result<Option<ModuleRecord>> {
        Ok(query::get_module(&self.conn, key)?)
    }

    /// Fetch a module by key, or fail with [`SwitchboardError::ModuleNotFound`].
    pub fn get(&self, key: &str) -> Result<ModuleRecord> {
        self.find(key)?
            .ok_or_else(|| SwitchboardError::ModuleNotFound {
                key: key.to_string(),
            })
    }

    /// Every module, in listing order.
    pub fn all(&self) -> Result<Vec<ModuleRecord>> {
        Ok(query::list_all(&self.conn)?)
    }

    /// Modules in a group, in listing order.
    pub fn in_group(&self, group: &str) -> Result<Vec<ModuleRecord>> {
        Ok(query::list_group(&self.conn, group)?)
    }

    // -----------------------------------------------------------------------
    // Define (idempotent upsert)
    // -----------------------------------------------------------------------

    /// Create or update a module definition.
    ///
    /// Repeated calls with the same key are idempotent upserts: the latest
    /// field values win, except that `is_active` is only honored on first
    /// insert (activation state belongs to the state machine). A declared
    /// parent must already be defined.
    pub fn define(&mut self, key: &str, name: &str, options: DefineOptions) -> Result<ModuleRecord> {
        let _guard = self.write_guard()?;

        if let Some(parent) = options.parent.as_deref() {
            self.get(parent)?;
        }

        let fields = ModuleFields {
            name: name.to_string(),
            description: options.description,
            group: options.group.unwrap_or_else(|| DEFAULT_GROUP.to_string()),
            icon: options.icon,
            sort_order: options.sort_order,
            is_active: options.is_active,
            is_system: options.is_system,
            on_deactivate: options
                .on_deactivate
                .unwrap_or(self.config.default_deactivation),
            metadata: options.metadata,
            parent: options.parent,
        };

        let record = write::upsert_module(&self.conn, key, &fields, now_us())?;
        self.cache.borrow_mut().invalidate();
        tracing::debug!(key, "module defined");
        Ok(record)
    }

    // -----------------------------------------------------------------------
    // Edge authoring
    // -----------------------------------------------------------------------

    /// Record that `module` REQUIRES `dependency`.
    ///
    /// Validates acyclicity before the edge is persisted; the REQUIRES
    /// graph never contains a cycle, even transiently.
    pub fn requires(&mut self, module: &str, dependency: &str) -> Result<()> {
        let _guard = self.write_guard()?;
        self.get(module)?;
        self.get(dependency)?;

        let snapshot = self.snapshot()?;
        crate::graph::cycles::ensure_acyclic(&snapshot, module, dependency)
            .map_err(|e| SwitchboardError::CircularDependency { chain: e.chain })?;

        write::upsert_edge(&self.conn, module, dependency, EdgeKind::Requires, now_us())?;
        self.cache.borrow_mut().invalidate();
        Ok(())
    }

    /// Record that `module` CONFLICTS with `other`, symmetrically, as one
    /// logical operation.
    pub fn conflicts(&mut self, module: &str, other: &str) -> Result<()> {
        let _guard = self.write_guard()?;
        self.get(module)?;
        self.get(other)?;

        let now = now_us();
        let tx = self
            .conn
            .transaction()
            .map_err(|e| SwitchboardError::Store(e.into()))?;
        write::upsert_edge(&tx, module, other, EdgeKind::Conflicts, now)?;
        write::upsert_edge(&tx, other, module, EdgeKind::Conflicts, now)?;
        tx.commit().map_err(|e| SwitchboardError::Store(e.into()))?;

        self.cache.borrow_mut().invalidate();
        Ok(())
    }

    /// Record that `module` SUGGESTS `suggestion`. Advisory only: never
    /// consulted by activation or deactivation checks.
    pub fn suggests(&mut self, module: &str, suggestion: &str) -> Result<()> {
        let _guard = self.write_guard()?;
        self.get(module)?;
        self.get(suggestion)?;

        write::upsert_edge(&self.conn, module, suggestion, EdgeKind::Suggests, now_us())?;
        self.cache.borrow_mut().invalidate();
        Ok(())
    }

    /// Modules `key` REQUIRES, in listing order.
    pub fn dependencies(&self, key: &str) -> Result<Vec<ModuleRecord>> {
        self.edge_neighbors(key, EdgeKind::Requires, EdgeDirection::Outgoing)
    }

    /// Modules that REQUIRE `key`, in listing order.
    pub fn dependents(&self, key: &str) -> Result<Vec<ModuleRecord>> {
        self.edge_neighbors(key, EdgeKind::Requires, EdgeDirection::Incoming)
    }

    /// Modules `key` SUGGESTS, in listing order.
    pub fn suggestions(&self, key: &str) -> Result<Vec<ModuleRecord>> {
        self.edge_neighbors(key, EdgeKind::Suggests, EdgeDirection::Outgoing)
    }

    fn edge_neighbors(
        &self,
        key: &str,
        kind: EdgeKind,
        direction: EdgeDirection,
    ) -> Result<Vec<ModuleRecord>> {
        self.get(key)?;
        let edges = query::list_edges(&self.conn, key, Some(kind), direction)?;

        let mut neighbors = Vec::new();
        for edge in edges {
            let neighbor_key = match direction {
                EdgeDirection::Outgoing => &edge.target,
                EdgeDirection::Incoming => &edge.module,
            };
            if let Some(record) = query::get_module(&self.conn, neighbor_key)? {
                neighbors.push(record);
            }
        }
        neighbors.sort_by(|a, b| {
            a.sort_order
                .cmp(&b.sort_order)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(neighbors)
    }

    // -----------------------------------------------------------------------
    // Transitions
    // -----------------------------------------------------------------------

    /// Activate a module.
    ///
    /// No-op if already active. Fails with [`SwitchboardError::DependencyMissing`]
    /// when REQUIRES targets are inactive, else [`SwitchboardError::Conflict`]
    /// when CONFLICTS targets are active.
    pub fn activate(&mut self, key: &str) -> Result<()> {
        let _guard = self.write_guard()?;
        let module = self.get(key)?;

        if module.is_active {
            return Ok(());
        }

        let snapshot = self.snapshot()?;
        let issues = resolver::can_activate(&snapshot, key);
        if !issues.missing_dependencies.is_empty() {
            return Err(SwitchboardError::DependencyMissing {
                key: key.to_string(),
                missing: issues.missing_dependencies,
            });
        }
        if !issues.conflicts.is_empty() {
            return Err(SwitchboardError::Conflict {
                key: key.to_string(),
                conflicting: issues.conflicts,
            });
        }

        self.dispatch(|o| o.on_activating(&module));

        write::set_active(&self.conn, key, true, now_us())?;
        self.cache.borrow_mut().invalidate();

        let activated = ModuleRecord {
            is_active: true,
            ..module
        };
        self.dispatch(|o| o.on_activated(&activated));
        tracing::info!(key, "module activated");
        Ok(())
    }

    /// Deactivate a module.
    ///
    /// No-op if already inactive. System modules always fail with
    /// [`SwitchboardError::SystemModuleProtected`], regardless of policy.
    /// Under `Restrict`, active dependents fail the transition; under
    /// `Cascade`, every transitively-active dependent is deactivated with
    /// the module as a single atomic unit of work — no partial cascade is
    /// ever observable.
    pub fn deactivate(&mut self, key: &str) -> Result<()> {
        let _guard = self.write_guard()?;
        let module = self.get(key)?;

        if !module.is_active {
            return Ok(());
        }

        if module.is_system {
            return Err(SwitchboardError::SystemModuleProtected {
                key: key.to_string(),
            });
        }

        let snapshot = self.snapshot()?;
        let issues = resolver::can_deactivate(&snapshot, key);
        if issues.system_module {
            // Defensive double-check; the record flag above already caught it.
            return Err(SwitchboardError::SystemModuleProtected {
                key: key.to_string(),
            });
        }
        if !issues.active_dependents.is_empty() {
            return Err(SwitchboardError::ActiveDependentsBlocking {
                key: key.to_string(),
                dependents: issues.active_dependents,
            });
        }

        // Innermost dependents first, so each module flips only after its
        // own active dependents have flipped.
        let cascade = resolver::cascade_apply_order(&snapshot, key);
        let mut records: HashMap<String, ModuleRecord> = HashMap::new();
        for cascade_key in &cascade {
            records.insert(cascade_key.clone(), self.get(cascade_key)?);
        }

        let now = now_us();
        let events_enabled = self.config.events.enabled;
        let tx = self
            .conn
            .transaction()
            .map_err(|e| SwitchboardError::Store(e.into()))?;

        for cascade_key in &cascade {
            let record = records
                .get(cascade_key)
                .ok_or_else(|| SwitchboardError::ModuleNotFound {
                    key: cascade_key.clone(),
                })?;
            dispatch_to(&self.observers, events_enabled, |o| {
                o.on_deactivating(record);
            });
            write::set_active(&tx, cascade_key, false, now)?;
            let deactivated = ModuleRecord {
                is_active: false,
                ..record.clone()
            };
            dispatch_to(&self.observers, events_enabled, |o| {
                o.on_deactivated(&deactivated);
            });
        }

        dispatch_to(&self.observers, events_enabled, |o| {
            o.on_deactivating(&module);
        });
        write::set_active(&tx, key, false, now)?;
        let deactivated = ModuleRecord {
            is_active: false,
            ..module
        };
        dispatch_to(&self.observers, events_enabled, |o| {
            o.on_deactivated(&deactivated);
        });

        tx.commit().map_err(|e| SwitchboardError::Store(e.into()))?;
        self.cache.borrow_mut().invalidate();
        tracing::info!(key, cascaded = cascade.len(), "module deactivated");
        Ok(())
    }

    /// Flip a module's state and return the resulting one.
    ///
    /// Subject to the same eligibility checks as [`ModuleManager::activate`]
    /// and [`ModuleManager::deactivate`].
    pub fn toggle(&mut self, key: &str) -> Result<bool> {
        let module = self.get(key)?;
        if module.is_active {
            self.deactivate(key)?;
            Ok(false)
        } else {
            self.activate(key)?;
            Ok(true)
        }
    }

    // -----------------------------------------------------------------------
    // Validation / advisory queries
    // -----------------------------------------------------------------------

    /// Returns `true` if the module exists and could be activated right now.
    pub fn can_activate(&self, key: &str) -> Result<bool> {
        match self.why_cant_activate(key)? {
            ActivationAdvice::Issues(issues) => Ok(issues.is_clear()),
            ActivationAdvice::UnknownModule => Ok(false),
        }
    }

    /// Returns `true` if the module exists and could be deactivated right now.
    pub fn can_deactivate(&self, key: &str) -> Result<bool> {
        match self.why_cant_deactivate(key)? {
            DeactivationAdvice::Issues(issues) => Ok(issues.is_clear()),
            DeactivationAdvice::UnknownModule => Ok(false),
        }
    }

    /// The full activation issue set, or a soft unknown-module marker.
    pub fn why_cant_activate(&self, key: &str) -> Result<ActivationAdvice> {
        if self.find(key)?.is_none() {
            return Ok(ActivationAdvice::UnknownModule);
        }
        let snapshot = self.snapshot()?;
        Ok(ActivationAdvice::Issues(resolver::can_activate(
            &snapshot, key,
        )))
    }

    /// The full deactivation issue set, or a soft unknown-module marker.
    pub fn why_cant_deactivate(&self, key: &str) -> Result<DeactivationAdvice> {
        if self.find(key)?.is_none() {
            return Ok(DeactivationAdvice::UnknownModule);
        }
        let snapshot = self.snapshot()?;
        Ok(DeactivationAdvice::Issues(resolver::can_deactivate(
            &snapshot, key,
        )))
    }

    /// Diagnostic: active modules whose REQUIRES targets are inactive.
    ///
    /// Deactivating a `None`-policy module with active dependents leaves
    /// this kind of permitted inconsistency behind.
    pub fn dangling_requirements(&self) -> Result<Vec<(String, String)>> {
        let snapshot = self.snapshot()?;
        Ok(resolver::dangling_requirements(&snapshot))
    }

    // -----------------------------------------------------------------------
    // Status checks (served through the cache)
    // -----------------------------------------------------------------------

    fn active_status(&self) -> Result<HashMap<String, bool>> {
        if let Some(map) = self.cache.borrow_mut().get() {
            return Ok(map);
        }
        let map = query::active_map(&self.conn)?;
        self.cache.borrow_mut().put(map.clone());
        Ok(map)
    }

    /// Returns `true` if the module exists and is active. Unknown keys are
    /// simply inactive.
    pub fn is_active(&self, key: &str) -> Result<bool> {
        Ok(self.active_status()?.get(key).copied().unwrap_or(false))
    }

    /// Returns `true` if the module is inactive or unknown.
    pub fn is_inactive(&self, key: &str) -> Result<bool> {
        Ok(!self.is_active(key)?)
    }

    /// Returns `true` if every listed module is active.
    pub fn all_active(&self, keys: &[&str]) -> Result<bool> {
        let status = self.active_status()?;
        Ok(keys
            .iter()
            .all(|key| status.get(*key).copied().unwrap_or(false)))
    }

    /// Returns `true` if at least one listed module is active.
    pub fn some_active(&self, keys: &[&str]) -> Result<bool> {
        let status = self.active_status()?;
        Ok(keys
            .iter()
            .any(|key| status.get(*key).copied().unwrap_or(false)))
    }

    /// Run `active` only when the module is active.
    pub fn when<R>(&self, key: &str, active: impl FnOnce() -> R) -> Result<Option<R>> {
        if self.is_active(key)? {
            Ok(Some(active()))
        } else {
            Ok(None)
        }
    }

    /// Run `inactive` only when the module is inactive (or unknown).
    pub fn unless<R>(&self, key: &str, inactive: impl FnOnce() -> R) -> Result<Option<R>> {
        if self.is_active(key)? {
            Ok(None)
        } else {
            Ok(Some(inactive()))
        }
    }

    /// Drop the cached status map. Invoked automatically on every mutating
    /// operation; exposed for callers that mutate the store out of band.
    pub fn flush_cache(&self) {
        self.cache.borrow_mut().invalidate();
    }

    // -----------------------------------------------------------------------
    // Hierarchy
    // -----------------------------------------------------------------------

    /// Nested tree of modules, optionally filtered to roots of one group.
    pub fn tree(&self, group: Option<&str>) -> Result<Vec<TreeNode>> {
        Ok(tree::build_tree(&self.conn, group)?)
    }

    /// Pre-order flattening of [`ModuleManager::tree`].
    pub fn flatten(&self, group: Option<&str>) -> Result<Vec<FlatNode>> {
        Ok(tree::flatten(&self.conn, group)?)
    }

    /// Sorted distinct non-empty group names.
    pub fn groups(&self) -> Result<Vec<String>> {
        Ok(tree::groups(&self.conn)?)
    }

    /// Direct children of a module, in listing order.
    pub fn children(&self, key: &str) -> Result<Vec<ModuleRecord>> {
        self.get(key)?;
        Ok(query::list_children(&self.conn, key)?)
    }

    /// Every descendant of a module, pre-order.
    pub fn descendants(&self, key: &str) -> Result<Vec<ModuleRecord>> {
        self.get(key)?;
        let modules = query::list_all(&self.conn)?;

        let mut children_of: HashMap<&str, Vec<&ModuleRecord>> = HashMap::new();
        for module in &modules {
            if let Some(parent) = module.parent.as_deref() {
                children_of.entry(parent).or_default().push(module);
            }
        }

        let mut collected = Vec::new();
        let mut stack: Vec<&ModuleRecord> = children_of
            .get(key)
            .map(|children| children.iter().rev().copied().collect())
            .unwrap_or_default();
        while let Some(module) = stack.pop() {
            collected.push(module.clone());
            if let Some(children) = children_of.get(module.key.as_str()) {
                for child in children.iter().rev() {
                    stack.push(child);
                }
            }
        }
        Ok(collected)
    }

    /// Ancestors of a module, nearest first.
    ///
    /// Parent links are not cycle-checked at write time, so the walk keeps
    /// a visited set and stops rather than looping.
    pub fn ancestors(&self, key: &str) -> Result<Vec<ModuleRecord>> {
        let mut current = self.get(key)?;
        let mut visited: HashSet<String> = HashSet::new();
        visited.insert(current.key.clone());

        let mut ancestors = Vec::new();
        while let Some(parent_key) = current.parent.clone() {
            if !visited.insert(parent_key.clone()) {
                break;
            }
            match query::get_module(&self.conn, &parent_key)? {
                Some(parent) => {
                    ancestors.push(parent.clone());
                    current = parent;
                }
                None => break,
            }
        }
        Ok(ancestors)
    }

    /// Modules sharing this module's parent (or fellow roots), excluding it.
    pub fn siblings(&self, key: &str) -> Result<Vec<ModuleRecord>> {
        let module = self.get(key)?;
        let peers = match module.parent.as_deref() {
            Some(parent) => query::list_children(&self.conn, parent)?,
            None => query::list_roots(&self.conn)?,
        };
        Ok(peers.into_iter().filter(|peer| peer.key != key).collect())
    }

    // -----------------------------------------------------------------------
    // Metadata
    // -----------------------------------------------------------------------

    /// Read a metadata value by dotted path.
    pub fn meta(&self, key: &str, path: &str) -> Result<Option<serde_json::Value>> {
        let module = self.get(key)?;
        Ok(module.meta(path).cloned())
    }

    /// Set one metadata value by dotted path.
    pub fn set_meta(&mut self, key: &str, path: &str, value: serde_json::Value) -> Result<()> {
        self.set_meta_many(key, [(path.to_string(), value)])
    }

    /// Set several metadata values by dotted path in one write.
    pub fn set_meta_many(
        &mut self,
        key: &str,
        entries: impl IntoIterator<Item = (String, serde_json::Value)>,
    ) -> Result<()> {
        let _guard = self.write_guard()?;
        let mut module = self.get(key)?;
        for (path, value) in entries {
            module.set_meta(&path, value);
        }
        write::update_metadata(&self.conn, key, module.metadata.as_ref(), now_us())?;
        self.cache.borrow_mut().invalidate();
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Notifications
    // -----------------------------------------------------------------------

    fn dispatch(&self, hook: impl Fn(&dyn ModuleObserver)) {
        dispatch_to(&self.observers, self.config.events.enabled, hook);
    }
}

/// Invoke a hook on every registered observer.
///
/// Free function so the deactivation path can dispatch while holding a
/// transaction borrow on the connection field.
fn dispatch_to(
    observers: &[Box<dyn ModuleObserver>],
    enabled: bool,
    hook: impl Fn(&dyn ModuleObserver),
) {
    if !enabled {
        return;
    }
    for observer in observers {
        hook(observer.as_ref());
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn manager() -> ModuleManager {
        ModuleManager::open_in_memory(ManagerConfig::default()).expect("open")
    }

    fn define(mgr: &mut ModuleManager, key: &str) {
        mgr.define(key, key, DefineOptions::default()).expect("define");
    }

    fn define_with(mgr: &mut ModuleManager, key: &str, options: DefineOptions) {
        mgr.define(key, key, options).expect("define");
    }

    // -----------------------------------------------------------------------
    // define
    // -----------------------------------------------------------------------

    #[test]
    fn define_applies_config_default_policy() {
        let config = ManagerConfig {
            default_deactivation: DeactivationPolicy::Cascade,
            ..ManagerConfig::default()
        };
        let mut mgr = ModuleManager::open_in_memory(config).expect("open");
        define(&mut mgr, "shop");
        assert_eq!(
            mgr.get("shop").expect("get").on_deactivate,
            DeactivationPolicy::Cascade
        );
    }

    #[test]
    fn define_rejects_unknown_parent() {
        let mut mgr = manager();
        let err = mgr
            .define(
                "child",
                "Child",
                DefineOptions {
                    parent: Some("ghost".into()),
                    ..DefineOptions::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, SwitchboardError::ModuleNotFound { key } if key == "ghost"));
    }

    #[test]
    fn redefine_keeps_module_count_and_takes_latest_values() {
        let mut mgr = manager();
        define(&mut mgr, "shop");
        mgr.define(
            "shop",
            "Shop Renamed",
            DefineOptions {
                sort_order: 5,
                ..DefineOptions::default()
            },
        )
        .expect("redefine");

        let all = mgr.all().expect("all");
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].name, "Shop Renamed");
        assert_eq!(all[0].sort_order, 5);
    }

    // -----------------------------------------------------------------------
    // activate
    // -----------------------------------------------------------------------

    #[test]
    fn activate_unknown_module_fails() {
        let mut mgr = manager();
        let err = mgr.activate("ghost").unwrap_err();
        assert!(matches!(err, SwitchboardError::ModuleNotFound { .. }));
    }

    #[test]
    fn activate_is_idempotent() {
        let mut mgr = manager();
        define(&mut mgr, "shop");
        mgr.activate("shop").expect("first");
        mgr.activate("shop").expect("second is a no-op");
        assert!(mgr.is_active("shop").expect("status"));
    }

    #[test]
    fn activate_blocked_by_inactive_requirement() {
        let mut mgr = manager();
        define(&mut mgr, "checkout");
        define(&mut mgr, "cart");
        mgr.requires("checkout", "cart").expect("link");

        let err = mgr.activate("checkout").unwrap_err();
        match err {
            SwitchboardError::DependencyMissing { key, missing } => {
                assert_eq!(key, "checkout");
                assert_eq!(missing, ["cart"]);
            }
            other => panic!("expected DependencyMissing, got {other}"),
        }
        assert!(!mgr.is_active("checkout").expect("status"), "stays inactive");
    }

    #[test]
    fn activate_succeeds_once_requirement_is_active() {
        let mut mgr = manager();
        define(&mut mgr, "checkout");
        define(&mut mgr, "cart");
        mgr.requires("checkout", "cart").expect("link");

        mgr.activate("cart").expect("activate cart");
        mgr.activate("checkout").expect("activate checkout");
        assert!(mgr.all_active(&["cart", "checkout"]).expect("status"));
    }

    #[test]
    fn activate_blocked_by_active_conflict_symmetrically() {
        let mut mgr = manager();
        define(&mut mgr, "new_ui");
        define(&mut mgr, "old_ui");
        mgr.conflicts("new_ui", "old_ui").expect("link");

        mgr.activate("old_ui").expect("activate old_ui");
        let err = mgr.activate("new_ui").unwrap_err();
        match err {
            SwitchboardError::Conflict { key, conflicting } => {
                assert_eq!(key, "new_ui");
                assert_eq!(conflicting, ["old_ui"]);
            }
            other => panic!("expected Conflict, got {other}"),
        }

        // And the mirror image.
        mgr.deactivate("old_ui").expect("deactivate");
        mgr.activate("new_ui").expect("activate new_ui");
        let err = mgr.activate("old_ui").unwrap_err();
        assert!(matches!(err, SwitchboardError::Conflict { .. }));
    }

    // -----------------------------------------------------------------------
    // deactivate
    // -----------------------------------------------------------------------

    #[test]
    fn deactivate_is_idempotent() {
        let mut mgr = manager();
        define(&mut mgr, "shop");
        mgr.deactivate("shop").expect("already inactive is a no-op");
    }

    #[test]
    fn system_module_never_deactivates() {
        let mut mgr = manager();
        // Even with policy None and zero dependents.
        define_with(
            &mut mgr,
            "auth",
            DefineOptions {
                is_active: true,
                is_system: true,
                on_deactivate: Some(DeactivationPolicy::None),
                ..DefineOptions::default()
            },
        );

        let err = mgr.deactivate("auth").unwrap_err();
        assert!(matches!(err, SwitchboardError::SystemModuleProtected { key } if key == "auth"));
        assert!(mgr.is_active("auth").expect("status"));
    }

    #[test]
    fn restrict_policy_blocks_with_active_dependents() {
        let mut mgr = manager();
        define_with(
            &mut mgr,
            "payments",
            DefineOptions {
                is_active: true,
                on_deactivate: Some(DeactivationPolicy::Restrict),
                ..DefineOptions::default()
            },
        );
        define_with(
            &mut mgr,
            "checkout",
            DefineOptions {
                is_active: true,
                ..DefineOptions::default()
            },
        );
        mgr.requires("checkout", "payments").expect("link");

        let err = mgr.deactivate("payments").unwrap_err();
        match err {
            SwitchboardError::ActiveDependentsBlocking { key, dependents } => {
                assert_eq!(key, "payments");
                assert_eq!(dependents, ["checkout"]);
            }
            other => panic!("expected ActiveDependentsBlocking, got {other}"),
        }
        assert!(mgr.all_active(&["payments", "checkout"]).expect("status"));
    }

    #[test]
    fn none_policy_leaves_dangling_requirements() {
        let mut mgr = manager();
        define_with(
            &mut mgr,
            "payments",
            DefineOptions {
                is_active: true,
                on_deactivate: Some(DeactivationPolicy::None),
                ..DefineOptions::default()
            },
        );
        define_with(
            &mut mgr,
            "checkout",
            DefineOptions {
                is_active: true,
                ..DefineOptions::default()
            },
        );
        mgr.requires("checkout", "payments").expect("link");

        mgr.deactivate("payments").expect("permitted under None");
        assert!(mgr.is_active("checkout").expect("status"));
        assert_eq!(
            mgr.dangling_requirements().expect("diagnostic"),
            [("checkout".to_string(), "payments".to_string())]
        );
    }

    #[test]
    fn cascade_deactivates_transitive_dependents() {
        let mut mgr = manager();
        define_with(
            &mut mgr,
            "p",
            DefineOptions {
                is_active: true,
                on_deactivate: Some(DeactivationPolicy::Cascade),
                ..DefineOptions::default()
            },
        );
        for key in ["d1", "d2"] {
            define_with(
                &mut mgr,
                key,
                DefineOptions {
                    is_active: true,
                    ..DefineOptions::default()
                },
            );
        }
        mgr.requires("d1", "p").expect("link");
        mgr.requires("d2", "d1").expect("link");

        mgr.deactivate("p").expect("cascade");
        for key in ["p", "d1", "d2"] {
            assert!(!mgr.is_active(key).expect("status"), "{key} inactive");
        }
    }

    #[test]
    fn cascade_spares_system_dependents() {
        let mut mgr = manager();
        define_with(
            &mut mgr,
            "p",
            DefineOptions {
                is_active: true,
                on_deactivate: Some(DeactivationPolicy::Cascade),
                ..DefineOptions::default()
            },
        );
        define_with(
            &mut mgr,
            "sys",
            DefineOptions {
                is_active: true,
                is_system: true,
                ..DefineOptions::default()
            },
        );
        mgr.requires("sys", "p").expect("link");

        mgr.deactivate("p").expect("cascade");
        assert!(!mgr.is_active("p").expect("status"));
        assert!(mgr.is_active("sys").expect("status"), "system spared");
    }

    // -----------------------------------------------------------------------
    // toggle
    // -----------------------------------------------------------------------

    #[test]
    fn toggle_returns_resulting_state() {
        let mut mgr = manager();
        define(&mut mgr, "shop");

        assert!(mgr.toggle("shop").expect("on"), "inactive → active");
        assert!(!mgr.toggle("shop").expect("off"), "active → inactive");
    }

    #[test]
    fn toggle_enforces_activation_rules() {
        let mut mgr = manager();
        define(&mut mgr, "checkout");
        define(&mut mgr, "cart");
        mgr.requires("checkout", "cart").expect("link");

        let err = mgr.toggle("checkout").unwrap_err();
        assert!(matches!(err, SwitchboardError::DependencyMissing { .. }));
    }

    // -----------------------------------------------------------------------
    // advisory queries
    // -----------------------------------------------------------------------

    #[test]
    fn why_cant_activate_reports_all_reasons() {
        let mut mgr = manager();
        define(&mut mgr, "checkout");
        define(&mut mgr, "cart");
        define_with(
            &mut mgr,
            "legacy",
            DefineOptions {
                is_active: true,
                ..DefineOptions::default()
            },
        );
        mgr.requires("checkout", "cart").expect("link");
        mgr.conflicts("checkout", "legacy").expect("link");

        match mgr.why_cant_activate("checkout").expect("advice") {
            ActivationAdvice::Issues(issues) => {
                assert_eq!(issues.missing_dependencies, ["cart"]);
                assert_eq!(issues.conflicts, ["legacy"]);
            }
            ActivationAdvice::UnknownModule => panic!("module exists"),
        }
    }

    #[test]
    fn advisory_queries_soft_signal_unknown_modules() {
        let mgr = manager();
        assert_eq!(
            mgr.why_cant_activate("ghost").expect("advice"),
            ActivationAdvice::UnknownModule
        );
        assert_eq!(
            mgr.why_cant_deactivate("ghost").expect("advice"),
            DeactivationAdvice::UnknownModule
        );
        assert!(!mgr.can_activate("ghost").expect("can"));
        assert!(!mgr.can_deactivate("ghost").expect("can"));
    }

    #[test]
    fn can_activate_true_when_clear() {
        let mut mgr = manager();
        define(&mut mgr, "shop");
        assert!(mgr.can_activate("shop").expect("can"));
    }

    // -----------------------------------------------------------------------
    // edge authoring
    // -----------------------------------------------------------------------

    #[test]
    fn requires_rejects_cycles_and_persists_nothing() {
        let mut mgr = manager();
        for key in ["a", "b", "c"] {
            define(&mut mgr, key);
        }
        mgr.requires("a", "b").expect("a→b");
        mgr.requires("b", "c").expect("b→c");

        let err = mgr.requires("c", "a").unwrap_err();
        match err {
            SwitchboardError::CircularDependency { chain } => {
                assert_eq!(chain, ["c", "a", "b", "c"]);
            }
            other => panic!("expected CircularDependency, got {other}"),
        }

        // The rejected edge must not exist.
        assert!(mgr.dependencies("c").expect("deps").is_empty());
    }

    #[test]
    fn requires_rejects_self_dependency() {
        let mut mgr = manager();
        define(&mut mgr, "a");
        let err = mgr.requires("a", "a").unwrap_err();
        assert!(matches!(err, SwitchboardError::CircularDependency { .. }));
    }

    #[test]
    fn conflicts_is_recorded_symmetrically() {
        let mut mgr = manager();
        define(&mut mgr, "a");
        define(&mut mgr, "b");
        mgr.conflicts("a", "b").expect("link");

        let snapshot = mgr.snapshot().expect("snapshot");
        assert_eq!(snapshot.conflicts_of("a").collect::<Vec<_>>(), ["b"]);
        assert_eq!(snapshot.conflicts_of("b").collect::<Vec<_>>(), ["a"]);
    }

    #[test]
    fn suggests_never_blocks_activation() {
        let mut mgr = manager();
        define(&mut mgr, "blog");
        define(&mut mgr, "seo");
        mgr.suggests("blog", "seo").expect("link");

        mgr.activate("blog").expect("seo inactive but only suggested");
        assert_eq!(mgr.suggestions("blog").expect("suggestions").len(), 1);
    }

    #[test]
    fn edge_authoring_requires_both_endpoints() {
        let mut mgr = manager();
        define(&mut mgr, "a");
        assert!(matches!(
            mgr.requires("a", "ghost").unwrap_err(),
            SwitchboardError::ModuleNotFound { .. }
        ));
        assert!(matches!(
            mgr.conflicts("ghost", "a").unwrap_err(),
            SwitchboardError::ModuleNotFound { .. }
        ));
    }

    #[test]
    fn dependencies_and_dependents_views() {
        let mut mgr = manager();
        for key in ["checkout", "cart", "payments"] {
            define(&mut mgr, key);
        }
        mgr.requires("checkout", "cart").expect("link");
        mgr.requires("checkout", "payments").expect("link");

        let deps: Vec<String> = mgr
            .dependencies("checkout")
            .expect("deps")
            .into_iter()
            .map(|m| m.key)
            .collect();
        assert_eq!(deps, ["cart", "payments"]);

        let dependents: Vec<String> = mgr
            .dependents("cart")
            .expect("dependents")
            .into_iter()
            .map(|m| m.key)
            .collect();
        assert_eq!(dependents, ["checkout"]);
    }

    // -----------------------------------------------------------------------
    // status sugar
    // -----------------------------------------------------------------------

    #[test]
    fn status_checks_and_conditionals() {
        let mut mgr = manager();
        define(&mut mgr, "shop");
        define(&mut mgr, "blog");
        mgr.activate("shop").expect("activate");

        assert!(mgr.is_active("shop").expect("status"));
        assert!(mgr.is_inactive("blog").expect("status"));
        assert!(mgr.some_active(&["shop", "blog"]).expect("status"));
        assert!(!mgr.all_active(&["shop", "blog"]).expect("status"));

        assert_eq!(mgr.when("shop", || 7).expect("when"), Some(7));
        assert_eq!(mgr.when("blog", || 7).expect("when"), None);
        assert_eq!(mgr.unless("blog", || "off").expect("unless"), Some("off"));
    }

    #[test]
    fn status_cache_never_serves_stale_state() {
        let mut mgr = manager();
        define(&mut mgr, "shop");

        assert!(!mgr.is_active("shop").expect("status"), "primes the cache");
        mgr.activate("shop").expect("activate");
        assert!(
            mgr.is_active("shop").expect("status"),
            "mutation invalidated the cached map"
        );
    }

    // -----------------------------------------------------------------------
    // hierarchy
    // -----------------------------------------------------------------------

    #[test]
    fn hierarchy_queries() {
        let mut mgr = manager();
        define(&mut mgr, "shop");
        define_with(
            &mut mgr,
            "products",
            DefineOptions {
                parent: Some("shop".into()),
                ..DefineOptions::default()
            },
        );
        define_with(
            &mut mgr,
            "simple",
            DefineOptions {
                parent: Some("products".into()),
                ..DefineOptions::default()
            },
        );
        define_with(
            &mut mgr,
            "variants",
            DefineOptions {
                parent: Some("products".into()),
                sort_order: 1,
                ..DefineOptions::default()
            },
        );

        let children: Vec<String> = mgr
            .children("products")
            .expect("children")
            .into_iter()
            .map(|m| m.key)
            .collect();
        assert_eq!(children, ["simple", "variants"]);

        let descendants: Vec<String> = mgr
            .descendants("shop")
            .expect("descendants")
            .into_iter()
            .map(|m| m.key)
            .collect();
        assert_eq!(descendants, ["products", "simple", "variants"]);

        let ancestors: Vec<String> = mgr
            .ancestors("simple")
            .expect("ancestors")
            .into_iter()
            .map(|m| m.key)
            .collect();
        assert_eq!(ancestors, ["products", "shop"]);

        let siblings: Vec<String> = mgr
            .siblings("simple")
            .expect("siblings")
            .into_iter()
            .map(|m| m.key)
            .collect();
        assert_eq!(siblings, ["variants"]);
    }

    // -----------------------------------------------------------------------
    // metadata
    // -----------------------------------------------------------------------

    #[test]
    fn metadata_read_and_write() {
        let mut mgr = manager();
        define(&mut mgr, "shop");

        assert_eq!(mgr.meta("shop", "billing.provider").expect("meta"), None);
        mgr.set_meta("shop", "billing.provider", json!("stripe"))
            .expect("set");
        assert_eq!(
            mgr.meta("shop", "billing.provider").expect("meta"),
            Some(json!("stripe"))
        );

        mgr.set_meta_many(
            "shop",
            [
                ("billing.trial_days".to_string(), json!(14)),
                ("ui.icon".to_string(), json!("cart")),
            ],
        )
        .expect("set many");
        assert_eq!(mgr.meta("shop", "ui.icon").expect("meta"), Some(json!("cart")));
        assert_eq!(
            mgr.meta("shop", "billing.provider").expect("meta"),
            Some(json!("stripe")),
            "earlier values survive"
        );
    }
}
