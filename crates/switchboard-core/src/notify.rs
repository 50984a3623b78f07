//! Transition notification hooks.
//!
//! Observers are registered callbacks invoked synchronously around each
//! activation state change: once before the flip is persisted and once
//! after. They are observational only — an observer cannot veto, reorder,
//! or fail a transition, and the manager never inspects a return value.
//! Dispatch can be disabled globally via [`EventsConfig`].
//!
//! [`EventsConfig`]: crate::config::EventsConfig

use crate::model::ModuleRecord;

/// Observer of module activation transitions.
///
/// All methods have empty defaults; implement only the hooks you need.
/// Implementations must not block: they run inline on the mutating path.
pub trait ModuleObserver {
    /// The module is about to become active.
    fn on_activating(&self, _module: &ModuleRecord) {}

    /// The module became active and the change is persisted.
    fn on_activated(&self, _module: &ModuleRecord) {}

    /// The module is about to become inactive (directly or via cascade).
    fn on_deactivating(&self, _module: &ModuleRecord) {}

    /// The module became inactive and the change is persisted.
    fn on_deactivated(&self, _module: &ModuleRecord) {}
}

/// Built-in observer that logs every transition through `tracing`.
#[derive(Debug, Default)]
pub struct LoggingObserver;

impl ModuleObserver for LoggingObserver {
    fn on_activating(&self, module: &ModuleRecord) {
        tracing::debug!(key = %module.key, "module activating");
    }

    fn on_activated(&self, module: &ModuleRecord) {
        tracing::info!(key = %module.key, "module activated");
    }

    fn on_deactivating(&self, module: &ModuleRecord) {
        tracing::debug!(key = %module.key, "module deactivating");
    }

    fn on_deactivated(&self, module: &ModuleRecord) {
        tracing::info!(key = %module.key, "module deactivated");
    }
}
