//! Active-status cache port.
//!
//! The `is_active` map is read far more often than it changes, so the
//! manager serves status checks through an injected cache. The contract is
//! strict: every mutating operation invalidates the cache synchronously as
//! part of its commit — the cache is a derived read optimization and must
//! never serve state from before the latest successful transition.
//!
//! The port is injected (not ambient global state) so tests can substitute
//! a deterministic fake.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::config::CacheConfig;

/// Cached copy of the key → `is_active` map.
pub trait StatusCache {
    /// Return the cached map, or `None` when absent, invalidated, or expired.
    fn get(&mut self) -> Option<HashMap<String, bool>>;

    /// Replace the cached map after a fresh store read.
    fn put(&mut self, map: HashMap<String, bool>);

    /// Drop the cached map. Called on every mutating commit.
    fn invalidate(&mut self);
}

/// Time-to-live cache: entries expire `ttl` after they were stored.
#[derive(Debug)]
pub struct TtlStatusCache {
    ttl: Duration,
    entry: Option<(Instant, HashMap<String, bool>)>,
}

impl TtlStatusCache {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, entry: None }
    }
}

impl StatusCache for TtlStatusCache {
    fn get(&mut self) -> Option<HashMap<String, bool>> {
        match &self.entry {
            Some((stored_at, map)) if stored_at.elapsed() < self.ttl => Some(map.clone()),
            Some(_) => {
                self.entry = None;
                None
            }
            None => None,
        }
    }

    fn put(&mut self, map: HashMap<String, bool>) {
        self.entry = Some((Instant::now(), map));
    }

    fn invalidate(&mut self) {
        self.entry = None;
    }
}

/// Cache disabled by configuration: every status read hits the store.
#[derive(Debug, Default)]
pub struct DisabledStatusCache;

impl StatusCache for DisabledStatusCache {
    fn get(&mut self) -> Option<HashMap<String, bool>> {
        None
    }

    fn put(&mut self, _map: HashMap<String, bool>) {}

    fn invalidate(&mut self) {}
}

/// Build the cache implementation selected by configuration.
pub fn from_config(config: &CacheConfig) -> Box<dyn StatusCache> {
    if config.enabled {
        Box::new(TtlStatusCache::new(Duration::from_secs(config.ttl_secs)))
    } else {
        Box::new(DisabledStatusCache)
    }
}
