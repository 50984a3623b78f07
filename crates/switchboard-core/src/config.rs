use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::model::DeactivationPolicy;

/// Registry-wide configuration, loaded from a TOML file.
///
/// Every section has working defaults; a missing file yields
/// `ManagerConfig::default()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagerConfig {
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub events: EventsConfig,
    /// Policy assigned to modules that do not declare one.
    #[serde(default)]
    pub default_deactivation: DeactivationPolicy,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            events: EventsConfig::default(),
            default_deactivation: DeactivationPolicy::default(),
        }
    }
}

/// Active-status cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            ttl_secs: default_cache_ttl(),
        }
    }
}

/// Transition notification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
        }
    }
}

const fn default_true() -> bool {
    true
}

const fn default_cache_ttl() -> u64 {
    3600
}

/// Load configuration from `path`. A missing file yields defaults.
pub fn load_config(path: &Path) -> Result<ManagerConfig> {
    if !path.exists() {
        return Ok(ManagerConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<ManagerConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}
