//! Command handlers. Every command is a thin call into
//! [`switchboard_core::ModuleManager`]; no graph logic lives here.

pub mod dep;
pub mod groups;
pub mod list;
pub mod show;
pub mod sync;
pub mod toggle;
pub mod tree;
pub mod why;

use std::path::{Path, PathBuf};

use anyhow::Context;
use switchboard_core::{ManagerConfig, ModuleManager, config::load_config};

/// Default registry database file, resolved against the working directory.
pub const DEFAULT_DB: &str = "switchboard.db";

/// Default config file, resolved against the working directory.
pub const DEFAULT_CONFIG: &str = "switchboard.toml";

/// Resolve the database path: `--db` flag, `SWITCHBOARD_DB` env, default.
pub fn resolve_db_path(flag: Option<&Path>) -> PathBuf {
    let env_path = std::env::var("SWITCHBOARD_DB").ok();
    resolve_db_path_inner(flag, env_path.as_deref())
}

/// Core resolution logic, separated from the environment for testability.
fn resolve_db_path_inner(flag: Option<&Path>, env_path: Option<&str>) -> PathBuf {
    if let Some(path) = flag {
        return path.to_path_buf();
    }
    if let Some(env_path) = env_path {
        if !env_path.trim().is_empty() {
            return PathBuf::from(env_path);
        }
    }
    PathBuf::from(DEFAULT_DB)
}

/// Open the registry with configuration loaded from `config_path`
/// (missing file ⇒ defaults).
pub fn open_manager(db_path: &Path, config_path: Option<&Path>) -> anyhow::Result<ModuleManager> {
    let config = match config_path {
        Some(path) => load_config(path)?,
        None => {
            let default_path = Path::new(DEFAULT_CONFIG);
            if default_path.exists() {
                load_config(default_path)?
            } else {
                ManagerConfig::default()
            }
        }
    };

    tracing::debug!(db = %db_path.display(), "opening registry");
    let manager = ModuleManager::open(db_path, config)
        .with_context(|| format!("open registry at {}", db_path.display()))?;
    Ok(manager)
}
