//! switchboard-core: a dependency-aware registry of toggleable feature
//! modules.
//!
//! Modules are named, hierarchical feature units connected by typed edges
//! (REQUIRES / CONFLICTS / SUGGESTS). The crate enforces safe activation
//! and deactivation transitions over that graph: eligibility checks,
//! atomic cascade deactivation, edge-insertion-time cycle rejection, and a
//! consistent tree projection of the parent-pointer forest.
//!
//! # Conventions
//!
//! - **Errors**: [`SwitchboardError`] for domain failures, `anyhow` with
//!   context at the storage boundary.
//! - **Logging**: `tracing` macros (`info!`, `warn!`, `debug!`, `trace!`).
//!
//! # Example
//!
//! ```
//! use switchboard_core::{DefineOptions, ManagerConfig, ModuleManager};
//!
//! # fn main() -> switchboard_core::Result<()> {
//! let mut modules = ModuleManager::open_in_memory(ManagerConfig::default())?;
//! modules.define("cart", "Cart", DefineOptions::default())?;
//! modules.define("checkout", "Checkout", DefineOptions::default())?;
//! modules.requires("checkout", "cart")?;
//!
//! assert!(modules.activate("checkout").is_err(), "cart is inactive");
//! modules.activate("cart")?;
//! modules.activate("checkout")?;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod graph;
pub mod lock;
pub mod manager;
pub mod model;
pub mod notify;
pub mod store;
pub mod sync;

pub use config::ManagerConfig;
pub use error::{ErrorCode, Result, SwitchboardError};
pub use manager::{ActivationAdvice, DeactivationAdvice, DefineOptions, ModuleManager};
pub use model::{DeactivationPolicy, EdgeKind, ModuleRecord};
