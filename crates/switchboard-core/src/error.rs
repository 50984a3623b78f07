use crate::lock::LockError;
use std::fmt;

/// Machine-readable error codes for agent-friendly decision making.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigParseError,
    ModuleNotFound,
    DependencyMissing,
    Conflict,
    SystemModuleProtected,
    ActiveDependentsBlocking,
    CircularDependency,
    LockContention,
    StoreFailure,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigParseError => "E1001",
            Self::ModuleNotFound => "E2001",
            Self::DependencyMissing => "E2002",
            Self::Conflict => "E2003",
            Self::SystemModuleProtected => "E2004",
            Self::ActiveDependentsBlocking => "E2005",
            Self::CircularDependency => "E2006",
            Self::LockContention => "E5001",
            Self::StoreFailure => "E5002",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigParseError => "Config file parse error",
            Self::ModuleNotFound => "Module not found",
            Self::DependencyMissing => "Required modules are inactive",
            Self::Conflict => "Conflicting modules are active",
            Self::SystemModuleProtected => "System module cannot be deactivated",
            Self::ActiveDependentsBlocking => "Active modules depend on this one",
            Self::CircularDependency => "Dependency would create a cycle",
            Self::LockContention => "Registry lock contention",
            Self::StoreFailure => "Module store failure",
        }
    }

    /// Optional remediation hint that can be surfaced to operators and agents.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigParseError => Some("Fix syntax in the switchboard config file and retry."),
            Self::ModuleNotFound => Some("Define the module first (directly or via `sb sync`)."),
            Self::DependencyMissing => Some("Activate the missing required modules first."),
            Self::Conflict => Some("Deactivate the conflicting modules first."),
            Self::SystemModuleProtected => None,
            Self::ActiveDependentsBlocking => {
                Some("Deactivate the dependent modules first, or switch the policy to cascade.")
            }
            Self::CircularDependency => {
                Some("Remove/adjust requires links to keep the graph acyclic.")
            }
            Self::LockContention => Some("Retry after the other switchboard process releases its lock."),
            Self::StoreFailure => Some("Check the database file and its permissions."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// All failures surfaced by the registry core.
///
/// Every rejected transition carries the offending key list (or cycle
/// chain), so callers can act or display without re-querying. None of these
/// are retried internally: retrying a blocked transition without external
/// state change cannot succeed.
#[derive(Debug, thiserror::Error)]
pub enum SwitchboardError {
    #[error("module '{key}' not found")]
    ModuleNotFound { key: String },

    #[error("cannot activate '{key}': missing dependencies: {}", .missing.join(", "))]
    DependencyMissing { key: String, missing: Vec<String> },

    #[error("cannot activate '{key}': conflicts with: {}", .conflicting.join(", "))]
    Conflict {
        key: String,
        conflicting: Vec<String>,
    },

    #[error("module '{key}' is a system module and cannot be deactivated")]
    SystemModuleProtected { key: String },

    #[error("cannot deactivate '{key}': active modules depend on it: {}", .dependents.join(", "))]
    ActiveDependentsBlocking {
        key: String,
        dependents: Vec<String>,
    },

    #[error("circular dependency detected: {}", .chain.join(" → "))]
    CircularDependency { chain: Vec<String> },

    #[error(transparent)]
    Lock(#[from] LockError),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl SwitchboardError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::ModuleNotFound { .. } => ErrorCode::ModuleNotFound,
            Self::DependencyMissing { .. } => ErrorCode::DependencyMissing,
            Self::Conflict { .. } => ErrorCode::Conflict,
            Self::SystemModuleProtected { .. } => ErrorCode::SystemModuleProtected,
            Self::ActiveDependentsBlocking { .. } => ErrorCode::ActiveDependentsBlocking,
            Self::CircularDependency { .. } => ErrorCode::CircularDependency,
            Self::Lock(_) => ErrorCode::LockContention,
            Self::Store(_) => ErrorCode::StoreFailure,
        }
    }

    /// Optional remediation hint for operators and agents.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.error_code().hint()
    }
}

/// Convenience alias used throughout the core.
pub type Result<T> = std::result::Result<T, SwitchboardError>;
