use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Group assigned to modules that do not declare one.
pub const DEFAULT_GROUP: &str = "general";

/// What happens to a module's active dependents when it is deactivated.
///
/// The policy only matters when other *active* modules hold a REQUIRES edge
/// to the module being deactivated:
///
/// - `Cascade` — active dependents are deactivated together with the module,
///   in one atomic unit of work.
/// - `Restrict` — deactivation is refused while active dependents exist.
/// - `None` — deactivation proceeds and dependents are left active with a
///   now-inactive requirement (a permitted inconsistency; see
///   [`dangling_requirements`]).
///
/// [`dangling_requirements`]: crate::graph::resolver::dangling_requirements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeactivationPolicy {
    Cascade,
    Restrict,
    None,
}

impl DeactivationPolicy {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Cascade => "cascade",
            Self::Restrict => "restrict",
            Self::None => "none",
        }
    }
}

impl Default for DeactivationPolicy {
    fn default() -> Self {
        Self::Restrict
    }
}

/// The three kinds of dependency edge.
///
/// - `Requires` gates activation (targets must be active) and deactivation
///   (dependents constrain it via [`DeactivationPolicy`]). The REQUIRES
///   subgraph is kept acyclic at edge-insertion time.
/// - `Conflicts` blocks simultaneous activation; stored symmetrically.
/// - `Suggests` is advisory only and never consulted by eligibility checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    Requires,
    Conflicts,
    Suggests,
}

impl EdgeKind {
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::Requires => "requires",
            Self::Conflicts => "conflicts",
            Self::Suggests => "suggests",
        }
    }
}

/// All persisted fields for a module (the store-level aggregate).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleRecord {
    /// Unique, immutable identity. Never reused.
    pub key: String,
    pub name: String,
    pub description: Option<String>,
    pub group: String,
    pub icon: Option<String>,
    /// Listing order; ties broken by `name`.
    pub sort_order: i64,
    /// Mutated exclusively by the activation state machine.
    pub is_active: bool,
    /// Once true, the module can never transition to inactive.
    pub is_system: bool,
    pub on_deactivate: DeactivationPolicy,
    /// Free-form JSON document; dotted-path access via [`ModuleRecord::meta`].
    pub metadata: Option<serde_json::Value>,
    /// Parent module key. Parent links form a forest, independent of the
    /// dependency graph.
    pub parent: Option<String>,
    pub created_at_us: i64,
    pub updated_at_us: i64,
}

impl Default for ModuleRecord {
    fn default() -> Self {
        Self {
            key: String::new(),
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
            created_at_us: 0,
            updated_at_us: 0,
        }
    }
}

impl ModuleRecord {
    /// Returns `true` if the module has no parent.
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Look up a metadata value by dotted path (e.g. `"billing.provider"`).
    pub fn meta(&self, path: &str) -> Option<&serde_json::Value> {
        super::metadata::get(self.metadata.as_ref(), path)
    }

    /// Set a metadata value by dotted path, creating intermediate objects.
    pub fn set_meta(&mut self, path: &str, value: serde_json::Value) {
        super::metadata::set(&mut self.metadata, path, value);
    }
}

/// A directed, typed dependency edge between two modules.
///
/// `(module, target, kind)` is unique: the same pair may be linked by at
/// most one edge of each kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleEdge {
    pub module: String,
    pub target: String,
    pub kind: EdgeKind,
    pub created_at_us: i64,
}

/// Error returned when parsing an enum value from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEnumError {
    pub expected: &'static str,
    pub got: String,
}

impl fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: '{}'", self.expected, self.got)
    }
}

impl std::error::Error for ParseEnumError {}

impl fmt::Display for DeactivationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn normalize(input: &str) -> String {
    input.trim().to_ascii_lowercase()
}

impl FromStr for DeactivationPolicy {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "cascade" => Ok(Self::Cascade),
            "restrict" => Ok(Self::Restrict),
            "none" => Ok(Self::None),
            _ => Err(ParseEnumError {
                expected: "deactivation policy",
                got: s.to_string(),
            }),
        }
    }
}

impl FromStr for EdgeKind {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "requires" => Ok(Self::Requires),
            "conflicts" => Ok(Self::Conflicts),
            "suggests" => Ok(Self::Suggests),
            _ => Err(ParseEnumError {
                expected: "edge kind",
                got: s.to_string(),
            }),
        }
    }
}
