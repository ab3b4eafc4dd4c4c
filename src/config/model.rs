// src/config/model.rs

use std::path::PathBuf;

use serde::Deserialize;

/// Database used when neither `[connection]` nor the node names one.
pub const IN_MEMORY_DATABASE: &str = ":memory:";

/// Configuration exactly as read from TOML, before validation.
///
/// ```toml
/// [connection]
/// database = "warehouse.db"
///
/// [run]
/// satisfied = ["raw_orders"]
///
/// [[node]]
/// name = "stage_orders"
/// after = ["raw_orders"]
/// sql = "CREATE TABLE stage_orders AS SELECT * FROM raw_orders"
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub connection: ConnectionSection,

    #[serde(default)]
    pub run: RunSection,

    /// All `[[node]]` entries, in file order.
    #[serde(default)]
    pub node: Vec<NodeConfig>,
}

/// Validated configuration. Only constructible through
/// `ConfigFile::try_from(RawConfigFile)`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub connection: ConnectionSection,
    pub run: RunSection,
    pub node: Vec<NodeConfig>,
    /// Directory relative paths (`database`, `sql_file`) resolve against.
    pub base_dir: PathBuf,
}

impl ConfigFile {
    /// Wrap sections that already passed validation.
    pub(crate) fn new_unchecked(
        connection: ConnectionSection,
        run: RunSection,
        node: Vec<NodeConfig>,
    ) -> Self {
        Self {
            connection,
            run,
            node,
            base_dir: PathBuf::from("."),
        }
    }

    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = base_dir.into();
        self
    }
}

/// `[connection]` section: defaults for every node.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ConnectionSection {
    /// SQLite database path, or `":memory:"`.
    #[serde(default = "default_database")]
    pub database: String,

    /// Accepted for parity with schema-aware backends; SQLite ignores it.
    #[serde(default)]
    pub schema: Option<String>,

    #[serde(default)]
    pub busy_timeout_ms: Option<u64>,
}

fn default_database() -> String {
    IN_MEMORY_DATABASE.to_string()
}

impl Default for ConnectionSection {
    fn default() -> Self {
        Self {
            database: default_database(),
            schema: None,
            busy_timeout_ms: None,
        }
    }
}

/// `[run]` section.
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
pub struct RunSection {
    /// Names produced outside this run; they count as finished OK.
    #[serde(default)]
    pub satisfied: Vec<String>,
}

/// `[[node]]` entry.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct NodeConfig {
    pub name: String,

    /// Predecessors: this node waits for all of them.
    #[serde(default)]
    pub after: Vec<String>,

    /// Inline SQL. Exactly one of `sql` / `sql_file` must be set.
    #[serde(default)]
    pub sql: Option<String>,

    /// Path to a SQL file, read when the node runs.
    #[serde(default)]
    pub sql_file: Option<String>,

    #[serde(default)]
    pub database: Option<String>,

    #[serde(default)]
    pub schema: Option<String>,

    #[serde(default)]
    pub busy_timeout_ms: Option<u64>,
}

impl NodeConfig {
    /// Minimal inline-SQL node.
    pub fn inline(name: &str, sql: &str) -> Self {
        Self {
            name: name.to_string(),
            after: Vec::new(),
            sql: Some(sql.to_string()),
            sql_file: None,
            database: None,
            schema: None,
            busy_timeout_ms: None,
        }
    }
}
