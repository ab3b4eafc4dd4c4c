// src/dag/node.rs

//! Node metadata and per-run state.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::debug;

use crate::config::model::NodeConfig;
use crate::engine::NodeName;
use crate::errors::Result;
use crate::fs::FileSystem;

/// Lifecycle state of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeStatus {
    /// Waiting for predecessors (initial state).
    Pending,
    /// Handed to the executor.
    Running,
    /// Work ran and committed.
    FinishedOk,
    /// Work ran (or tried to) and failed.
    FinishedNok,
    /// Never executed because a predecessor failed or was skipped.
    Skip,
}

impl NodeStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            NodeStatus::FinishedOk | NodeStatus::FinishedNok | NodeStatus::Skip
        )
    }

    /// Terminal states that block dependents.
    pub fn is_failure(self) -> bool {
        matches!(self, NodeStatus::FinishedNok | NodeStatus::Skip)
    }
}

/// Where a node's SQL comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkSpec {
    Sql(String),
    /// Read on first use; relative paths resolve against the config directory.
    SqlFile(PathBuf),
}

/// Per-node connection settings that override `[connection]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionOverrides {
    pub database: Option<String>,
    pub schema: Option<String>,
    pub busy_timeout_ms: Option<u64>,
}

/// A unit of scheduled work plus its per-run state.
#[derive(Debug, Clone)]
pub struct Node {
    pub name: NodeName,
    /// Names from `after = [...]`, in declaration order.
    pub predecessors: Vec<NodeName>,
    pub status: NodeStatus,
    pub elapsed: Option<Duration>,
    pub work: WorkSpec,
    pub overrides: ConnectionOverrides,
    /// Failed or skipped predecessors that caused a `Skip`.
    pub blocked_by: Vec<NodeName>,
    query: Option<String>,
}

impl Node {
    /// Repeated predecessor names are collapsed, keeping the first occurrence.
    pub fn new(name: impl Into<NodeName>, predecessors: Vec<NodeName>, work: WorkSpec) -> Self {
        let mut seen = HashSet::new();
        let predecessors = predecessors
            .into_iter()
            .filter(|p| seen.insert(p.clone()))
            .collect();

        Self {
            name: name.into(),
            predecessors,
            status: NodeStatus::Pending,
            elapsed: None,
            work,
            overrides: ConnectionOverrides::default(),
            blocked_by: Vec::new(),
            query: None,
        }
    }

    /// Build a node from a validated `[[node]]` entry.
    pub fn from_config(cfg: &NodeConfig) -> Self {
        // Validation guarantees exactly one of `sql` / `sql_file`.
        let work = match (&cfg.sql, &cfg.sql_file) {
            (Some(sql), _) => WorkSpec::Sql(sql.clone()),
            (None, Some(path)) => WorkSpec::SqlFile(PathBuf::from(path)),
            (None, None) => WorkSpec::Sql(String::new()),
        };

        let mut node = Node::new(cfg.name.clone(), cfg.after.clone(), work);
        node.overrides = ConnectionOverrides {
            database: cfg.database.clone(),
            schema: cfg.schema.clone(),
            busy_timeout_ms: cfg.busy_timeout_ms,
        };
        node
    }

    /// Start the node in a given state (e.g. terminal from an earlier run).
    pub fn with_status(mut self, status: NodeStatus) -> Self {
        self.status = status;
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// SQL text for this node, loading `sql_file` on first call.
    pub fn query(&mut self, fs: &dyn FileSystem, base_dir: &Path) -> Result<&str> {
        if self.query.is_none() {
            let text = match &self.work {
                WorkSpec::Sql(sql) => sql.clone(),
                WorkSpec::SqlFile(path) => {
                    let full = if path.is_absolute() {
                        path.clone()
                    } else {
                        base_dir.join(path)
                    };
                    debug!(node = %self.name, path = ?full, "loading SQL file");
                    fs.read_to_string(&full)?
                }
            };
            self.query = Some(text);
        }

        Ok(self.query.as_deref().unwrap_or_default())
    }
}
