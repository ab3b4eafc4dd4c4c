// src/exec/executor.rs

//! Runs one node's SQL against a connection.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::config::model::{ConfigFile, ConnectionSection};
use crate::dag::Node;
use crate::engine::NodeOutcome;
use crate::errors::Result;
use crate::exec::connection::{Connection, ConnectionConfig, DatabaseLocation};
use crate::fs::{FileSystem, RealFileSystem};

/// Executes nodes. Holds only the connection defaults and the filesystem
/// SQL files are read from; the connection itself is lent per call.
#[derive(Debug, Clone)]
pub struct Executor {
    defaults: ConnectionSection,
    base_dir: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl Executor {
    pub fn new(defaults: ConnectionSection, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            defaults,
            base_dir: base_dir.into(),
            fs: Arc::new(RealFileSystem),
        }
    }

    pub fn from_config(cfg: &ConfigFile) -> Self {
        Self::new(cfg.connection.clone(), cfg.base_dir.clone())
    }

    /// Read SQL files through `fs` instead of the real filesystem.
    pub fn with_fs(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    /// Node overrides win over `[connection]` defaults.
    pub fn resolve_config(&self, node: &Node) -> ConnectionConfig {
        let database = node
            .overrides
            .database
            .as_deref()
            .unwrap_or(&self.defaults.database);
        let schema = node
            .overrides
            .schema
            .clone()
            .or_else(|| self.defaults.schema.clone());
        let busy_timeout = node
            .overrides
            .busy_timeout_ms
            .or(self.defaults.busy_timeout_ms)
            .map(Duration::from_millis);

        ConnectionConfig {
            location: DatabaseLocation::resolve(database, &self.base_dir),
            schema,
            busy_timeout,
        }
    }

    /// Configure `conn` for `node`, run its SQL and commit.
    ///
    /// Any error along the way is logged, the transaction is rolled back and
    /// the node is reported as failed; nothing propagates to the caller.
    pub fn execute(&self, node: &mut Node, conn: &mut dyn Connection) -> NodeOutcome {
        info!(node = %node.name, "executing node");

        match self.try_execute(node, conn) {
            Ok(()) => NodeOutcome::Success,
            Err(err) => {
                error!(node = %node.name, error = %err, "node execution failed");
                if let Err(rb) = conn.rollback() {
                    warn!(node = %node.name, error = %rb, "rollback after failure also failed");
                }
                NodeOutcome::Failed(err.to_string())
            }
        }
    }

    fn try_execute(&self, node: &mut Node, conn: &mut dyn Connection) -> Result<()> {
        let config = self.resolve_config(node);
        debug!(node = %node.name, ?config, "applying connection config");
        conn.setup(&config)?;

        let query = node.query(self.fs.as_ref(), &self.base_dir)?;
        conn.execute(query)?;
        conn.commit()?;
        Ok(())
    }
}
