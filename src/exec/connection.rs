// src/exec/connection.rs

//! Pluggable database connection abstraction.
//!
//! The executor talks to a `Connection` instead of a concrete driver. The
//! runner owns the handle and lends it to the executor for one node at a
//! time, so nothing else can touch it mid-node. Production uses
//! [`SqliteConnection`](super::sqlite::SqliteConnection); tests plug in a
//! fake that records queries.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::model::IN_MEMORY_DATABASE;
use crate::errors::Result;

/// Where the database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseLocation {
    InMemory,
    File(PathBuf),
}

impl DatabaseLocation {
    /// Parse a configured database string; relative paths resolve against
    /// `base_dir`.
    pub fn resolve(raw: &str, base_dir: &Path) -> Self {
        let raw = raw.trim();
        if raw == IN_MEMORY_DATABASE {
            return DatabaseLocation::InMemory;
        }

        let path = PathBuf::from(raw);
        if path.is_absolute() {
            DatabaseLocation::File(path)
        } else {
            DatabaseLocation::File(base_dir.join(path))
        }
    }
}

/// Fully resolved settings applied to a connection before a node runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub location: DatabaseLocation,
    pub schema: Option<String>,
    pub busy_timeout: Option<Duration>,
}

/// Trait abstracting the database a node runs against.
pub trait Connection: Send {
    /// Point the connection at the node's database and apply its options.
    ///
    /// Called before every node; implementations should only reconnect when
    /// the location actually changes.
    fn setup(&mut self, config: &ConnectionConfig) -> Result<()>;

    /// Run the node's SQL inside the current transaction.
    fn execute(&mut self, query: &str) -> Result<()>;

    fn commit(&mut self) -> Result<()>;

    fn rollback(&mut self) -> Result<()>;
}
