// src/exec/sqlite.rs

//! SQLite connection backend built on `rusqlite`.

use anyhow::anyhow;
use md5::{Digest, Md5};
use rusqlite::functions::{Context, FunctionFlags};
use rusqlite::types::ValueRef;
use tracing::{debug, info};

use crate::errors::{DagrunError, Result};
use crate::exec::connection::{Connection, ConnectionConfig, DatabaseLocation};

/// Production [`Connection`] backed by a single SQLite handle.
///
/// - The handle is opened lazily on the first `setup` and reopened only when
///   a node targets a different database, so `:memory:` data survives from
///   node to node.
/// - `execute` opens a transaction if none is active; `commit` / `rollback`
///   close it. Node SQL must therefore not issue its own `BEGIN`/`COMMIT`.
/// - Every opened handle gets an `MD5(x)` scalar function returning the
///   lowercase hex digest of `x`, since SQLite ships no hash function.
#[derive(Debug, Default)]
pub struct SqliteConnection {
    conn: Option<rusqlite::Connection>,
    location: Option<DatabaseLocation>,
}

impl SqliteConnection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Underlying handle, once `setup` has run.
    pub fn raw(&self) -> Option<&rusqlite::Connection> {
        self.conn.as_ref()
    }

    fn prepared(&self) -> Result<&rusqlite::Connection> {
        self.conn
            .as_ref()
            .ok_or_else(|| DagrunError::Other(anyhow!("connection is not prepared to execute")))
    }

    fn open(location: &DatabaseLocation) -> Result<rusqlite::Connection> {
        let conn = match location {
            DatabaseLocation::InMemory => rusqlite::Connection::open_in_memory()?,
            DatabaseLocation::File(path) => rusqlite::Connection::open(path)?,
        };
        register_functions(&conn)?;
        Ok(conn)
    }
}

fn register_functions(conn: &rusqlite::Connection) -> Result<()> {
    conn.create_scalar_function(
        "MD5",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        md5_function,
    )?;
    debug!("registered MD5 function");
    Ok(())
}

/// `MD5(x)`: NULL stays NULL; numbers are hashed in their decimal text form.
fn md5_function(ctx: &Context<'_>) -> rusqlite::Result<Option<String>> {
    let digest = match ctx.get_raw(0) {
        ValueRef::Null => return Ok(None),
        ValueRef::Integer(i) => md5_hex(i.to_string().as_bytes()),
        ValueRef::Real(f) => md5_hex(f.to_string().as_bytes()),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => md5_hex(bytes),
    };
    Ok(Some(digest))
}

fn md5_hex(bytes: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

impl Connection for SqliteConnection {
    fn setup(&mut self, config: &ConnectionConfig) -> Result<()> {
        if self.conn.is_none() || self.location.as_ref() != Some(&config.location) {
            // Unset until the new handle is open.
            self.location = None;
            if let Some(old) = self.conn.take() {
                old.close().map_err(|(_, e)| e)?;
            }
            info!(location = ?config.location, "opening SQLite database");
            self.conn = Some(Self::open(&config.location)?);
            self.location = Some(config.location.clone());
        }

        let conn = self.prepared()?;
        if let Some(timeout) = config.busy_timeout {
            conn.busy_timeout(timeout)?;
        }
        if let Some(schema) = &config.schema {
            debug!(schema = %schema, "SQLite has no schemas; ignoring `schema`");
        }
        Ok(())
    }

    fn execute(&mut self, query: &str) -> Result<()> {
        let conn = self.prepared()?;

        if query.trim().is_empty() {
            debug!("empty query; nothing to load");
            return Ok(());
        }

        if conn.is_autocommit() {
            conn.execute_batch("BEGIN")?;
        }
        conn.execute_batch(query)?;
        debug!(bytes = query.len(), "query batch executed");
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        let conn = self.prepared()?;
        if !conn.is_autocommit() {
            conn.execute_batch("COMMIT")?;
        }
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        let conn = self.prepared()?;
        if !conn.is_autocommit() {
            conn.execute_batch("ROLLBACK")?;
        }
        Ok(())
    }
}
