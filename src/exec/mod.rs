// src/exec/mod.rs

//! Node execution layer.
//!
//! - [`connection`] defines the `Connection` trait the executor drives and
//!   the resolved per-node connection settings.
//! - [`sqlite`] is the production `Connection`, built on `rusqlite`.
//! - [`executor`] resolves a node's settings, loads its SQL and runs it
//!   through a connection handle lent for that one call.

pub mod connection;
pub mod executor;
pub mod sqlite;

pub use connection::{Connection, ConnectionConfig, DatabaseLocation};
pub use executor::Executor;
pub use sqlite::SqliteConnection;
