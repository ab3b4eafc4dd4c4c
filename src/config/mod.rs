// src/config/mod.rs

//! Configuration loading and validation for dagrun.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate node definitions and DAG correctness (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{config_root_dir, load_and_validate, load_from_fs, load_from_path};
pub use model::{ConfigFile, ConnectionSection, NodeConfig, RawConfigFile, RunSection};
pub use validate::validate_config;
