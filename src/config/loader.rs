// src/config/loader.rs

use std::path::{Path, PathBuf};

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;
use crate::fs::{FileSystem, RealFileSystem};

/// Load a configuration file and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    load_from_fs(&RealFileSystem, path.as_ref())
}

/// Same as [`load_from_path`], reading through the given filesystem.
pub fn load_from_fs(fs: &dyn FileSystem, path: &Path) -> Result<RawConfigFile> {
    let contents = fs.read_to_string(path)?;
    let config: RawConfigFile = toml::from_str(&contents)?;
    Ok(config)
}

/// Load a configuration file from path and validate it.
///
/// - Reads TOML.
/// - Applies defaults (handled by `serde` + `Default` impls).
/// - Checks node work specs, names, predecessors and cycles.
/// - Records the config directory as the base for relative paths.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    let raw_config = load_from_path(path)?;
    let config = ConfigFile::try_from(raw_config)?.with_base_dir(config_root_dir(path));
    Ok(config)
}

/// Directory that relative paths in the config resolve against.
///
/// - If the config path has a non-empty parent (e.g. "etl/Dagrun.toml"),
///   that directory is used.
/// - For a bare filename like "Dagrun.toml" (parent = ""), fall back to the
///   current working directory.
pub fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}
