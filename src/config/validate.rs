// src/config/validate.rs

use std::collections::HashSet;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::dag::graph::validate_node_set;
use crate::errors::{DagrunError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = DagrunError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.connection, raw.run, raw.node))
    }
}

/// Run every check on a raw config.
pub fn validate_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_nodes(cfg)?;
    validate_connection(cfg)?;
    validate_node_work(cfg)?;
    validate_dag(cfg)?;
    Ok(())
}

fn ensure_has_nodes(cfg: &RawConfigFile) -> Result<()> {
    if cfg.node.is_empty() {
        return Err(DagrunError::ConfigError(
            "config must contain at least one [[node]] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_connection(cfg: &RawConfigFile) -> Result<()> {
    if cfg.connection.database.trim().is_empty() {
        return Err(DagrunError::ConfigError(
            "[connection].database must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_node_work(cfg: &RawConfigFile) -> Result<()> {
    for node in &cfg.node {
        if node.name.trim().is_empty() {
            return Err(DagrunError::ConfigError(
                "every [[node]] needs a non-empty `name`".to_string(),
            ));
        }

        match (&node.sql, &node.sql_file) {
            (Some(_), None) | (None, Some(_)) => {}
            (Some(_), Some(_)) => {
                return Err(DagrunError::ConfigError(format!(
                    "node '{}' sets both `sql` and `sql_file`; pick one",
                    node.name
                )));
            }
            (None, None) => {
                return Err(DagrunError::ConfigError(format!(
                    "node '{}' needs either `sql` or `sql_file`",
                    node.name
                )));
            }
        }

        if let Some(db) = &node.database {
            if db.trim().is_empty() {
                return Err(DagrunError::ConfigError(format!(
                    "node '{}' has an empty `database` override",
                    node.name
                )));
            }
        }
    }
    Ok(())
}

fn validate_dag(cfg: &RawConfigFile) -> Result<()> {
    let satisfied: HashSet<String> = cfg.run.satisfied.iter().cloned().collect();
    validate_node_set(
        cfg.node
            .iter()
            .map(|n| (n.name.as_str(), n.after.as_slice())),
        &satisfied,
    )
}
