// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `dagrun`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "dagrun",
    version,
    about = "Run SQL nodes against a database in dependency order.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Dagrun.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Dagrun.toml")]
    pub config: String,

    /// Run only this node and everything downstream of it.
    ///
    /// Nodes outside that subgraph are treated as already satisfied.
    #[arg(long, value_name = "NODE")]
    pub from: Option<String>,

    /// Override `[connection].database` from the config file.
    #[arg(long, value_name = "PATH")]
    pub database: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `DAGRUN_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the execution plan, but don't run any SQL.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
