// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod report;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::load_and_validate;
use crate::config::model::{ConfigFile, IN_MEMORY_DATABASE};
use crate::dag::{Node, PlanStep, Scheduler};
use crate::engine::{CancelFlag, Runner};
use crate::exec::{Executor, SqliteConnection};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - scheduler (optionally restricted to a downstream subgraph)
/// - executor + SQLite connection
/// - Ctrl-C handling
///
/// Returns `true` when every node finished OK (or on `--dry-run`).
pub async fn run(args: CliArgs) -> Result<bool> {
    let mut cfg = load_and_validate(&args.config)?;

    if let Some(db) = &args.database {
        cfg.connection.database = cli_database(db)?;
    }

    let scheduler = build_scheduler(&cfg, args.from.as_deref())?;

    if args.dry_run {
        print_dry_run(&cfg, &scheduler);
        return Ok(true);
    }

    let executor = Executor::from_config(&cfg);

    // Ctrl-C → finish the current node, then stop.
    let cancel = CancelFlag::new();
    {
        let flag = cancel.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            warn!("Ctrl-C received; stopping after the current node");
            flag.cancel();
        });
    }

    let mut runner = Runner::new(scheduler, executor).with_cancel_flag(cancel);

    // The run blocks on SQLite; keep it off the async workers.
    let report = tokio::task::spawn_blocking(move || {
        let mut conn = SqliteConnection::new();
        runner.run(&mut conn)
    })
    .await
    .context("run thread panicked")??;

    println!("{report}");
    Ok(report.is_success())
}

/// Build the scheduler for a validated config.
pub fn build_scheduler(cfg: &ConfigFile, from: Option<&str>) -> crate::errors::Result<Scheduler> {
    let nodes: Vec<Node> = cfg.node.iter().map(Node::from_config).collect();
    let scheduler = Scheduler::new(nodes, cfg.run.satisfied.iter().cloned())?;

    match from {
        Some(root) => scheduler.restrict_to_downstream(root),
        None => Ok(scheduler),
    }
}

/// `--database` paths are relative to the working directory, not the config.
fn cli_database(raw: &str) -> Result<String> {
    if raw.trim() == IN_MEMORY_DATABASE {
        return Ok(IN_MEMORY_DATABASE.to_string());
    }
    let path = std::env::current_dir()
        .context("resolving --database against the working directory")?
        .join(raw);
    Ok(path.to_string_lossy().into_owned())
}

/// Simple dry-run output: connection, nodes and the execution plan.
fn print_dry_run(cfg: &ConfigFile, scheduler: &Scheduler) {
    println!("dagrun dry-run");
    println!("  connection.database = {}", cfg.connection.database);
    if let Some(schema) = &cfg.connection.schema {
        println!("  connection.schema = {schema}");
    }
    if !cfg.run.satisfied.is_empty() {
        println!("  run.satisfied = {:?}", cfg.run.satisfied);
    }
    println!();

    println!("nodes ({}):", scheduler.nodes().len());
    for node in scheduler.nodes() {
        println!("  - {}", node.name);
        if !node.predecessors.is_empty() {
            println!("      after: {:?}", node.predecessors);
        }
        if let Some(db) = &node.overrides.database {
            println!("      database: {db}");
        }
    }
    println!();

    println!("plan:");
    for (i, step) in scheduler.plan().iter().enumerate() {
        match step {
            PlanStep::Run(name) => println!("  {:>3}. run  {name}", i + 1),
            PlanStep::Skip(name) => println!("  {:>3}. skip {name}", i + 1),
        }
    }

    info!("dry-run complete (no execution)");
    debug!(nodes = scheduler.nodes().len(), "dry-run plan printed");
}
