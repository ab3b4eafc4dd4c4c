// tests/runner_fake_connection.rs

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use dagrun_test_utils::builders::{ConfigFileBuilder, NodeConfigBuilder};
use dagrun_test_utils::fake_connection::{executed_queries, FakeCall, FakeConnection};
use dagrun_test_utils::init_tracing;

use dagrun::build_scheduler;
use dagrun::config::model::ConfigFile;
use dagrun::dag::NodeStatus;
use dagrun::engine::{CancelFlag, Runner};
use dagrun::exec::{ConnectionConfig, DatabaseLocation, Executor};
use dagrun::fs::mock::MockFileSystem;

fn runner_for(cfg: &ConfigFile) -> Runner {
    let scheduler = build_scheduler(cfg, None).unwrap();
    Runner::new(scheduler, Executor::from_config(cfg))
}

#[test]
fn every_node_is_setup_executed_and_committed_in_order() {
    init_tracing();

    let cfg = ConfigFileBuilder::new()
        .with_node(NodeConfigBuilder::new("load", "INSERT 1").build())
        .with_node(NodeConfigBuilder::new("stage", "INSERT 2").after("load").build())
        .build();

    let calls = Arc::new(Mutex::new(Vec::new()));
    let mut conn = FakeConnection::new(calls.clone());
    runner_for(&cfg).run(&mut conn).unwrap();

    let memory = ConnectionConfig {
        location: DatabaseLocation::InMemory,
        schema: None,
        busy_timeout: None,
    };
    assert_eq!(
        *calls.lock().unwrap(),
        vec![
            FakeCall::Setup(memory.clone()),
            FakeCall::Execute("INSERT 1".to_string()),
            FakeCall::Commit,
            FakeCall::Setup(memory),
            FakeCall::Execute("INSERT 2".to_string()),
            FakeCall::Commit,
        ]
    );
}

#[test]
fn failed_execute_rolls_back_instead_of_committing() {
    init_tracing();

    let cfg = ConfigFileBuilder::new()
        .with_node(NodeConfigBuilder::new("bad", "BROKEN SQL").build())
        .build();

    let calls = Arc::new(Mutex::new(Vec::new()));
    let mut conn = FakeConnection::new(calls.clone()).failing_on("BROKEN SQL");
    let mut runner = runner_for(&cfg);
    let report = runner.run(&mut conn).unwrap();

    let log = calls.lock().unwrap().clone();
    assert!(log.contains(&FakeCall::Rollback));
    assert!(!log.contains(&FakeCall::Commit));
    assert_eq!(report.count(NodeStatus::FinishedNok), 1);
}

#[test]
fn node_overrides_reach_the_connection() {
    init_tracing();

    let cfg = ConfigFileBuilder::new()
        .with_database("main.db")
        .with_node(NodeConfigBuilder::new("default", "SELECT 1").build())
        .with_node(
            NodeConfigBuilder::new("archive", "SELECT 2")
                .database("/data/archive.db")
                .schema("cold")
                .busy_timeout_ms(250)
                .build(),
        )
        .build()
        .with_base_dir(PathBuf::from("/etl"));

    let calls = Arc::new(Mutex::new(Vec::new()));
    let mut conn = FakeConnection::new(calls.clone());
    runner_for(&cfg).run(&mut conn).unwrap();

    let setups: Vec<ConnectionConfig> = calls
        .lock()
        .unwrap()
        .iter()
        .filter_map(|c| match c {
            FakeCall::Setup(cfg) => Some(cfg.clone()),
            _ => None,
        })
        .collect();

    assert_eq!(
        setups,
        vec![
            ConnectionConfig {
                location: DatabaseLocation::File(PathBuf::from("/etl/main.db")),
                schema: None,
                busy_timeout: None,
            },
            ConnectionConfig {
                location: DatabaseLocation::File(PathBuf::from("/data/archive.db")),
                schema: Some("cold".to_string()),
                busy_timeout: Some(Duration::from_millis(250)),
            },
        ]
    );
}

#[test]
fn sql_files_are_read_through_the_filesystem_abstraction() {
    init_tracing();

    let fs = MockFileSystem::new();
    fs.add_file(Path::new("/etl/sql/load.sql"), "INSERT INTO t VALUES (1);");

    let cfg = ConfigFileBuilder::new()
        .with_node(NodeConfigBuilder::from_file("load", "sql/load.sql").build())
        .with_node(NodeConfigBuilder::from_file("missing", "sql/missing.sql").build())
        .with_node(NodeConfigBuilder::new("after_missing", "SELECT 1").after("missing").build())
        .build()
        .with_base_dir(PathBuf::from("/etl"));

    let scheduler = build_scheduler(&cfg, None).unwrap();
    let executor = Executor::from_config(&cfg).with_fs(Arc::new(fs));
    let mut runner = Runner::new(scheduler, executor);

    let calls = Arc::new(Mutex::new(Vec::new()));
    let mut conn = FakeConnection::new(calls.clone());
    runner.run(&mut conn).unwrap();

    assert_eq!(
        executed_queries(&calls),
        vec!["INSERT INTO t VALUES (1);".to_string()]
    );

    let s = runner.scheduler();
    assert_eq!(s.status_of("load"), Some(NodeStatus::FinishedOk));
    assert_eq!(s.status_of("missing"), Some(NodeStatus::FinishedNok));
    assert_eq!(s.status_of("after_missing"), Some(NodeStatus::Skip));
}

#[test]
fn satisfied_sources_unblock_their_dependents() {
    init_tracing();

    let cfg = ConfigFileBuilder::new()
        .with_satisfied("upstream_export")
        .with_node(
            NodeConfigBuilder::new("import", "IMPORT")
                .after("upstream_export")
                .build(),
        )
        .build();

    let calls = Arc::new(Mutex::new(Vec::new()));
    let mut conn = FakeConnection::new(calls.clone());
    let report = runner_for(&cfg).run(&mut conn).unwrap();

    assert_eq!(executed_queries(&calls), vec!["IMPORT".to_string()]);
    assert!(report.is_success());
}

#[test]
fn from_restricts_the_run_to_the_downstream_subgraph() {
    init_tracing();

    let cfg = ConfigFileBuilder::new()
        .with_node(NodeConfigBuilder::new("load", "load").build())
        .with_node(NodeConfigBuilder::new("stage", "stage").after("load").build())
        .with_node(NodeConfigBuilder::new("mart", "mart").after("stage").build())
        .with_node(NodeConfigBuilder::new("other", "other").after("load").build())
        .build();

    let scheduler = build_scheduler(&cfg, Some("stage")).unwrap();
    let mut runner = Runner::new(scheduler, Executor::from_config(&cfg));

    let calls = Arc::new(Mutex::new(Vec::new()));
    let mut conn = FakeConnection::new(calls.clone());
    runner.run(&mut conn).unwrap();

    assert_eq!(executed_queries(&calls), vec!["stage", "mart"]);
    assert!(runner.scheduler().node("load").is_none());
    assert!(runner.scheduler().node("other").is_none());
}

#[test]
fn from_with_unknown_node_is_rejected() {
    let cfg = ConfigFileBuilder::new()
        .with_node(NodeConfigBuilder::new("load", "load").build())
        .build();

    let err = build_scheduler(&cfg, Some("nope")).unwrap_err();
    assert!(matches!(err, dagrun::errors::DagrunError::NodeNotFound(name) if name == "nope"));
}

#[test]
fn cancel_flag_stops_dispatch_and_reports_remaining_nodes() {
    init_tracing();

    let cfg = ConfigFileBuilder::new()
        .with_node(NodeConfigBuilder::new("a", "a").build())
        .with_node(NodeConfigBuilder::new("b", "b").after("a").build())
        .build();

    let flag = CancelFlag::new();
    flag.cancel();
    let mut runner = runner_for(&cfg).with_cancel_flag(flag);

    let calls = Arc::new(Mutex::new(Vec::new()));
    let mut conn = FakeConnection::new(calls.clone());
    let report = runner.run(&mut conn).unwrap();

    assert!(calls.lock().unwrap().is_empty());
    assert!(report.cancelled);
    assert!(!report.is_success());
    assert_eq!(report.not_run, vec!["a".to_string(), "b".to_string()]);
    assert!(report.summary().ends_with("(cancelled)"));
}
