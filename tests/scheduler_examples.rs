// tests/scheduler_examples.rs

use std::sync::{Arc, Mutex};

use dagrun_test_utils::builders::named_node;
use dagrun_test_utils::fake_connection::{executed_queries, FakeConnection};
use dagrun_test_utils::init_tracing;

use dagrun::config::ConnectionSection;
use dagrun::dag::{NodeStatus, Scheduler};
use dagrun::engine::Runner;
use dagrun::errors::DagrunError;
use dagrun::exec::Executor;

fn executor() -> Executor {
    Executor::new(ConnectionSection::default(), ".")
}

/// A (no deps), B (after A), C (after A).
fn fan_out() -> Scheduler {
    Scheduler::new(
        vec![
            named_node("A", &[]),
            named_node("B", &["A"]),
            named_node("C", &["A"]),
        ],
        Vec::new(),
    )
    .unwrap()
}

#[test]
fn fan_out_runs_both_dependents_when_root_succeeds() {
    init_tracing();

    let calls = Arc::new(Mutex::new(Vec::new()));
    let mut conn = FakeConnection::new(calls.clone());
    let mut runner = Runner::new(fan_out(), executor());

    let report = runner.run(&mut conn).unwrap();

    let executed = executed_queries(&calls);
    assert_eq!(executed[0], "A");
    let mut rest = executed[1..].to_vec();
    rest.sort();
    assert_eq!(rest, vec!["B".to_string(), "C".to_string()]);

    assert!(report.is_success());
    for name in ["A", "B", "C"] {
        assert_eq!(
            runner.scheduler().status_of(name),
            Some(NodeStatus::FinishedOk)
        );
    }
}

#[test]
fn fan_out_skips_both_dependents_when_root_fails() {
    init_tracing();

    let calls = Arc::new(Mutex::new(Vec::new()));
    let mut conn = FakeConnection::new(calls.clone()).failing_on("A");
    let mut runner = Runner::new(fan_out(), executor());

    let report = runner.run(&mut conn).unwrap();

    assert_eq!(executed_queries(&calls), vec!["A".to_string()]);
    let s = runner.scheduler();
    assert_eq!(s.status_of("A"), Some(NodeStatus::FinishedNok));
    assert_eq!(s.status_of("B"), Some(NodeStatus::Skip));
    assert_eq!(s.status_of("C"), Some(NodeStatus::Skip));
    assert_eq!(s.node("B").unwrap().blocked_by, vec!["A".to_string()]);

    let lines: Vec<String> = report.entries.iter().map(|e| e.to_string()).collect();
    assert_eq!(
        lines,
        vec![
            "NOK   A".to_string(),
            "SKIP  B (blocked by A)".to_string(),
            "SKIP  C (blocked by A)".to_string(),
        ]
    );
}

#[test]
fn unknown_predecessor_is_a_configuration_error_not_a_hang() {
    init_tracing();

    let result = Scheduler::new(vec![named_node("D", &["Z"])], Vec::new());
    match result {
        Err(DagrunError::ConfigError(msg)) => {
            assert!(msg.contains("unknown predecessor"));
            assert!(msg.contains("'Z'"));
        }
        Err(e) => panic!("Expected ConfigError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn cycle_is_rejected_before_anything_runs() {
    init_tracing();

    let result = Scheduler::new(
        vec![named_node("A", &["B"]), named_node("B", &["A"])],
        Vec::new(),
    );
    assert!(matches!(result, Err(DagrunError::DagCycle(_))));
}

#[test]
fn fully_terminal_node_set_runs_nothing() {
    init_tracing();

    let scheduler = Scheduler::new(
        vec![
            named_node("A", &[]).with_status(NodeStatus::FinishedOk),
            named_node("B", &["A"]).with_status(NodeStatus::Skip),
        ],
        Vec::new(),
    )
    .unwrap();

    let calls = Arc::new(Mutex::new(Vec::new()));
    let mut conn = FakeConnection::new(calls.clone());
    let report = Runner::new(scheduler, executor()).run(&mut conn).unwrap();

    assert!(calls.lock().unwrap().is_empty());
    assert!(report.entries.is_empty());
}

#[test]
fn diamond_waits_for_both_branches() {
    init_tracing();

    let scheduler = Scheduler::new(
        vec![
            named_node("src", &[]),
            named_node("left", &["src"]),
            named_node("right", &["src"]),
            named_node("join", &["left", "right"]),
        ],
        Vec::new(),
    )
    .unwrap();

    let calls = Arc::new(Mutex::new(Vec::new()));
    let mut conn = FakeConnection::new(calls.clone());
    Runner::new(scheduler, executor()).run(&mut conn).unwrap();

    assert_eq!(
        executed_queries(&calls),
        vec!["src", "left", "right", "join"]
    );
}

#[test]
fn partial_failure_only_skips_the_failed_branch() {
    init_tracing();

    let scheduler = Scheduler::new(
        vec![
            named_node("src", &[]),
            named_node("left", &["src"]),
            named_node("right", &["src"]),
            named_node("left_mart", &["left"]),
            named_node("right_mart", &["right"]),
        ],
        Vec::new(),
    )
    .unwrap();

    let calls = Arc::new(Mutex::new(Vec::new()));
    let mut conn = FakeConnection::new(calls.clone()).failing_on("left");
    let mut runner = Runner::new(scheduler, executor());
    let report = runner.run(&mut conn).unwrap();

    assert_eq!(
        executed_queries(&calls),
        vec!["src", "left", "right", "right_mart"]
    );
    assert_eq!(report.count(NodeStatus::FinishedOk), 3);
    assert_eq!(report.count(NodeStatus::FinishedNok), 1);
    assert_eq!(report.count(NodeStatus::Skip), 1);
    assert_eq!(
        runner.scheduler().status_of("left_mart"),
        Some(NodeStatus::Skip)
    );
}
