// src/dag/scheduler_step.rs

//! Step-by-step result type for the scheduler.

use crate::engine::NodeName;

/// Structured result of a single scheduler "step".
///
/// Useful for tests that drive the DAG by hand and assert on what changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulerStep {
    /// Nodes that entered the ready queue as a result of this step.
    pub newly_ready: Vec<NodeName>,
    /// Nodes that were skipped in this step, in the order they were resolved.
    pub newly_skipped: Vec<NodeName>,
    /// Whether this step left nothing pending or running.
    pub run_just_finished: bool,
}
