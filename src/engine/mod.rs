// src/engine/mod.rs

//! Run engine for dagrun.
//!
//! This module ties together the DAG scheduler and the executor:
//! - [`runner`] is the synchronous drive loop that pulls ready nodes, runs
//!   them one at a time and feeds outcomes back into the scheduler;
//! - [`cancel`] holds the flag used to stop a run between nodes.

/// Canonical node name type used throughout the engine.
pub type NodeName = String;

/// Outcome of executing one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeOutcome {
    Success,
    /// Failure with the error message.
    Failed(String),
}

pub mod cancel;
pub mod runner;

pub use cancel::CancelFlag;
pub use runner::Runner;
