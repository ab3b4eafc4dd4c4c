// src/dag/mod.rs

//! DAG representation and scheduling.
//!
//! - [`graph`] holds the adjacency of the node set and validates it.
//! - [`node`] defines nodes, their status and their SQL work.
//! - [`scheduler`] contains the state machine that decides which nodes are
//!   ready, which are skipped, and when the run is finished.
//! - [`scheduler_step`] defines the result type for scheduler steps.

pub mod graph;
pub mod node;
pub mod scheduler;
pub mod scheduler_step;

pub use graph::DagGraph;
pub use node::{ConnectionOverrides, Node, NodeStatus, WorkSpec};
pub use scheduler::{PlanStep, Scheduler};
pub use scheduler_step::SchedulerStep;
