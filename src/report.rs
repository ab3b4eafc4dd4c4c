// src/report.rs

//! End-of-run summary: one line per node in completion order plus totals.

use std::fmt;
use std::time::Duration;

use crate::dag::{Node, NodeStatus, Scheduler};
use crate::engine::NodeName;

/// Final state of one processed node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportEntry {
    pub name: NodeName,
    pub status: NodeStatus,
    pub elapsed: Option<Duration>,
    pub blocked_by: Vec<NodeName>,
}

impl ReportEntry {
    pub fn from_node(node: &Node) -> Self {
        Self {
            name: node.name.clone(),
            status: node.status,
            elapsed: node.elapsed,
            blocked_by: node.blocked_by.clone(),
        }
    }
}

impl fmt::Display for ReportEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            NodeStatus::FinishedOk => {
                let secs = self.elapsed.unwrap_or_default().as_secs_f64();
                write!(f, "OK    {} ({:.3}s)", self.name, secs)
            }
            NodeStatus::FinishedNok => write!(f, "NOK   {}", self.name),
            NodeStatus::Skip => write!(
                f,
                "SKIP  {} (blocked by {})",
                self.name,
                self.blocked_by.join(", ")
            ),
            NodeStatus::Pending | NodeStatus::Running => {
                write!(f, "----  {} (not run)", self.name)
            }
        }
    }
}

/// Everything a run did, in completion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub entries: Vec<ReportEntry>,
    /// Nodes still pending when the run stopped (cancellation).
    pub not_run: Vec<NodeName>,
    pub cancelled: bool,
}

impl RunReport {
    /// Build a report from the nodes the scheduler processed after position
    /// `since` of its completion order.
    pub fn from_scheduler(scheduler: &Scheduler, since: usize, cancelled: bool) -> Self {
        let entries = scheduler
            .processed()
            .iter()
            .skip(since)
            .filter_map(|name| scheduler.node(name))
            .map(ReportEntry::from_node)
            .collect();

        Self {
            entries,
            not_run: scheduler.pending(),
            cancelled,
        }
    }

    pub fn count(&self, status: NodeStatus) -> usize {
        self.entries.iter().filter(|e| e.status == status).count()
    }

    /// Every processed node finished OK and nothing was left behind.
    pub fn is_success(&self) -> bool {
        !self.cancelled
            && self.not_run.is_empty()
            && self
                .entries
                .iter()
                .all(|e| e.status == NodeStatus::FinishedOk)
    }

    pub fn summary(&self) -> String {
        let mut line = format!(
            "{} ok, {} failed, {} skipped",
            self.count(NodeStatus::FinishedOk),
            self.count(NodeStatus::FinishedNok),
            self.count(NodeStatus::Skip)
        );
        if !self.not_run.is_empty() {
            line.push_str(&format!(", {} not run", self.not_run.len()));
        }
        if self.cancelled {
            line.push_str(" (cancelled)");
        }
        line
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            writeln!(f, "{entry}")?;
        }
        for name in &self.not_run {
            writeln!(f, "----  {name} (not run)")?;
        }
        write!(f, "{}", self.summary())
    }
}
