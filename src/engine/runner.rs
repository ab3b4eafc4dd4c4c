// src/engine/runner.rs

use std::fmt;
use std::time::Instant;

use tracing::{error, info, warn};

use crate::dag::{Scheduler, SchedulerStep};
use crate::engine::CancelFlag;
use crate::errors::{DagrunError, Result};
use crate::exec::{Connection, Executor};
use crate::report::{ReportEntry, RunReport};

/// Drives the scheduler to completion, one node at a time.
///
/// Single-threaded and synchronous: each node is fully executed (including
/// commit) before the next ready node is looked at. The connection is lent
/// to the executor per node and never shared.
pub struct Runner {
    scheduler: Scheduler,
    executor: Executor,
    cancel: CancelFlag,
    /// Position in the scheduler's completion order already reported.
    reported: usize,
}

impl fmt::Debug for Runner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runner")
            .field("scheduler", &self.scheduler)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl Runner {
    pub fn new(scheduler: Scheduler, executor: Executor) -> Self {
        Self {
            scheduler,
            executor,
            cancel: CancelFlag::new(),
            reported: 0,
        }
    }

    /// Stop dispatching new nodes once `cancel` is set.
    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn into_scheduler(self) -> Scheduler {
        self.scheduler
    }

    /// Main loop.
    ///
    /// - Pulls the next ready node from the scheduler.
    /// - Executes it against `conn` and times it.
    /// - Feeds the outcome back, which may release or skip dependents.
    ///
    /// The report covers every node resolved since the previous call,
    /// including nodes skipped while the scheduler was built. Running again
    /// on a finished scheduler returns an empty report.
    pub fn run(&mut self, conn: &mut dyn Connection) -> Result<RunReport> {
        let since = self.reported;
        let mut cancelled = false;
        let mut stalled = false;

        info!(nodes = self.scheduler.nodes().len(), "dagrun run started");

        while !self.scheduler.is_finished() {
            if self.cancel.is_cancelled() {
                warn!(
                    pending = ?self.scheduler.pending(),
                    "run cancelled; remaining nodes will not run"
                );
                cancelled = true;
                break;
            }

            let Some(node) = self.scheduler.next_ready() else {
                stalled = true;
                break;
            };
            let name = node.name.clone();

            let started = Instant::now();
            let outcome = self.executor.execute(node, conn);
            let elapsed = started.elapsed();

            let step = self.scheduler.handle_completion(&name, &outcome, elapsed);
            self.log_resolved(&name, &step);
        }

        if stalled {
            let stuck = self.scheduler.pending();
            error!(?stuck, "no node is ready but the run is not finished");
            return Err(DagrunError::Stalled(stuck));
        }

        let report = RunReport::from_scheduler(&self.scheduler, since, cancelled);
        self.reported = self.scheduler.processed().len();
        info!(summary = %report.summary(), "run finished");
        Ok(report)
    }

    /// Emit one report line per node that became terminal in this step.
    fn log_resolved(&self, finished: &str, step: &SchedulerStep) {
        let names = std::iter::once(finished).chain(step.newly_skipped.iter().map(String::as_str));
        for name in names {
            if let Some(node) = self.scheduler.node(name) {
                info!("{}", ReportEntry::from_node(node));
            }
        }
    }
}
