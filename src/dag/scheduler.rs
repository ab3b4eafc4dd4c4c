// src/dag/scheduler.rs

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::dag::graph::{validate_node_set, DagGraph};
use crate::dag::node::{Node, NodeStatus};
use crate::dag::scheduler_step::SchedulerStep;
use crate::engine::{NodeName, NodeOutcome};
use crate::errors::{DagrunError, Result};

/// One entry of a dry-run plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanStep {
    Run(NodeName),
    Skip(NodeName),
}

/// Scheduler holds the node set, its DAG and all per-run state.
///
/// Scheduling is Kahn's algorithm over the dependency graph:
/// - every pending node keeps a count of predecessors that are not terminal
///   yet;
/// - a node whose count drops to zero either joins the FIFO ready queue (all
///   predecessors finished OK) or is skipped (some predecessor finished NOK
///   or was skipped), and a skip releases its own dependents in turn;
/// - the run is finished when nothing is pending or running.
///
/// The scheduler never executes anything itself; the runner pulls nodes with
/// [`Scheduler::next_ready`] and reports back with
/// [`Scheduler::handle_completion`].
#[derive(Debug, Clone)]
pub struct Scheduler {
    graph: DagGraph,
    /// Nodes in declaration order.
    nodes: Vec<Node>,
    index: HashMap<NodeName, usize>,
    /// Pre-satisfied source names.
    satisfied: HashSet<NodeName>,
    /// Terminal status of every finished node and source.
    completed: HashMap<NodeName, NodeStatus>,
    /// Number of predecessors each pending node still waits for.
    waiting_on: HashMap<NodeName, usize>,
    ready: VecDeque<NodeName>,
    /// Nodes in the order they reached a terminal state during this run.
    processed: Vec<NodeName>,
}

impl Scheduler {
    /// Validate `nodes` and seed the ready queue.
    ///
    /// `satisfied` names count as finished OK from the start. Nodes that are
    /// already terminal keep their status and are never executed again.
    pub fn new(nodes: Vec<Node>, satisfied: impl IntoIterator<Item = NodeName>) -> Result<Self> {
        let satisfied: HashSet<NodeName> = satisfied.into_iter().collect();
        validate_node_set(
            nodes
                .iter()
                .map(|n| (n.name.as_str(), n.predecessors.as_slice())),
            &satisfied,
        )?;

        let graph = DagGraph::from_nodes(&nodes);
        let index = nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.name.clone(), i))
            .collect();

        let mut completed: HashMap<NodeName, NodeStatus> = satisfied
            .iter()
            .map(|name| (name.clone(), NodeStatus::FinishedOk))
            .collect();
        for node in nodes.iter().filter(|n| n.is_terminal()) {
            completed.insert(node.name.clone(), node.status);
        }

        let mut scheduler = Self {
            graph,
            nodes,
            index,
            satisfied,
            completed,
            waiting_on: HashMap::new(),
            ready: VecDeque::new(),
            processed: Vec::new(),
        };
        scheduler.seed();
        Ok(scheduler)
    }

    /// Compute waiting counts and resolve every node that has nothing left to
    /// wait for.
    fn seed(&mut self) {
        let mut initially_free = Vec::new();

        for i in 0..self.nodes.len() {
            if self.nodes[i].is_terminal() {
                continue;
            }

            let name = self.nodes[i].name.clone();
            let mut waiting = 0;
            let mut blocked = Vec::new();
            for pred in self.graph.node_predecessors_of(&name) {
                match self.completed.get(pred) {
                    Some(status) if status.is_failure() => blocked.push(pred.clone()),
                    Some(_) => {}
                    None => waiting += 1,
                }
            }

            let node = &mut self.nodes[i];
            if node.status == NodeStatus::Running {
                warn!(node = %name, "node handed in as Running; treating it as Pending");
            }
            node.status = NodeStatus::Pending;
            node.blocked_by = blocked;

            if waiting == 0 {
                initially_free.push(name.clone());
            }
            self.waiting_on.insert(name, waiting);
        }

        let mut step = SchedulerStep::default();
        self.resolve(initially_free, &mut step);
        debug!(
            ready = ?step.newly_ready,
            skipped = ?step.newly_skipped,
            "scheduler seeded"
        );
    }

    /// Keep only `root` and its downstream dependents in the run; every other
    /// node is treated as a pre-satisfied source.
    ///
    /// Meant to be called before the run starts.
    pub fn restrict_to_downstream(self, root: &str) -> Result<Self> {
        if !self.graph.contains(root) {
            return Err(DagrunError::NodeNotFound(root.to_string()));
        }

        let keep = self.graph.downstream_of(root);
        let mut satisfied = self.satisfied;
        let mut nodes = Vec::with_capacity(keep.len());
        for node in self.nodes {
            if keep.contains(&node.name) {
                nodes.push(node);
            } else {
                satisfied.insert(node.name);
            }
        }

        info!(
            root = %root,
            kept = nodes.len(),
            "restricting run to downstream subgraph"
        );
        Scheduler::new(nodes, satisfied)
    }

    /// Pop the next ready node and mark it `Running`.
    pub fn next_ready(&mut self) -> Option<&mut Node> {
        let name = self.ready.pop_front()?;
        let idx = *self.index.get(&name)?;

        let node = &mut self.nodes[idx];
        node.status = NodeStatus::Running;
        debug!(node = %node.name, "predecessors finished OK; marking Running");
        Some(node)
    }

    /// Record the outcome of a running node and release its dependents.
    pub fn handle_completion(
        &mut self,
        name: &str,
        outcome: &NodeOutcome,
        elapsed: Duration,
    ) -> SchedulerStep {
        let mut step = SchedulerStep::default();

        let Some(&idx) = self.index.get(name) else {
            warn!(node = %name, "completion for unknown node; ignoring");
            return step;
        };
        if self.nodes[idx].status != NodeStatus::Running {
            warn!(
                node = %name,
                status = ?self.nodes[idx].status,
                "completion for a node that is not running; ignoring"
            );
            return step;
        }

        let status = match outcome {
            NodeOutcome::Success => {
                debug!(
                    node = %name,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "node finished OK"
                );
                NodeStatus::FinishedOk
            }
            NodeOutcome::Failed(reason) => {
                warn!(
                    node = %name,
                    error = %reason,
                    "node finished NOK; dependents will be skipped"
                );
                NodeStatus::FinishedNok
            }
        };

        let node = &mut self.nodes[idx];
        node.status = status;
        node.elapsed = Some(elapsed);

        self.completed.insert(name.to_string(), status);
        self.processed.push(name.to_string());

        let unblocked = self.release_dependents(name, status.is_failure());
        self.resolve(unblocked, &mut step);

        step.run_just_finished = self.is_finished();
        if step.run_just_finished {
            info!(processed = self.processed.len(), "scheduler: every node is terminal");
        }
        step
    }

    /// Count `finished` as done for each of its pending dependents and return
    /// the ones with nothing left to wait for.
    fn release_dependents(&mut self, finished: &str, failed: bool) -> Vec<NodeName> {
        let mut unblocked = Vec::new();

        for dep in self.graph.dependents_of(finished) {
            let Some(&idx) = self.index.get(dep) else {
                continue;
            };
            let node = &mut self.nodes[idx];
            if node.status != NodeStatus::Pending {
                continue;
            }
            if failed {
                node.blocked_by.push(finished.to_string());
            }

            if let Some(waiting) = self.waiting_on.get_mut(dep) {
                *waiting = waiting.saturating_sub(1);
                if *waiting == 0 {
                    unblocked.push(dep.clone());
                }
            }
        }

        unblocked
    }

    /// Queue or skip nodes whose predecessors are all terminal. Skips cascade
    /// through the worklist.
    fn resolve(&mut self, free: Vec<NodeName>, step: &mut SchedulerStep) {
        let mut worklist: VecDeque<NodeName> = free.into();

        while let Some(name) = worklist.pop_front() {
            let Some(&idx) = self.index.get(&name) else {
                continue;
            };
            let node = &mut self.nodes[idx];
            if node.status != NodeStatus::Pending {
                continue;
            }

            if node.blocked_by.is_empty() {
                debug!(node = %name, "node ready");
                self.ready.push_back(name.clone());
                step.newly_ready.push(name);
                continue;
            }

            node.status = NodeStatus::Skip;
            info!(
                node = %name,
                blocked_by = ?node.blocked_by,
                "skipping node; a predecessor did not finish OK"
            );

            self.completed.insert(name.clone(), NodeStatus::Skip);
            self.processed.push(name.clone());
            worklist.extend(self.release_dependents(&name, true));
            step.newly_skipped.push(name);
        }
    }

    /// `true` when no node is pending or running.
    pub fn is_finished(&self) -> bool {
        self.nodes.iter().all(Node::is_terminal)
    }

    /// Whether every predecessor of `name` finished OK (or is a source).
    ///
    /// Returns `None` if the node is unknown.
    pub fn deps_satisfied(&self, name: &str) -> Option<bool> {
        let node = self.node(name)?;
        Some(node.predecessors.iter().all(|pred| {
            matches!(self.completed.get(pred), Some(NodeStatus::FinishedOk))
        }))
    }

    /// Terminal status of a node or pre-satisfied source, if it has one.
    pub fn completed_status(&self, name: &str) -> Option<NodeStatus> {
        self.completed.get(name).copied()
    }

    pub fn status_of(&self, name: &str) -> Option<NodeStatus> {
        self.node(name).map(|n| n.status)
    }

    pub fn node(&self, name: &str) -> Option<&Node> {
        self.index.get(name).map(|&i| &self.nodes[i])
    }

    /// All nodes in declaration order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Names of nodes that reached a terminal state, in completion order.
    pub fn processed(&self) -> &[NodeName] {
        &self.processed
    }

    /// Nodes that are neither terminal nor running.
    pub fn pending(&self) -> Vec<NodeName> {
        self.nodes
            .iter()
            .filter(|n| n.status == NodeStatus::Pending)
            .map(|n| n.name.clone())
            .collect()
    }

    pub fn has_running(&self) -> bool {
        self.nodes.iter().any(|n| n.status == NodeStatus::Running)
    }

    /// Order in which nodes would run (or be skipped) if every executed node
    /// succeeded.
    pub fn plan(&self) -> Vec<PlanStep> {
        let mut sim = self.clone();
        let start = sim.processed.len();

        while let Some(node) = sim.next_ready() {
            let name = node.name.clone();
            sim.handle_completion(&name, &NodeOutcome::Success, Duration::ZERO);
        }

        sim.processed[start..]
            .iter()
            .map(|name| match sim.status_of(name) {
                Some(NodeStatus::Skip) => PlanStep::Skip(name.clone()),
                _ => PlanStep::Run(name.clone()),
            })
            .collect()
    }
}
