// src/dag/graph.rs

use std::collections::{HashMap, HashSet};

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::dag::node::Node;
use crate::engine::NodeName;
use crate::errors::{DagrunError, Result};

/// Internal adjacency entry: immediate predecessors and dependents.
#[derive(Debug, Clone, Default)]
struct Adjacency {
    /// Predecessors that are nodes of this graph (pre-satisfied sources are
    /// not tracked here).
    predecessors: Vec<NodeName>,
    /// Nodes that list this one in their `after`.
    dependents: Vec<NodeName>,
}

/// In-memory DAG keyed by node name.
///
/// Built only from a node set that passed [`validate_node_set`], so every
/// predecessor is either a node or a pre-satisfied source and there are no
/// cycles.
#[derive(Debug, Clone, Default)]
pub struct DagGraph {
    adjacency: HashMap<NodeName, Adjacency>,
}

impl DagGraph {
    pub fn from_nodes(nodes: &[Node]) -> Self {
        let mut adjacency: HashMap<NodeName, Adjacency> = nodes
            .iter()
            .map(|n| (n.name.clone(), Adjacency::default()))
            .collect();

        for node in nodes {
            for pred in &node.predecessors {
                // Pre-satisfied sources have no entry; nothing to wire.
                let Some(entry) = adjacency.get_mut(pred) else {
                    continue;
                };
                entry.dependents.push(node.name.clone());

                if let Some(own) = adjacency.get_mut(&node.name) {
                    own.predecessors.push(pred.clone());
                }
            }
        }

        Self { adjacency }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.adjacency.contains_key(name)
    }

    /// Predecessors of `name` that are themselves nodes of the graph.
    pub fn node_predecessors_of(&self, name: &str) -> &[NodeName] {
        self.adjacency
            .get(name)
            .map(|a| a.predecessors.as_slice())
            .unwrap_or(&[])
    }

    /// Immediate dependents of a node, in declaration order.
    pub fn dependents_of(&self, name: &str) -> &[NodeName] {
        self.adjacency
            .get(name)
            .map(|a| a.dependents.as_slice())
            .unwrap_or(&[])
    }

    /// `root` plus everything transitively downstream of it.
    pub fn downstream_of(&self, root: &str) -> HashSet<NodeName> {
        let mut stack: Vec<NodeName> = vec![root.to_string()];
        let mut visited: HashSet<NodeName> = HashSet::new();

        while let Some(name) = stack.pop() {
            if !visited.insert(name.clone()) {
                continue;
            }
            stack.extend(self.dependents_of(&name).iter().cloned());
        }

        visited
    }
}

/// Check a node set before scheduling:
///
/// - names are unique and not also listed as pre-satisfied sources,
/// - every predecessor names a node or a pre-satisfied source,
/// - nobody depends on itself,
/// - the dependency graph is acyclic.
pub fn validate_node_set<'a, I>(nodes: I, satisfied: &HashSet<NodeName>) -> Result<()>
where
    I: IntoIterator<Item = (&'a str, &'a [NodeName])> + Clone,
{
    let mut names: HashSet<&str> = HashSet::new();
    for (name, _) in nodes.clone() {
        if !names.insert(name) {
            return Err(DagrunError::ConfigError(format!(
                "node '{}' is declared more than once",
                name
            )));
        }
        if satisfied.contains(name) {
            return Err(DagrunError::ConfigError(format!(
                "node '{}' is also listed as a pre-satisfied source",
                name
            )));
        }
    }

    for (name, preds) in nodes.clone() {
        for pred in preds {
            if pred == name {
                return Err(DagrunError::ConfigError(format!(
                    "node '{}' cannot depend on itself in `after`",
                    name
                )));
            }
            if !names.contains(pred.as_str()) && !satisfied.contains(pred) {
                return Err(DagrunError::ConfigError(format!(
                    "node '{}' has unknown predecessor '{}' in `after`",
                    name, pred
                )));
            }
        }
    }

    // Edge direction: predecessor -> node. Sources are left out; they are
    // terminal from the start and can't take part in a cycle.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
    for (name, _) in nodes.clone() {
        graph.add_node(name);
    }
    for (name, preds) in nodes {
        for pred in preds {
            if names.contains(pred.as_str()) {
                graph.add_edge(pred.as_str(), name, ());
            }
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(DagrunError::DagCycle(format!(
            "cycle detected in node DAG involving node '{}'",
            cycle.node_id()
        ))),
    }
}
