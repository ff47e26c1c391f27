// src/dag/order.rs

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap, HashMap};

use petgraph::algo::tarjan_scc;
use petgraph::graphmap::DiGraphMap;
use serde::Serialize;
use tracing::{debug, warn};

use crate::dag::graph::DependencyGraph;
use crate::errors::GraphError;
use crate::types::NodeId;

/// Rank assigned to every node of a [`DependencyGraph`].
///
/// For every dependency `d` of `n`: `rank(d) < rank(n)`. A node's rank is
/// the length of the longest dependency chain leading to it, so roots are 0
/// and independent nodes can share a rank.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ExecutionOrder {
    ranks: BTreeMap<NodeId, u32>,
}

impl ExecutionOrder {
    pub fn rank_of(&self, node: &str) -> Option<u32> {
        self.ranks.get(node).copied()
    }

    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }

    /// `(node, rank)` pairs sorted by rank, then node id.
    pub fn sorted(&self) -> Vec<(&str, u32)> {
        let mut out: Vec<(&str, u32)> = self
            .ranks
            .iter()
            .map(|(id, rank)| (id.as_str(), *rank))
            .collect();
        out.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)));
        out
    }

    /// Number of distinct ranks (longest chain length).
    pub fn depth(&self) -> usize {
        self.ranks
            .values()
            .max()
            .map(|max| *max as usize + 1)
            .unwrap_or(0)
    }

    /// Nodes grouped by rank. Nodes within one level never depend on one
    /// another.
    pub fn levels(&self) -> Vec<Vec<&str>> {
        let mut levels: Vec<Vec<&str>> = vec![Vec::new(); self.depth()];
        for (id, rank) in &self.ranks {
            levels[*rank as usize].push(id.as_str());
        }
        levels
    }
}

/// Assign ranks with Kahn's algorithm.
///
/// Nodes are popped from a min-heap keyed on node id, so the processing
/// order (and every log line) is reproducible. Each popped node gets
/// `1 + max(rank(dep))`, or 0 with no dependencies. Nodes left unranked
/// once the heap drains sit on, or behind, a cycle.
pub fn calculate_execution_order(graph: &DependencyGraph) -> Result<ExecutionOrder, GraphError> {
    let mut in_degree: HashMap<&str, usize> = HashMap::with_capacity(graph.node_count());
    let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();

    for (node, deps) in graph.iter() {
        in_degree.insert(node, deps.len());
        for dep in deps {
            dependents.entry(dep.as_str()).or_default().push(node);
        }
    }

    let mut ready: BinaryHeap<Reverse<&str>> = in_degree
        .iter()
        .filter(|(_, degree)| **degree == 0)
        .map(|(node, _)| Reverse(*node))
        .collect();

    let mut ranks: BTreeMap<NodeId, u32> = BTreeMap::new();

    while let Some(Reverse(node)) = ready.pop() {
        let rank = graph
            .dependencies_of(node)
            .into_iter()
            .flatten()
            .filter_map(|dep| ranks.get(dep.as_str()))
            .map(|r| r + 1)
            .max()
            .unwrap_or(0);
        ranks.insert(node.to_string(), rank);

        for dependent in dependents.get(node).into_iter().flatten() {
            if let Some(degree) = in_degree.get_mut(dependent) {
                *degree -= 1;
                if *degree == 0 {
                    ready.push(Reverse(*dependent));
                }
            }
        }
    }

    if ranks.len() < graph.node_count() {
        let err = cycle_error(graph, &ranks);
        warn!(error = %err, "could not order dependency graph");
        return Err(err);
    }

    debug!(nodes = ranks.len(), "calculated execution order");
    Ok(ExecutionOrder { ranks })
}

/// Find a strongly connected component among the unranked nodes and name
/// its smallest member.
fn cycle_error(graph: &DependencyGraph, ranked: &BTreeMap<NodeId, u32>) -> GraphError {
    let mut remainder: DiGraphMap<&str, ()> = DiGraphMap::new();

    for node in graph.nodes().filter(|n| !ranked.contains_key(*n)) {
        remainder.add_node(node);
    }
    for (node, deps) in graph.iter().filter(|(n, _)| !ranked.contains_key(*n)) {
        for dep in deps.iter().filter(|d| !ranked.contains_key(d.as_str())) {
            remainder.add_edge(dep.as_str(), node, ());
        }
    }

    let cycle = tarjan_scc(&remainder)
        .into_iter()
        .filter(|scc| scc.len() > 1 || remainder.contains_edge(scc[0], scc[0]))
        .map(|mut scc| {
            scc.sort_unstable();
            scc
        })
        .min()
        .unwrap_or_else(|| remainder.nodes().min().into_iter().collect());

    let cycle: Vec<NodeId> = cycle.into_iter().map(str::to_string).collect();
    GraphError::CycleDetected {
        node: cycle.first().cloned().unwrap_or_default(),
        cycle,
    }
}
