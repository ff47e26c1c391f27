// src/dag/graph.rs

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::trace;

use crate::errors::GraphError;
use crate::types::NodeId;
use crate::workflow::{Workflow, WorkflowEdge};

/// For every node, the set of nodes it directly depends on.
///
/// Ordered maps and sets throughout: two graphs built from the same nodes
/// and edges compare equal no matter what order the edges arrived in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DependencyGraph {
    deps: BTreeMap<NodeId, BTreeSet<NodeId>>,
}

/// Build the dependency map for a node list plus an edge list.
///
/// - every id in `nodes` becomes a key, roots map to an empty set
/// - edge `source -> target` adds `source` to the dependencies of `target`
/// - duplicate edges collapse
pub fn build_dependency_graph<'a, I>(
    nodes: I,
    edges: &[WorkflowEdge],
) -> Result<DependencyGraph, GraphError>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut deps: BTreeMap<NodeId, BTreeSet<NodeId>> = BTreeMap::new();

    for id in nodes {
        if deps.insert(id.to_string(), BTreeSet::new()).is_some() {
            return Err(GraphError::DuplicateNode {
                node: id.to_string(),
            });
        }
    }

    for edge in edges {
        for endpoint in [&edge.source, &edge.target] {
            if !deps.contains_key(endpoint) {
                return Err(GraphError::UnknownNode {
                    node: endpoint.clone(),
                    source_node: edge.source.clone(),
                    target_node: edge.target.clone(),
                });
            }
        }

        if edge.source == edge.target {
            return Err(GraphError::SelfDependency {
                node: edge.source.clone(),
            });
        }

        if let Some(set) = deps.get_mut(&edge.target) {
            set.insert(edge.source.clone());
        }
    }

    trace!(nodes = deps.len(), edges = edges.len(), "built dependency graph");

    Ok(DependencyGraph { deps })
}

impl DependencyGraph {
    /// Build the graph for a workflow's nodes and edges.
    pub fn from_workflow(workflow: &Workflow) -> Result<Self, GraphError> {
        build_dependency_graph(workflow.node_ids(), &workflow.edges)
    }

    /// Build a graph from an explicit `{ id: [dep, ...] }` mapping.
    ///
    /// Every dependency must itself be a key. Self-entries are kept as-is;
    /// the sequencer reports them as a cycle.
    pub fn from_map<K, D, I>(map: I) -> Result<Self, GraphError>
    where
        I: IntoIterator<Item = (K, D)>,
        K: Into<NodeId>,
        D: IntoIterator,
        D::Item: Into<NodeId>,
    {
        let mut deps: BTreeMap<NodeId, BTreeSet<NodeId>> = BTreeMap::new();
        for (id, dep_list) in map {
            let id = id.into();
            let set: BTreeSet<NodeId> = dep_list.into_iter().map(Into::into).collect();
            if deps.insert(id.clone(), set).is_some() {
                return Err(GraphError::DuplicateNode { node: id });
            }
        }

        for (id, set) in &deps {
            if let Some(missing) = set.iter().find(|d| !deps.contains_key(*d)) {
                return Err(GraphError::UnknownNode {
                    node: missing.clone(),
                    source_node: missing.clone(),
                    target_node: id.clone(),
                });
            }
        }

        Ok(Self { deps })
    }

    /// All node ids, ascending.
    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.deps.keys().map(|s| s.as_str())
    }

    /// `(node, dependencies)` pairs, ascending by node id.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeSet<NodeId>)> {
        self.deps.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn contains(&self, node: &str) -> bool {
        self.deps.contains_key(node)
    }

    /// Direct dependencies of a node, or `None` if the node is unknown.
    pub fn dependencies_of(&self, node: &str) -> Option<&BTreeSet<NodeId>> {
        self.deps.get(node)
    }

    /// Nodes that list `node` as a direct dependency, ascending.
    pub fn dependents_of(&self, node: &str) -> Vec<&str> {
        self.deps
            .iter()
            .filter(|(_, set)| set.contains(node))
            .map(|(id, _)| id.as_str())
            .collect()
    }

    /// Nodes with no dependencies, ascending.
    pub fn roots(&self) -> impl Iterator<Item = &str> {
        self.deps
            .iter()
            .filter(|(_, set)| set.is_empty())
            .map(|(id, _)| id.as_str())
    }

    pub fn node_count(&self) -> usize {
        self.deps.len()
    }

    /// Number of distinct dependency relations.
    pub fn edge_count(&self) -> usize {
        self.deps.values().map(BTreeSet::len).sum()
    }
}
