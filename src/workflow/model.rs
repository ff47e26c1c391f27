// src/workflow/model.rs

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::NodeId;

/// Per-node configuration: a closed set of value shapes keyed by name.
pub type NodeConfig = BTreeMap<String, ConfigValue>;

/// A single configuration value.
///
/// Deserialized untagged so workflow files can write plain JSON / TOML
/// literals (`"key": "name"`, `"retries": 3`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<ConfigValue>),
    Map(BTreeMap<String, ConfigValue>),
}

impl ConfigValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Whether every float inside this value is finite.
    pub fn is_finite(&self) -> bool {
        match self {
            ConfigValue::Float(f) => f.is_finite(),
            ConfigValue::List(items) => items.iter().all(ConfigValue::is_finite),
            ConfigValue::Map(map) => map.values().all(ConfigValue::is_finite),
            ConfigValue::Bool(_) | ConfigValue::Integer(_) | ConfigValue::String(_) => true,
        }
    }
}

impl From<&ConfigValue> for serde_json::Value {
    fn from(value: &ConfigValue) -> Self {
        match value {
            ConfigValue::Bool(b) => serde_json::Value::Bool(*b),
            ConfigValue::Integer(i) => serde_json::Value::from(*i),
            ConfigValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            ConfigValue::String(s) => serde_json::Value::String(s.clone()),
            ConfigValue::List(items) => {
                serde_json::Value::Array(items.iter().map(serde_json::Value::from).collect())
            }
            ConfigValue::Map(map) => serde_json::Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), serde_json::Value::from(v)))
                    .collect(),
            ),
        }
    }
}

/// Metadata attached to a workflow node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeData {
    /// Processor type, e.g. `"input"` or `"merge"`.
    #[serde(rename = "type")]
    pub node_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[serde(default)]
    pub config: NodeConfig,

    /// Explicit scheduling priority. Lower runs first. When absent the
    /// priority is derived from the node's rank.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowNode {
    pub id: NodeId,
    pub data: NodeData,
}

impl WorkflowNode {
    pub fn new(id: impl Into<NodeId>, node_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            data: NodeData {
                node_type: node_type.into(),
                label: None,
                config: NodeConfig::new(),
                priority: None,
            },
        }
    }

    pub fn with_priority(mut self, priority: i64) -> Self {
        self.data.priority = Some(priority);
        self
    }

    pub fn with_config(mut self, key: impl Into<String>, value: ConfigValue) -> Self {
        self.data.config.insert(key.into(), value);
        self
    }
}

/// `target` depends on `source`: `source` must complete before `target` runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowEdge {
    pub source: NodeId,
    pub target: NodeId,
}

impl WorkflowEdge {
    pub fn new(source: impl Into<NodeId>, target: impl Into<NodeId>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

/// An authored workflow: the read-only input to job generation.
///
/// ```json
/// {
///   "id": "etl",
///   "nodes": [
///     { "id": "input1", "data": { "type": "input" } },
///     { "id": "output1", "data": { "type": "output", "priority": 5 } }
///   ],
///   "edges": [ { "source": "input1", "target": "output1" } ]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[serde(default)]
    pub nodes: Vec<WorkflowNode>,

    #[serde(default)]
    pub edges: Vec<WorkflowEdge>,
}

impl Workflow {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: None,
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }

    pub fn node_ids(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|n| n.id.as_str())
    }

    pub fn node(&self, id: &str) -> Option<&WorkflowNode> {
        self.nodes.iter().find(|n| n.id == id)
    }
}
