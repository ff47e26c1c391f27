// src/processor/mod.rs

//! Node processors: what a job actually computes.
//!
//! Processors are looked up by node type in a [`ProcessorRegistry`] that is
//! filled once at startup from factory functions. The scheduling core never
//! touches processors; only the runner does.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::errors::ProcessorError;
use crate::types::NodeId;
use crate::workflow::{NodeConfig, Workflow};

pub mod builtin;

/// Data handed to a processor.
#[derive(Debug, Clone)]
pub struct NodeInputs {
    pub node_id: NodeId,
    /// The pipeline's `input_data`.
    pub pipeline_input: serde_json::Value,
    /// Outputs of the node's direct dependencies, keyed by node id.
    pub upstream: BTreeMap<NodeId, serde_json::Value>,
}

pub trait NodeProcessor: Send + Sync {
    fn execute(
        &self,
        inputs: &NodeInputs,
        config: &NodeConfig,
    ) -> Result<serde_json::Value, ProcessorError>;

    /// Check a node's config before any pipeline runs.
    fn validate_config(&self, _config: &NodeConfig) -> Result<(), ProcessorError> {
        Ok(())
    }
}

/// Builds a processor instance.
pub type ProcessorFactory = fn() -> Arc<dyn NodeProcessor>;

/// Node type to processor table.
#[derive(Clone, Default)]
pub struct ProcessorRegistry {
    processors: HashMap<String, Arc<dyn NodeProcessor>>,
}

impl fmt::Debug for ProcessorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut types: Vec<&str> = self.processors.keys().map(String::as_str).collect();
        types.sort_unstable();
        f.debug_struct("ProcessorRegistry")
            .field("types", &types)
            .finish()
    }
}

impl ProcessorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the [`builtin`] processors.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for (node_type, factory) in builtin::FACTORIES {
            registry.register_factory(node_type, *factory);
        }
        registry
    }

    pub fn register_factory(&mut self, node_type: &str, factory: ProcessorFactory) {
        self.register(node_type, factory());
    }

    /// Register a processor instance, replacing any previous one for the type.
    pub fn register(&mut self, node_type: &str, processor: Arc<dyn NodeProcessor>) {
        debug!(node_type = %node_type, "registering node processor");
        self.processors.insert(node_type.to_string(), processor);
    }

    pub fn resolve(&self, node_type: &str) -> Result<Arc<dyn NodeProcessor>, ProcessorError> {
        self.processors
            .get(node_type)
            .cloned()
            .ok_or_else(|| ProcessorError::UnknownNodeType(node_type.to_string()))
    }

    /// Every node type is registered and every node config passes its
    /// processor's validation.
    pub fn validate_workflow(&self, workflow: &Workflow) -> Result<(), ProcessorError> {
        for node in &workflow.nodes {
            let processor = self.resolve(&node.data.node_type)?;
            processor.validate_config(&node.data.config)?;
        }
        Ok(())
    }
}
