// src/errors.rs

//! Crate-wide error types.

use thiserror::Error;

use crate::types::{NodeId, PipelineId};

/// Structural problems with a workflow graph.
///
/// All of these are detected eagerly, at generation time, before any job
/// exists for the pipeline.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("edge references unknown node '{node}' (edge {source_node} -> {target_node})")]
    UnknownNode {
        node: NodeId,
        source_node: NodeId,
        target_node: NodeId,
    },

    #[error("node '{node}' cannot depend on itself")]
    SelfDependency { node: NodeId },

    #[error("node '{node}' is declared more than once")]
    DuplicateNode { node: NodeId },

    #[error("cycle detected in dependency graph involving node '{node}' (cycle: {cycle:?})")]
    CycleDetected { node: NodeId, cycle: Vec<NodeId> },
}

/// Coarse classification of a [`GraphError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphErrorKind {
    UnknownNode,
    SelfDependency,
    DuplicateNode,
    CycleDetected,
}

impl GraphError {
    pub fn kind(&self) -> GraphErrorKind {
        match self {
            GraphError::UnknownNode { .. } => GraphErrorKind::UnknownNode,
            GraphError::SelfDependency { .. } => GraphErrorKind::SelfDependency,
            GraphError::DuplicateNode { .. } => GraphErrorKind::DuplicateNode,
            GraphError::CycleDetected { .. } => GraphErrorKind::CycleDetected,
        }
    }
}

/// Errors raised by the workflow / job storage collaborators.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("pipeline not found: {0}")]
    PipelineNotFound(PipelineId),

    #[error("workflow not found: {0}")]
    WorkflowNotFound(String),

    #[error("job for node '{node_id}' not found in pipeline '{pipeline_id}'")]
    JobNotFound {
        pipeline_id: PipelineId,
        node_id: NodeId,
    },

    #[error("pipeline '{pipeline_id}' already has {existing} job(s)")]
    JobsAlreadyExist {
        pipeline_id: PipelineId,
        existing: usize,
    },

    #[error("store lock poisoned")]
    Poisoned,
}

/// Errors from job generation (the materializer).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("jobs already generated for pipeline '{pipeline_id}' ({existing} job(s))")]
    AlreadyGenerated {
        pipeline_id: PipelineId,
        existing: usize,
    },

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors raised by node processors and the processor registry.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProcessorError {
    #[error("no processor registered for node type '{0}'")]
    UnknownNodeType(String),

    #[error("invalid config for node type '{node_type}': key '{key}' {message}")]
    InvalidConfig {
        node_type: String,
        key: String,
        message: String,
    },

    #[error("node '{node}' failed: {message}")]
    Execution { node: NodeId, message: String },
}

/// Errors raised while loading or validating a workflow definition.
#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("invalid workflow: {0}")]
    Invalid(String),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("unsupported workflow file format: {0} (expected .json or .toml)")]
    UnsupportedFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Errors raised by the async runner.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("pipeline '{0}' has no jobs; generate them before running")]
    NotGenerated(PipelineId),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("worker task panicked or was aborted: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Error, Debug)]
pub enum PipedagError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Processor(#[from] ProcessorError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, PipedagError>;
