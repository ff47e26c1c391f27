// src/workflow/mod.rs

//! Workflow definitions: the authored graph that pipelines are generated from.
//!
//! - [`model`] holds the serde-backed types.
//! - [`loader`] reads `.json` / `.toml` workflow files.
//! - [`validate`] checks node metadata and graph shape at the boundary.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path};
pub use model::{ConfigValue, NodeConfig, NodeData, Workflow, WorkflowEdge, WorkflowNode};
