// src/dag/mod.rs

//! Dependency graph construction and ordering.
//!
//! - [`graph`] turns a node list and an edge list into a [`DependencyGraph`].
//! - [`order`] assigns every node a topological rank ([`ExecutionOrder`])
//!   and rejects cycles.

pub mod graph;
pub mod order;

pub use graph::{DependencyGraph, build_dependency_graph};
pub use order::{ExecutionOrder, calculate_execution_order};
