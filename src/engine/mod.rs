// src/engine/mod.rs

//! Pipeline execution.
//!
//! The [`Runner`] is the external collaborator that the scheduling core
//! expects: it repeatedly asks for ready jobs, claims each one with a
//! compare-and-set on the job store, runs the node's processor on a
//! blocking worker, records the outcome and finally settles the pipeline
//! status.

pub mod runner;

pub use runner::Runner;

/// Runtime options for a [`Runner`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunnerOptions {
    /// Maximum number of jobs this runner executes at the same time.
    pub workers: usize,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self { workers: 4 }
    }
}
