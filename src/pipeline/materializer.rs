// src/pipeline/materializer.rs

//! Job generation: one [`Job`] per workflow node.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::dag::{DependencyGraph, ExecutionOrder, calculate_execution_order};
use crate::errors::{GenerationError, StoreError};
use crate::pipeline::Job;
use crate::store::{JobStore, WorkflowProvider};
use crate::types::JobStatus;
use crate::workflow::Workflow;

/// Knobs for job generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationOptions {
    /// Priority step between consecutive ranks.
    pub priority_per_rank: i64,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            priority_per_rank: 10,
        }
    }
}

/// Priority a node gets when its metadata carries none.
///
/// Monotonic in `rank`, so sorting by priority ascending also sorts ranks
/// ascending.
pub fn default_priority(rank: u32, priority_per_rank: i64) -> i64 {
    i64::from(rank).saturating_mul(priority_per_rank)
}

/// Generates the jobs of a pipeline from its workflow.
///
/// Generation is fail-loudly: a pipeline that already has jobs yields
/// [`GenerationError::AlreadyGenerated`] and is left untouched.
#[derive(Debug, Clone)]
pub struct JobGenerator {
    workflows: Arc<dyn WorkflowProvider>,
    store: Arc<dyn JobStore>,
    options: GenerationOptions,
}

impl JobGenerator {
    pub fn new(
        workflows: Arc<dyn WorkflowProvider>,
        store: Arc<dyn JobStore>,
        options: GenerationOptions,
    ) -> Self {
        Self {
            workflows,
            store,
            options,
        }
    }

    /// Build, order and persist the jobs for `pipeline_id`.
    ///
    /// Nothing is stored unless the whole graph is valid.
    pub fn generate_jobs(&self, pipeline_id: &str) -> Result<Vec<Job>, GenerationError> {
        let pipeline = self.store.pipeline(pipeline_id)?;
        if !pipeline.jobs.is_empty() {
            warn!(
                pipeline_id = %pipeline_id,
                existing = pipeline.jobs.len(),
                "jobs already generated for pipeline"
            );
            return Err(GenerationError::AlreadyGenerated {
                pipeline_id: pipeline_id.to_string(),
                existing: pipeline.jobs.len(),
            });
        }

        let workflow = self.workflows.workflow(&pipeline.workflow_id)?;
        let graph = DependencyGraph::from_workflow(&workflow)?;
        let order = calculate_execution_order(&graph)?;

        let jobs = materialize_jobs(pipeline_id, &workflow, &graph, &order, self.options);

        match self.store.insert_jobs(pipeline_id, jobs.clone()) {
            Ok(()) => {}
            Err(StoreError::JobsAlreadyExist {
                pipeline_id,
                existing,
            }) => {
                // Another caller generated between our read and our write.
                return Err(GenerationError::AlreadyGenerated {
                    pipeline_id,
                    existing,
                });
            }
            Err(e) => return Err(e.into()),
        }

        info!(
            pipeline_id = %pipeline_id,
            workflow = %workflow.id,
            jobs = jobs.len(),
            depth = order.depth(),
            "generated jobs for pipeline"
        );

        Ok(jobs)
    }
}

/// Turn a validated graph and its order into pending jobs.
///
/// Output is sorted by rank, then node id.
pub fn materialize_jobs(
    pipeline_id: &str,
    workflow: &Workflow,
    graph: &DependencyGraph,
    order: &ExecutionOrder,
    options: GenerationOptions,
) -> Vec<Job> {
    let mut jobs: Vec<Job> = workflow
        .nodes
        .iter()
        .map(|node| {
            let rank = order.rank_of(&node.id).unwrap_or(0);
            let priority = node
                .data
                .priority
                .unwrap_or_else(|| default_priority(rank, options.priority_per_rank));
            let dependencies: BTreeSet<_> =
                graph.dependencies_of(&node.id).cloned().unwrap_or_default();

            debug!(
                pipeline_id = %pipeline_id,
                node = %node.id,
                rank,
                priority,
                deps = dependencies.len(),
                "materialized job"
            );

            Job {
                id: Job::job_id(pipeline_id, &node.id),
                pipeline_id: pipeline_id.to_string(),
                node_id: node.id.clone(),
                node_type: node.data.node_type.clone(),
                status: JobStatus::Pending,
                priority,
                rank,
                dependencies,
                config: node.data.config.clone(),
                output: None,
                error: None,
            }
        })
        .collect();

    jobs.sort_by(|a, b| a.rank.cmp(&b.rank).then_with(|| a.node_id.cmp(&b.node_id)));
    jobs
}
