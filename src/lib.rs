// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod logging;
pub mod pipeline;
pub mod processor;
pub mod store;
pub mod types;
pub mod workflow;

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::engine::Runner;
use crate::errors::{PipedagError, Result};
use crate::pipeline::{Job, JobGenerator, Pipeline};
use crate::processor::ProcessorRegistry;
use crate::store::{InMemoryStore, JobStore};
use crate::types::PipelineStatus;
use crate::workflow::Workflow;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config and workflow loading
/// - processor registry validation
/// - pipeline creation and job generation
/// - the runner
pub async fn run(args: CliArgs) -> Result<()> {
    let mut cfg = config::load_or_default(args.config.as_deref().map(Path::new))?;
    if let Some(workers) = args.workers {
        if workers == 0 {
            return Err(PipedagError::ConfigError(
                "--workers must be >= 1 (got 0)".to_string(),
            ));
        }
        cfg.runner.workers = workers;
    }

    let workflow = workflow::load_and_validate(&args.workflow)?;
    let registry = ProcessorRegistry::with_builtins();
    registry.validate_workflow(&workflow)?;

    let input_data = match args.input.as_deref() {
        Some(raw) => serde_json::from_str(raw)?,
        None => serde_json::Value::Null,
    };

    let store = Arc::new(InMemoryStore::new());
    store.add_workflow(workflow.clone())?;
    let pipeline = store.create_pipeline(&workflow.id, input_data)?;

    let generator = JobGenerator::new(store.clone(), store.clone(), cfg.generation_options());
    let jobs = generator.generate_jobs(&pipeline.id)?;

    if args.dry_run {
        print_plan(&workflow, &jobs);
        return Ok(());
    }

    let status = if jobs.is_empty() {
        store.set_pipeline_status(&pipeline.id, PipelineStatus::Completed)?;
        PipelineStatus::Completed
    } else {
        let runner = Runner::new(store.clone(), Arc::new(registry), cfg.runner_options());
        runner.run(&pipeline.id).await?
    };

    let finished = store.pipeline(&pipeline.id)?;
    print_outputs(&finished)?;

    if status != PipelineStatus::Completed {
        return Err(PipedagError::Other(anyhow::anyhow!(
            "pipeline '{}' finished with status {status}",
            finished.id
        )));
    }

    info!(pipeline_id = %finished.id, "pipeline completed");
    Ok(())
}

/// Dry-run output: the execution order and generated jobs.
fn print_plan(workflow: &Workflow, jobs: &[Job]) {
    println!("pipedag dry-run");
    println!("  workflow = {}", workflow.id);
    println!();

    println!("jobs ({}):", jobs.len());
    for job in jobs {
        println!("  - {} [{}]", job.node_id, job.node_type);
        if let Some(label) = workflow.node(&job.node_id).and_then(|n| n.data.label.as_deref()) {
            println!("      label: {label}");
        }
        println!("      rank: {}", job.rank);
        println!("      priority: {}", job.priority);
        if !job.dependencies.is_empty() {
            println!("      after: {:?}", job.dependencies);
        }
    }

    debug!("dry-run complete (no execution)");
}

/// Print sink outputs as one JSON object on stdout.
fn print_outputs(pipeline: &Pipeline) -> Result<()> {
    let outputs: serde_json::Map<String, serde_json::Value> = pipeline
        .sink_jobs()
        .filter_map(|job| job.output.clone().map(|out| (job.node_id.clone(), out)))
        .collect();

    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::Value::Object(outputs))?
    );
    Ok(())
}
