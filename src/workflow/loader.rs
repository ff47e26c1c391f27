// src/workflow/loader.rs

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::errors::WorkflowError;
use crate::workflow::model::Workflow;

/// Parse a workflow file without validating it.
///
/// The format is picked from the extension: `.json` or `.toml`.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<Workflow, WorkflowError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let workflow: Workflow = match ext.as_str() {
        "json" => serde_json::from_str(&contents)?,
        "toml" => toml::from_str(&contents)?,
        _ => return Err(WorkflowError::UnsupportedFormat(path.display().to_string())),
    };

    debug!(
        workflow = %workflow.id,
        nodes = workflow.nodes.len(),
        edges = workflow.edges.len(),
        "parsed workflow file"
    );

    Ok(workflow)
}

/// Load a workflow file and run boundary validation on it.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<Workflow, WorkflowError> {
    let workflow = load_from_path(path)?;
    workflow.validate()?;
    Ok(workflow)
}
