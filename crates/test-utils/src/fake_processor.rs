use std::sync::{Arc, Mutex};
use std::time::Duration;

use pipedag::errors::ProcessorError;
use pipedag::processor::{NodeInputs, NodeProcessor};
use pipedag::workflow::NodeConfig;

/// A fake processor that:
/// - records which nodes were executed, in order
/// - returns the node id as its output
/// - optionally sleeps first, to keep several jobs in flight at once
pub struct RecordingProcessor {
    executed: Arc<Mutex<Vec<String>>>,
    delay: Option<Duration>,
}

impl RecordingProcessor {
    pub fn new(executed: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            executed,
            delay: None,
        }
    }

    pub fn with_delay(executed: Arc<Mutex<Vec<String>>>, delay: Duration) -> Self {
        Self {
            executed,
            delay: Some(delay),
        }
    }
}

impl NodeProcessor for RecordingProcessor {
    fn execute(
        &self,
        inputs: &NodeInputs,
        _config: &NodeConfig,
    ) -> Result<serde_json::Value, ProcessorError> {
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        self.executed.lock().unwrap().push(inputs.node_id.clone());
        Ok(serde_json::Value::String(inputs.node_id.clone()))
    }
}

/// Always fails.
pub struct FailingProcessor;

impl NodeProcessor for FailingProcessor {
    fn execute(
        &self,
        inputs: &NodeInputs,
        _config: &NodeConfig,
    ) -> Result<serde_json::Value, ProcessorError> {
        Err(ProcessorError::Execution {
            node: inputs.node_id.clone(),
            message: "intentional failure".to_string(),
        })
    }
}

/// Always panics.
pub struct PanickingProcessor;

impl NodeProcessor for PanickingProcessor {
    fn execute(
        &self,
        _inputs: &NodeInputs,
        _config: &NodeConfig,
    ) -> Result<serde_json::Value, ProcessorError> {
        panic!("processor blew up");
    }
}
