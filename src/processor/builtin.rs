// src/processor/builtin.rs

//! Processors available without any registration.

use std::sync::Arc;

use crate::errors::ProcessorError;
use crate::processor::{NodeInputs, NodeProcessor, ProcessorFactory};
use crate::workflow::NodeConfig;

pub const FACTORIES: &[(&str, ProcessorFactory)] = &[
    ("input", || Arc::new(InputProcessor)),
    ("constant", || Arc::new(ConstantProcessor)),
    ("merge", || Arc::new(MergeProcessor)),
    ("output", || Arc::new(OutputProcessor)),
];

fn merged(inputs: &NodeInputs) -> serde_json::Value {
    serde_json::Value::Object(
        inputs
            .upstream
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
    )
}

fn optional_string<'a>(
    node_type: &str,
    config: &'a NodeConfig,
    key: &str,
) -> Result<Option<&'a str>, ProcessorError> {
    let Some(value) = config.get(key) else {
        return Ok(None);
    };
    value
        .as_str()
        .map(Some)
        .ok_or_else(|| ProcessorError::InvalidConfig {
            node_type: node_type.to_string(),
            key: key.to_string(),
            message: "must be a string".to_string(),
        })
}

/// Emits the pipeline input, or one field of it when `key` is set.
pub struct InputProcessor;

impl NodeProcessor for InputProcessor {
    fn execute(
        &self,
        inputs: &NodeInputs,
        config: &NodeConfig,
    ) -> Result<serde_json::Value, ProcessorError> {
        match optional_string("input", config, "key")? {
            None => Ok(inputs.pipeline_input.clone()),
            Some(key) => inputs
                .pipeline_input
                .get(key)
                .cloned()
                .ok_or_else(|| ProcessorError::Execution {
                    node: inputs.node_id.clone(),
                    message: format!("pipeline input has no field '{key}'"),
                }),
        }
    }

    fn validate_config(&self, config: &NodeConfig) -> Result<(), ProcessorError> {
        optional_string("input", config, "key").map(|_| ())
    }
}

/// Emits its `value` config entry.
pub struct ConstantProcessor;

impl NodeProcessor for ConstantProcessor {
    fn execute(
        &self,
        inputs: &NodeInputs,
        config: &NodeConfig,
    ) -> Result<serde_json::Value, ProcessorError> {
        config
            .get("value")
            .map(serde_json::Value::from)
            .ok_or_else(|| ProcessorError::Execution {
                node: inputs.node_id.clone(),
                message: "missing `value`".to_string(),
            })
    }

    fn validate_config(&self, config: &NodeConfig) -> Result<(), ProcessorError> {
        if config.contains_key("value") {
            Ok(())
        } else {
            Err(ProcessorError::InvalidConfig {
                node_type: "constant".to_string(),
                key: "value".to_string(),
                message: "is required".to_string(),
            })
        }
    }
}

/// Emits `{dependency_id: output}` for all upstream nodes.
pub struct MergeProcessor;

impl NodeProcessor for MergeProcessor {
    fn execute(
        &self,
        inputs: &NodeInputs,
        _config: &NodeConfig,
    ) -> Result<serde_json::Value, ProcessorError> {
        Ok(merged(inputs))
    }
}

/// Forwards a single upstream output unchanged; merges several.
pub struct OutputProcessor;

impl NodeProcessor for OutputProcessor {
    fn execute(
        &self,
        inputs: &NodeInputs,
        _config: &NodeConfig,
    ) -> Result<serde_json::Value, ProcessorError> {
        let mut values = inputs.upstream.values();
        match (values.next(), values.next()) {
            (None, _) => Ok(serde_json::Value::Null),
            (Some(only), None) => Ok(only.clone()),
            _ => Ok(merged(inputs)),
        }
    }
}
