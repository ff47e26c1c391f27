#![allow(dead_code)]

pub use pipedag_test_utils::builders;
pub use pipedag_test_utils::fixture::PipelineFixture;
pub use pipedag_test_utils::init_tracing;
