// src/config/mod.rs

//! Runner configuration (`Pipedag.toml`).
//!
//! - [`model`] is the TOML-backed data model.
//! - [`loader`] reads it from disk.
//! - [`validate`] turns a [`RawConfigFile`] into a [`ConfigFile`].

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, load_or_default};
pub use model::{ConfigFile, RawConfigFile, RunnerSection, SchedulingSection};
