// src/config/model.rs

use serde::Deserialize;

use crate::engine::RunnerOptions;
use crate::pipeline::GenerationOptions;

/// Runner configuration as read from a TOML file.
///
/// ```toml
/// [runner]
/// workers = 4
///
/// [scheduling]
/// priority_per_rank = 10
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub runner: RunnerSection,

    #[serde(default)]
    pub scheduling: SchedulingSection,
}

/// Validated configuration. Only obtainable through `TryFrom<RawConfigFile>`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub runner: RunnerSection,
    pub scheduling: SchedulingSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(runner: RunnerSection, scheduling: SchedulingSection) -> Self {
        Self { runner, scheduling }
    }

    pub fn runner_options(&self) -> RunnerOptions {
        RunnerOptions {
            workers: self.runner.workers,
        }
    }

    pub fn generation_options(&self) -> GenerationOptions {
        GenerationOptions {
            priority_per_rank: self.scheduling.priority_per_rank,
        }
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self::new_unchecked(RunnerSection::default(), SchedulingSection::default())
    }
}

/// `[runner]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct RunnerSection {
    /// Maximum number of jobs executed concurrently by one runner.
    #[serde(default = "default_workers")]
    pub workers: usize,
}

fn default_workers() -> usize {
    RunnerOptions::default().workers
}

impl Default for RunnerSection {
    fn default() -> Self {
        Self {
            workers: default_workers(),
        }
    }
}

/// `[scheduling]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulingSection {
    /// Default priority step per rank; nodes without an explicit `priority`
    /// get `rank * priority_per_rank`.
    #[serde(default = "default_priority_per_rank")]
    pub priority_per_rank: i64,
}

fn default_priority_per_rank() -> i64 {
    GenerationOptions::default().priority_per_rank
}

impl Default for SchedulingSection {
    fn default() -> Self {
        Self {
            priority_per_rank: default_priority_per_rank(),
        }
    }
}
