// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{PipedagError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::PipedagError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.runner, raw.scheduling))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_runner(cfg)?;
    validate_scheduling(cfg)?;
    Ok(())
}

fn validate_runner(cfg: &RawConfigFile) -> Result<()> {
    if cfg.runner.workers == 0 {
        return Err(PipedagError::ConfigError(
            "[runner].workers must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_scheduling(cfg: &RawConfigFile) -> Result<()> {
    if cfg.scheduling.priority_per_rank < 1 {
        return Err(PipedagError::ConfigError(format!(
            "[scheduling].priority_per_rank must be >= 1 (got {})",
            cfg.scheduling.priority_per_rank
        )));
    }
    Ok(())
}
