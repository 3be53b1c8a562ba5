//! Configuration loading.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::StratagemConfig;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Load full Stratagem configuration from a YAML file.
pub fn load_config(path: &Path) -> Result<StratagemConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: StratagemConfig = serde_yaml::from_str(&content)?;
    validate_config(&config)?;
    tracing::debug!(path = %path.display(), "configuration loaded");
    Ok(config)
}

fn validate_config(config: &StratagemConfig) -> Result<(), ConfigError> {
    if config.version == 0 {
        return Err(ConfigError::Invalid(
            "version must be greater than 0".to_string(),
        ));
    }

    if config.app.name.trim().is_empty() {
        return Err(ConfigError::Invalid(
            "app.name must not be empty".to_string(),
        ));
    }

    if config.planner.max_search_depth == 0 {
        return Err(ConfigError::Invalid(
            "planner.max_search_depth must be > 0".to_string(),
        ));
    }

    if config.planner.max_plans_to_consider == 0 {
        return Err(ConfigError::Invalid(
            "planner.max_plans_to_consider must be > 0".to_string(),
        ));
    }

    if config.planner.planning_timeout_secs < 0.0 {
        return Err(ConfigError::Invalid(
            "planner.planning_timeout_secs must not be negative".to_string(),
        ));
    }

    if config.executor.execution_mode().is_none() {
        return Err(ConfigError::Invalid(format!(
            "executor.mode `{}` not recognized",
            config.executor.mode
        )));
    }

    if config.executor.max_task_execution_time_secs < 0.0 {
        return Err(ConfigError::Invalid(
            "executor.max_task_execution_time_secs must not be negative".to_string(),
        ));
    }

    Ok(())
}
