//! # Stratagem Config
//!
//! Unified single-file configuration for Stratagem. A single `stratagem.yaml`
//! configures the planner search limits, executor behavior, and observability
//! settings, and converts into the core's runtime config types.

mod loader;

pub use loader::{load_config, ConfigError};

use std::time::Duration;

use serde::Deserialize;

use stratagem_core::executor::{ExecutionMode, ExecutorConfig};
use stratagem_core::planner::PlannerConfig;

/// Top-level configuration schema for Stratagem.
#[derive(Debug, Clone, Deserialize)]
pub struct StratagemConfig {
    /// Config schema version.
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub planner: PlannerSettings,
    #[serde(default)]
    pub executor: ExecutorSettings,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

fn default_version() -> u32 {
    1
}

impl Default for StratagemConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            app: AppConfig::default(),
            planner: PlannerSettings::default(),
            executor: ExecutorSettings::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default = "default_env")]
    pub environment: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            environment: default_env(),
        }
    }
}

fn default_app_name() -> String {
    "stratagem".to_string()
}

fn default_env() -> String {
    "development".to_string()
}

/// Planner search limits.
#[derive(Debug, Clone, Deserialize)]
pub struct PlannerSettings {
    #[serde(default = "default_max_search_depth")]
    pub max_search_depth: usize,
    /// Wall-clock budget in seconds; 0 means unlimited.
    #[serde(default)]
    pub planning_timeout_secs: f64,
    #[serde(default = "default_max_plans")]
    pub max_plans_to_consider: usize,
    #[serde(default)]
    pub debug: bool,
}

impl Default for PlannerSettings {
    fn default() -> Self {
        Self {
            max_search_depth: default_max_search_depth(),
            planning_timeout_secs: 0.0,
            max_plans_to_consider: default_max_plans(),
            debug: false,
        }
    }
}

fn default_max_search_depth() -> usize {
    64
}

fn default_max_plans() -> usize {
    1024
}

impl From<&PlannerSettings> for PlannerConfig {
    fn from(settings: &PlannerSettings) -> Self {
        Self {
            max_search_depth: settings.max_search_depth,
            planning_timeout: Duration::from_secs_f64(settings.planning_timeout_secs.max(0.0)),
            max_plans_to_consider: settings.max_plans_to_consider,
            debug: settings.debug,
        }
    }
}

/// Executor behavior.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutorSettings {
    /// `sequential`, `parallel`, or `dependency_based`.
    #[serde(default = "default_mode")]
    pub mode: String,
    #[serde(default)]
    pub abort_on_task_failure: bool,
    /// Per-task wall-clock budget in seconds; 0 means unbounded.
    #[serde(default)]
    pub max_task_execution_time_secs: f64,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            abort_on_task_failure: false,
            max_task_execution_time_secs: 0.0,
        }
    }
}

fn default_mode() -> String {
    "sequential".to_string()
}

impl ExecutorSettings {
    /// Parse the mode string; `None` for anything unrecognized.
    pub fn execution_mode(&self) -> Option<ExecutionMode> {
        match self.mode.as_str() {
            "sequential" => Some(ExecutionMode::Sequential),
            "parallel" => Some(ExecutionMode::Parallel),
            "dependency_based" => Some(ExecutionMode::DependencyBased),
            _ => None,
        }
    }
}

impl TryFrom<&ExecutorSettings> for ExecutorConfig {
    type Error = ConfigError;

    fn try_from(settings: &ExecutorSettings) -> Result<Self, Self::Error> {
        let mode = settings.execution_mode().ok_or_else(|| {
            ConfigError::Invalid(format!("executor.mode `{}` not recognized", settings.mode))
        })?;
        Ok(Self {
            mode,
            abort_on_task_failure: settings.abort_on_task_failure,
            max_task_execution_time: Duration::from_secs_f64(
                settings.max_task_execution_time_secs.max(0.0),
            ),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_true")]
    pub log_plan_events: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_plan_events: default_true(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}
