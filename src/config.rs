//! Planner configuration.
//!
//! Discovery order:
//! 1. `./workplan.toml`
//! 2. `~/.workplan/config.toml`
//! 3. Built-in defaults

use crate::calculations::{DeadlineSettings, ShiftSettings};
use crate::calendar::WorkingHours;
use crate::error::ValidationError;
use crate::solver::SolverConfig;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

pub const LOCAL_CONFIG_FILE: &str = "workplan.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read or write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid configuration file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverSettings {
    pub time_limit_secs: u64,
}

impl Default for SolverSettings {
    fn default() -> Self {
        let defaults = SolverConfig::default();
        Self {
            time_limit_secs: defaults.time_limit.as_secs(),
        }
    }
}

impl SolverSettings {
    pub fn to_solver_config(&self) -> SolverConfig {
        SolverConfig {
            time_limit: Duration::from_secs(self.time_limit_secs),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Default `tracing` filter when `RUST_LOG` is unset.
    pub log_level: String,
    pub working_hours: WorkingHours,
    pub solver: SolverSettings,
    pub shift: ShiftSettings,
    pub deadline: DeadlineSettings,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            working_hours: WorkingHours::default(),
            solver: SolverSettings::default(),
            shift: ShiftSettings::default(),
            deadline: DeadlineSettings::default(),
        }
    }
}

fn unit_ratio(name: &str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!("{name} must be within 0..=1, got {value}")))
    }
}

impl PlannerConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: PlannerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.working_hours.is_valid() {
            let err = ValidationError::WorkingHours {
                start: self.working_hours.start_hour,
                end: self.working_hours.end_hour,
            };
            return Err(ConfigError::Invalid(err.to_string()));
        }
        unit_ratio("shift.buffer_ratio", self.shift.buffer_ratio)?;
        unit_ratio("shift.compression_ratio", self.shift.compression_ratio)?;
        if self.deadline.max_overrun_ratio < 0.0 {
            return Err(ConfigError::Invalid(
                "deadline.max_overrun_ratio must not be negative".to_string(),
            ));
        }
        if self.shift.leave_search_days < 1 {
            return Err(ConfigError::Invalid(
                "shift.leave_search_days must be at least 1".to_string(),
            ));
        }
        if self.solver.time_limit_secs == 0 {
            return Err(ConfigError::Invalid(
                "solver.time_limit_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Loads the first config file found in the discovery order, or the
    /// defaults when there is none.
    pub fn discover() -> Result<Self, ConfigError> {
        if let Some(path) = Self::find_config_file() {
            info!("Loading configuration from: {:?}", path);
            return Self::from_toml_file(path);
        }
        info!("No configuration file found, using defaults");
        Ok(Self::default())
    }

    pub fn find_config_file() -> Option<PathBuf> {
        for candidate in Self::config_candidates() {
            debug!("Checking for config file: {:?}", candidate);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        None
    }

    fn config_candidates() -> Vec<PathBuf> {
        let mut candidates = Vec::new();
        if let Ok(current_dir) = env::current_dir() {
            candidates.push(current_dir.join(LOCAL_CONFIG_FILE));
        }
        if let Some(home) = env::var_os("HOME").or_else(|| env::var_os("USERPROFILE")) {
            candidates.push(PathBuf::from(home).join(".workplan").join("config.toml"));
        }
        candidates
    }
}
