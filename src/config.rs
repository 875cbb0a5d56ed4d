//! Application configuration.
//!
//! Paths and tunables load from an optional TOML file; every field has a
//! default so the planner runs with no configuration at all. The objective
//! weight ordering is validated on load.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{ScheduleError, ScheduleResult};
use crate::models::allocation::Weights;

/// Tunables for a planner run.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Staff roster CSV.
    pub staff_file: PathBuf,
    /// Optional supplementary holiday table.
    pub holidays_file: Option<PathBuf>,
    /// Equity weight.
    pub alpha: f64,
    /// Role-concentration weight.
    pub beta: f64,
    /// Charge-preference weight.
    pub gamma: f64,
    /// Default solver time limit in seconds.
    pub time_limit_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        let weights = Weights::default();
        AppConfig {
            staff_file: PathBuf::from("data/staff.csv"),
            holidays_file: None,
            alpha: weights.alpha,
            beta: weights.beta,
            gamma: weights.gamma,
            time_limit_secs: 60,
        }
    }
}

impl AppConfig {
    /// Load from a TOML file, or fall back to defaults when `path` is
    /// `None`. A named-but-missing file is an error; weights are checked
    /// for the required ordering either way.
    pub fn load(path: Option<&Path>) -> ScheduleResult<Self> {
        let config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path)?;
                toml::from_str(&text)
                    .map_err(|e| ScheduleError::Config(format!("{}: {}", path.display(), e)))?
            }
            None => AppConfig::default(),
        };
        config.weights().ensure_ordered()?;
        Ok(config)
    }

    pub fn weights(&self) -> Weights {
        Weights {
            alpha: self.alpha,
            beta: self.beta,
            gamma: self.gamma,
        }
    }
}
