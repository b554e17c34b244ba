//! Parameterization configuration
//!
//! Loaded from a JSON file. Missing keys take their defaults:
//!
//! ```json
//! { "max_param_count": 64, "starting_param_id": 0 }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::matcher::InputParamId;

/// Configuration failures
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("max_param_count ({max}) is below starting_param_id ({start})")]
    BudgetBelowStart { max: usize, start: InputParamId },
}

impl ConfigError {
    pub fn code(&self) -> &'static str {
        match self {
            ConfigError::Read { .. } => "MATCHPARAM_CONFIG_READ",
            ConfigError::Json(_) => "MATCHPARAM_CONFIG_JSON",
            ConfigError::BudgetBelowStart { .. } => "MATCHPARAM_CONFIG_INVALID",
        }
    }
}

/// Budget and id base for a walk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ParameterizationConfig {
    /// Slot ids at or beyond this value are never issued. `None` is unlimited.
    #[serde(default)]
    pub max_param_count: Option<usize>,

    /// First slot id issued
    #[serde(default)]
    pub starting_param_id: InputParamId,
}

impl ParameterizationConfig {
    pub fn unlimited() -> Self {
        Self::default()
    }

    pub fn with_max_param_count(mut self, max_param_count: usize) -> Self {
        self.max_param_count = Some(max_param_count);
        self
    }

    pub fn with_starting_param_id(mut self, starting_param_id: InputParamId) -> Self {
        self.starting_param_id = starting_param_id;
        self
    }

    /// Read, parse, and validate a config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config: ParameterizationConfig = serde_json::from_str(&content)?;
        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(max) = self.max_param_count {
            if max < self.starting_param_id {
                return Err(ConfigError::BudgetBelowStart {
                    max,
                    start: self.starting_param_id,
                });
            }
        }
        Ok(())
    }
}
