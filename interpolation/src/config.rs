//! Pass configuration

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};

/// Tunables for one interpolation pass.
///
/// Every field has a default, so an empty JSON object is a valid config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpolationConfig {
    /// Process lifters on the rayon pool
    pub parallel: bool,
    /// Worker count for a dedicated pool; `None` uses the global pool
    pub threads: Option<usize>,
    /// Lifters with fewer observations are passed through unchanged
    pub min_observations: usize,
}

impl Default for InterpolationConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            threads: None,
            min_observations: 2,
        }
    }
}

impl InterpolationConfig {
    pub fn sequential() -> Self {
        Self {
            parallel: false,
            ..Self::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        // One observation cannot reveal a birthday
        if self.min_observations < 2 {
            return Err(Error::Config(format!(
                "min_observations must be at least 2, got {}",
                self.min_observations
            )));
        }
        if self.threads == Some(0) {
            return Err(Error::Config("threads must be positive".to_string()));
        }
        Ok(())
    }
}
