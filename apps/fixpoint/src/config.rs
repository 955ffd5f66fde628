//! # Application Configuration
//!
//! Optional TOML file read with `--config`:
//!
//! ```toml
//! [runtime]
//! dispatch = "lifo"
//! max_tasks = 100000
//! ```
//!
//! Command line flags override file values.

use fixpoint_core::{DispatchOrder, FixpointError, RuntimeConfig};
use serde::{Deserialize, Serialize};

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Settings passed to every run.
    pub runtime: RuntimeConfig,
}

impl AppConfig {
    /// Parse the contents of a config file.
    pub fn parse(text: &str) -> Result<Self, FixpointError> {
        let config: Self = toml::from_str(text)
            .map_err(|e| FixpointError::Config(format!("Invalid config file: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values no run could use.
    pub fn validate(&self) -> Result<(), FixpointError> {
        if self.runtime.max_tasks == Some(0) {
            return Err(FixpointError::Config(
                "max_tasks must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Apply command line overrides.
    pub fn with_overrides(
        mut self,
        dispatch: Option<&str>,
        max_tasks: Option<u64>,
    ) -> Result<Self, FixpointError> {
        if let Some(name) = dispatch {
            self.runtime.dispatch = DispatchOrder::parse(name).ok_or_else(|| {
                FixpointError::Config(format!(
                    "Unknown dispatch order '{name}', expected 'fifo' or 'lifo'"
                ))
            })?;
        }
        if let Some(limit) = max_tasks {
            self.runtime.max_tasks = Some(limit);
        }
        self.validate()?;
        Ok(self)
    }
}
