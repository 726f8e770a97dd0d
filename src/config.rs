//! Engine configuration
//!
//! Per-user settings the engine needs: the night-sleep window and how many
//! trailing days of history to learn from. Passed explicitly into every call.

use serde::{Deserialize, Serialize};

use crate::baseline::{DEFAULT_HISTORY_WINDOW, MAX_HISTORY_WINDOW};
use crate::error::ComputeError;
use crate::features::NightWindow;

/// Configuration for aggregation and prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Local hour night sleep begins
    pub night_sleep_start_hour: u32,
    /// Local hour night sleep ends
    pub night_sleep_end_hour: u32,
    /// Complete days of history the learned statistics look back over
    pub history_window_days: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let night = NightWindow::default();
        Self {
            night_sleep_start_hour: night.start_hour,
            night_sleep_end_hour: night.end_hour,
            history_window_days: DEFAULT_HISTORY_WINDOW,
        }
    }
}

impl EngineConfig {
    pub fn night_window(&self) -> NightWindow {
        NightWindow::new(self.night_sleep_start_hour, self.night_sleep_end_hour)
    }

    /// Reject configurations that cannot describe a real day
    pub fn validate(&self) -> Result<(), ComputeError> {
        if self.night_sleep_start_hour >= 24 || self.night_sleep_end_hour >= 24 {
            return Err(ComputeError::InvalidConfig(format!(
                "night window hours must be below 24 (got {}-{})",
                self.night_sleep_start_hour, self.night_sleep_end_hour
            )));
        }
        if self.night_sleep_start_hour == self.night_sleep_end_hour {
            return Err(ComputeError::InvalidConfig(
                "night window start and end hours must differ".to_string(),
            ));
        }
        if self.history_window_days == 0 {
            return Err(ComputeError::InvalidConfig(
                "history window must cover at least one day".to_string(),
            ));
        }
        if self.history_window_days > MAX_HISTORY_WINDOW {
            return Err(ComputeError::InvalidConfig(format!(
                "history window may cover at most {} days (got {})",
                MAX_HISTORY_WINDOW, self.history_window_days
            )));
        }
        Ok(())
    }

    /// Load configuration from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, ComputeError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}
