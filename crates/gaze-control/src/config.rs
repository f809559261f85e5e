//! Controller configuration

use serde::{Deserialize, Serialize};

use crate::ControlError;

/// Speed presets offered to the user (percent)
pub const SPEED_PRESETS: [u16; 3] = [25, 50, 75];

/// Controller configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Continuous gaze on a zone before its command is issued (milliseconds)
    pub dwell_ms: u64,

    /// Brake if no "still in zone" signal arrives while moving (milliseconds)
    pub brake_timeout_ms: u64,

    /// Delay before the repeated stop command (milliseconds)
    pub stop_repeat_delay_ms: u64,

    /// Speed at session start (percent)
    pub default_speed: u16,

    /// Highest speed that may be requested (percent)
    pub max_speed: u16,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            dwell_ms: 1000,
            brake_timeout_ms: 500,
            stop_repeat_delay_ms: 100,
            default_speed: 50,
            max_speed: 200,
        }
    }
}

impl ControllerConfig {
    /// Longer dwell and a tighter brake for new users
    pub fn cautious() -> Self {
        Self {
            dwell_ms: 1500,
            brake_timeout_ms: 300,
            default_speed: 25,
            max_speed: 75,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), ControlError> {
        if self.dwell_ms == 0 {
            return Err(ControlError::Config("dwell_ms must be positive".into()));
        }
        if self.brake_timeout_ms == 0 {
            return Err(ControlError::Config(
                "brake_timeout_ms must be positive".into(),
            ));
        }
        if self.default_speed > self.max_speed {
            return Err(ControlError::Config(format!(
                "default_speed {} exceeds max_speed {}",
                self.default_speed, self.max_speed
            )));
        }
        Ok(())
    }
}
