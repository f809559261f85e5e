//! Application configuration
//!
//! Layered: built-in defaults, then an optional TOML file, then
//! `GAZE_DRIVE__*` environment variables (`__` separates nested keys, e.g.
//! `GAZE_DRIVE__CONTROLLER__DWELL_MS=1200`).

use calibration::CalibrationConfig;
use config::{Config, ConfigError, Environment, File};
use drive_protocol::TransportConfig;
use gaze_control::ControllerConfig;
use gaze_source::Viewport;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use zone_map::HitPadding;

/// Config file looked up in the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "gaze-drive.toml";

const ENV_PREFIX: &str = "GAZE_DRIVE";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub controller: ControllerConfig,
    pub calibration: CalibrationConfig,
    pub transport: TransportConfig,
    /// Hysteresis padding for the control zones
    pub padding: HitPadding,
    /// Screen the gaze coordinates refer to
    pub viewport: Viewport,
    /// Gap between control zones (pixels)
    pub zone_gap_px: f64,
    /// Calibration state file
    pub store_path: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            controller: ControllerConfig::default(),
            calibration: CalibrationConfig::default(),
            transport: TransportConfig::default(),
            padding: HitPadding::default(),
            viewport: Viewport::default(),
            zone_gap_px: 16.0,
            store_path: PathBuf::from("gaze-drive-state.json"),
        }
    }
}

impl AppConfig {
    /// Load configuration. An explicit `path` must exist; otherwise
    /// `gaze-drive.toml` is read if present.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(path, None)
    }

    fn load_with_env(
        path: Option<&Path>,
        env: Option<HashMap<String, String>>,
    ) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let config: AppConfig = Config::builder()
            .add_source(Config::try_from(&AppConfig::default())?)
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true)
                    .source(env),
            )
            .build()?
            .try_deserialize()?;

        config
            .controller
            .validate()
            .map_err(|e| ConfigError::Message(e.to_string()))?;
        Ok(config)
    }
}
