//! Calibration results and their persisted form

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use storage::KeyValueStore;
use tracing::{debug, info};

use crate::{CalibrationAnchor, CalibrationConfig, CalibrationError};

/// Storage keys
pub mod keys {
    /// Full calibration record (JSON)
    pub const RECORD: &str = "wheelchair_calibration";
    /// Calibration-complete flag ("true")
    pub const COMPLETE: &str = "wheelchair_calibration_complete";
    /// Last measured accuracy (integer percent)
    pub const ACCURACY: &str = "wheelchair_calibration_accuracy";
}

/// Outcome of one accuracy measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalibrationResult {
    pub accuracy_percent: u8,
    pub timestamp: DateTime<Utc>,
}

impl CalibrationResult {
    pub fn new(accuracy_percent: u8, timestamp: DateTime<Utc>) -> Self {
        Self {
            accuracy_percent: accuracy_percent.min(100),
            timestamp,
        }
    }

    /// Accurate enough and younger than the maximum age
    pub fn is_valid(&self, config: &CalibrationConfig, now: DateTime<Utc>) -> bool {
        self.accuracy_percent >= config.min_accuracy
            && now - self.timestamp < Duration::days(i64::from(config.max_age_days))
    }
}

/// Persisted calibration record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationRecord {
    pub complete: bool,
    pub accuracy: Option<u8>,
    /// Click counts per anchor id at the time of measurement
    #[serde(default)]
    pub anchor_clicks: BTreeMap<String, u32>,
    pub timestamp: DateTime<Utc>,
}

impl CalibrationRecord {
    pub fn result(&self) -> Option<CalibrationResult> {
        self.accuracy
            .map(|accuracy| CalibrationResult::new(accuracy, self.timestamp))
    }
}

/// Calibration state as seen by a control session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CalibrationStatus {
    /// No calibration has been saved
    NotCalibrated,
    /// Saved calibration is outdated or not accurate enough
    Expired { accuracy: Option<u8> },
    Calibrated { accuracy: u8 },
}

impl CalibrationStatus {
    pub fn is_calibrated(&self) -> bool {
        matches!(self, CalibrationStatus::Calibrated { .. })
    }

    /// Entry accuracy used to size zone hit areas
    pub fn accuracy(&self) -> Option<u8> {
        match self {
            CalibrationStatus::NotCalibrated => None,
            CalibrationStatus::Expired { accuracy } => *accuracy,
            CalibrationStatus::Calibrated { accuracy } => Some(*accuracy),
        }
    }

    /// Message for the user
    pub fn message(&self) -> String {
        match self {
            CalibrationStatus::NotCalibrated => {
                "Eye tracking not calibrated. Please complete calibration.".to_string()
            }
            CalibrationStatus::Expired { .. } => {
                "Calibration is outdated or inaccurate. Please recalibrate.".to_string()
            }
            CalibrationStatus::Calibrated { accuracy } => {
                format!("Eye tracking calibrated with {}% accuracy", accuracy)
            }
        }
    }
}

/// Calibration persistence over a key-value store
pub struct CalibrationStore<S> {
    store: S,
}

impl<S: KeyValueStore> CalibrationStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Save a measured result with the anchor state that produced it
    pub fn save(
        &self,
        result: &CalibrationResult,
        anchors: &[CalibrationAnchor],
    ) -> Result<(), CalibrationError> {
        let record = CalibrationRecord {
            complete: true,
            accuracy: Some(result.accuracy_percent),
            anchor_clicks: anchors
                .iter()
                .map(|a| (a.id.clone(), a.clicks_so_far))
                .collect(),
            timestamp: result.timestamp,
        };

        self.store.set_json(keys::RECORD, &record)?;
        self.store.set(keys::COMPLETE, "true")?;
        self.store
            .set(keys::ACCURACY, &result.accuracy_percent.to_string())?;
        info!("Saved calibration with {}% accuracy", result.accuracy_percent);
        Ok(())
    }

    pub fn load(&self) -> Result<Option<CalibrationRecord>, CalibrationError> {
        Ok(self.store.get_json(keys::RECORD)?)
    }

    /// Remove the record, flag and accuracy keys
    pub fn clear(&self) -> Result<(), CalibrationError> {
        self.store.remove(keys::RECORD)?;
        self.store.remove(keys::COMPLETE)?;
        self.store.remove(keys::ACCURACY)?;
        info!("Cleared saved calibration");
        Ok(())
    }

    pub fn status(
        &self,
        config: &CalibrationConfig,
        now: DateTime<Utc>,
    ) -> Result<CalibrationStatus, CalibrationError> {
        let Some(record) = self.load()? else {
            return Ok(CalibrationStatus::NotCalibrated);
        };

        let status = match record.result() {
            Some(result) if record.complete && result.is_valid(config, now) => {
                CalibrationStatus::Calibrated {
                    accuracy: result.accuracy_percent,
                }
            }
            _ => CalibrationStatus::Expired {
                accuracy: record.accuracy,
            },
        };
        debug!("Calibration status: {:?}", status);
        Ok(status)
    }

    pub fn inner(&self) -> &S {
        &self.store
    }
}
