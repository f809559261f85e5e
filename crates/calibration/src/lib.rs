//! Gaze Calibration
//!
//! This crate provides the calibration workflow run before gaze driving:
//! - Click collection on fixed screen anchors, fed to the estimator's training intake
//! - Accuracy measurement against a central fixation target
//! - Persisted results with a validity window (minimum accuracy, maximum age)

mod accuracy;
mod engine;
mod layout;
mod result;

pub use accuracy::{compute_accuracy, precision};
pub use engine::{CalibrationEngine, ClickOutcome};
pub use layout::{AnchorLayout, CalibrationAnchor, CalibrationConfig};
pub use result::{keys, CalibrationRecord, CalibrationResult, CalibrationStatus, CalibrationStore};

use gaze_source::GazeError;
use storage::StorageError;
use thiserror::Error;

/// Calibration error types
#[derive(Error, Debug)]
pub enum CalibrationError {
    #[error("Gaze estimator failed to start: {0}")]
    TrackerInit(#[from] GazeError),

    #[error("Calibration session not started")]
    NotStarted,

    #[error("Unknown calibration anchor: {0}")]
    UnknownAnchor(String),

    #[error("Calibration anchor {0} is not shown yet")]
    AnchorHidden(String),

    #[error("Calibration not ready: {completed}/{total} anchors complete")]
    NotReady { completed: usize, total: usize },

    #[error("No accuracy measurement in progress")]
    NoMeasurement,

    #[error("Accuracy measurement still running ({remaining_ms} ms left)")]
    MeasurementPending { remaining_ms: u64 },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}
