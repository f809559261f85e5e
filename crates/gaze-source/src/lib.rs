//! Gaze Source
//!
//! Types and interfaces for the gaze estimator that drives calibration and control:
//! - Gaze samples in screen pixels, or an absent frame when no face/eyes are detected
//! - The estimator lifecycle and training interface (`GazeTracker`)
//! - A newline-delimited JSON tracker fed by an external estimator process

pub mod sample;
pub mod stream;
pub mod tracker;

pub use sample::{GazeFrame, GazeSample, ScreenPoint, Viewport};
pub use stream::{NdjsonTracker, TrackerCommand};
pub use tracker::GazeTracker;

use thiserror::Error;

/// Gaze source error types
#[derive(Error, Debug)]
pub enum GazeError {
    #[error("Camera unavailable: {0}")]
    CameraUnavailable(String),

    #[error("Gaze estimator failed to start: {0}")]
    InitFailed(String),

    #[error("Malformed gaze frame: {0}")]
    MalformedFrame(String),
}
