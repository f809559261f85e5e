//! Gaze Command Controller
//!
//! Turns a stream of gaze frames into drive commands:
//! - Dwell-time activation of a directional zone
//! - Strict (inset) exit test while moving, forgiving (padded) entry test
//! - Emergency stop when tracking is lost
//! - Brake watchdog when the "still in zone" signal stalls
//!
//! [`GazeController`] is a synchronous state machine driven by explicit
//! timestamps; [`DriveSession`] runs it on a tokio task.

pub mod config;
pub mod controller;
pub mod session;
pub mod sink;
pub mod state;
pub mod timer;

pub use config::{ControllerConfig, SPEED_PRESETS};
pub use controller::GazeController;
pub use session::{DriveSession, SessionCommand, SessionHandle, SessionSummary};
pub use sink::CommandSink;
pub use state::{ControllerState, Phase};
pub use timer::DelayTimer;

use gaze_source::GazeError;
use thiserror::Error;

/// Controller error types
#[derive(Error, Debug)]
pub enum ControlError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Gaze estimator failed to start: {0}")]
    Tracker(#[from] GazeError),
}
