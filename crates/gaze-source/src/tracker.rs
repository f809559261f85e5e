//! Gaze estimator interface

use tokio::sync::mpsc;

use crate::{GazeError, GazeFrame, ScreenPoint};

/// Lifecycle and training interface of a gaze estimator.
///
/// Implementations deliver frames to the listener in arrival order. The
/// estimator model itself is opaque; callers only see frames and the
/// training/buffering hooks.
pub trait GazeTracker: Send {
    /// Start the estimator (camera + model). Fails if the camera is unavailable.
    fn begin(&mut self) -> Result<(), GazeError>;

    /// Stop the estimator and release the camera
    fn end(&mut self);

    /// Whether `begin` succeeded and `end` has not been called since
    fn is_running(&self) -> bool;

    /// Route frames to `listener`, replacing any previous listener
    fn set_listener(&mut self, listener: mpsc::Sender<GazeFrame>);

    /// Feed a click at a known screen position to the training intake
    fn train_on_click(&mut self, position: ScreenPoint);

    /// Start buffering raw gaze points
    fn begin_buffering(&mut self);

    /// Stop buffering and return everything buffered since `begin_buffering`
    fn end_buffering(&mut self) -> Vec<ScreenPoint>;

    /// Discard all trained data
    fn clear_trained_data(&mut self);
}
