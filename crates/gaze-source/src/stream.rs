//! Newline-delimited JSON gaze tracker
//!
//! Consumes frames produced by an external estimator process (one JSON
//! object or `null` per line) and writes training commands back as JSON
//! lines.

use serde::Serialize;
use std::io::Write;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::{GazeError, GazeFrame, GazeTracker, ScreenPoint};

/// Control message sent back to the estimator process
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum TrackerCommand {
    Train { x: f64, y: f64 },
    ClearData,
}

type PointBuffer = Arc<Mutex<Option<Vec<ScreenPoint>>>>;

/// Gaze tracker backed by a JSON line stream
pub struct NdjsonTracker<R, W> {
    /// Frame input, taken by the reader task on `begin`
    input: Option<R>,
    /// Control output
    control: W,
    listener: Option<mpsc::Sender<GazeFrame>>,
    /// `Some` while buffering raw points
    buffer: PointBuffer,
    reader: Option<JoinHandle<()>>,
}

impl<R, W> NdjsonTracker<R, W>
where
    R: AsyncBufRead + Unpin + Send + 'static,
    W: Write + Send,
{
    pub fn new(input: R, control: W) -> Self {
        Self {
            input: Some(input),
            control,
            listener: None,
            buffer: Arc::new(Mutex::new(None)),
            reader: None,
        }
    }

    fn send_command(&mut self, command: &TrackerCommand) {
        let result = serde_json::to_string(command)
            .map_err(std::io::Error::from)
            .and_then(|line| writeln!(self.control, "{}", line))
            .and_then(|_| self.control.flush());
        if let Err(e) = result {
            warn!("Failed to send tracker command {:?}: {}", command, e);
        }
    }
}

impl<R, W> GazeTracker for NdjsonTracker<R, W>
where
    R: AsyncBufRead + Unpin + Send + 'static,
    W: Write + Send,
{
    fn begin(&mut self) -> Result<(), GazeError> {
        if self.is_running() {
            return Ok(());
        }

        let handle = tokio::runtime::Handle::try_current()
            .map_err(|e| GazeError::InitFailed(e.to_string()))?;
        let listener = self
            .listener
            .take()
            .ok_or_else(|| GazeError::InitFailed("no gaze listener registered".to_string()))?;
        let input = self
            .input
            .take()
            .ok_or_else(|| GazeError::InitFailed("gaze input already consumed".to_string()))?;
        let buffer = self.buffer.clone();

        self.reader = Some(handle.spawn(async move {
            let mut lines = input.lines();
            loop {
                let line = match lines.next_line().await {
                    Ok(Some(line)) => line,
                    Ok(None) => {
                        info!("Gaze stream ended");
                        break;
                    }
                    Err(e) => {
                        warn!("Gaze stream read error: {}", e);
                        break;
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }

                let frame = match GazeFrame::from_json_line(&line) {
                    Ok(frame) => frame,
                    Err(e) => {
                        debug!("Skipping gaze line: {}", e);
                        continue;
                    }
                };

                if let (Some(sample), Ok(mut guard)) = (frame.sample(), buffer.lock()) {
                    if let Some(points) = guard.as_mut() {
                        points.push(sample.point());
                    }
                }

                if listener.send(frame).await.is_err() {
                    debug!("Gaze listener dropped");
                    break;
                }
            }
        }));

        info!("Gaze stream tracker started");
        Ok(())
    }

    fn end(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
            info!("Gaze stream tracker stopped");
        }
    }

    fn is_running(&self) -> bool {
        self.reader.as_ref().map_or(false, |r| !r.is_finished())
    }

    fn set_listener(&mut self, listener: mpsc::Sender<GazeFrame>) {
        self.listener = Some(listener);
    }

    fn train_on_click(&mut self, position: ScreenPoint) {
        self.send_command(&TrackerCommand::Train {
            x: position.x,
            y: position.y,
        });
    }

    fn begin_buffering(&mut self) {
        if let Ok(mut guard) = self.buffer.lock() {
            *guard = Some(Vec::new());
        }
    }

    fn end_buffering(&mut self) -> Vec<ScreenPoint> {
        self.buffer
            .lock()
            .ok()
            .and_then(|mut guard| guard.take())
            .unwrap_or_default()
    }

    fn clear_trained_data(&mut self) {
        self.send_command(&TrackerCommand::ClearData);
    }
}

impl<R, W> Drop for NdjsonTracker<R, W> {
    fn drop(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GazeSample;
    use tokio::io::BufReader;

    const STREAM: &str = "{\"x\":100,\"y\":200,\"confidence\":0.9,\"timestamp_ms\":1}\n\
                          null\n\
                          \n\
                          garbage\n\
                          {\"x\":110,\"y\":210,\"confidence\":0.9,\"timestamp_ms\":3}\n";

    #[tokio::test]
    async fn test_frames_forwarded_in_order() {
        let mut tracker = NdjsonTracker::new(BufReader::new(STREAM.as_bytes()), Vec::new());
        let (tx, mut rx) = mpsc::channel(8);
        tracker.set_listener(tx);
        tracker.begin().unwrap();

        assert_eq!(
            rx.recv().await,
            Some(GazeFrame::Sample(GazeSample::new(100.0, 200.0, 0.9, 1)))
        );
        assert_eq!(rx.recv().await, Some(GazeFrame::Absent { timestamp_ms: 0 }));
        assert_eq!(
            rx.recv().await,
            Some(GazeFrame::Sample(GazeSample::new(110.0, 210.0, 0.9, 3)))
        );
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_begin_without_listener_fails() {
        let mut tracker = NdjsonTracker::new(BufReader::new(STREAM.as_bytes()), Vec::new());
        assert!(matches!(tracker.begin(), Err(GazeError::InitFailed(_))));
        assert!(!tracker.is_running());
    }

    #[tokio::test]
    async fn test_buffering_collects_samples_only() {
        let mut tracker = NdjsonTracker::new(BufReader::new(STREAM.as_bytes()), Vec::new());
        let (tx, mut rx) = mpsc::channel(8);
        tracker.set_listener(tx);
        tracker.begin_buffering();
        tracker.begin().unwrap();

        while rx.recv().await.is_some() {}

        let points = tracker.end_buffering();
        assert_eq!(
            points,
            vec![ScreenPoint::new(100.0, 200.0), ScreenPoint::new(110.0, 210.0)]
        );
        assert!(tracker.end_buffering().is_empty());
    }

    #[test]
    fn test_training_commands_written() {
        let mut tracker = NdjsonTracker::new(BufReader::new(&b""[..]), Vec::new());
        tracker.train_on_click(ScreenPoint::new(5.0, 6.0));
        tracker.clear_trained_data();

        let output = String::from_utf8(tracker.control.clone()).unwrap();
        let lines: Vec<_> = output.lines().collect();
        assert_eq!(lines[0], r#"{"command":"train","x":5.0,"y":6.0}"#);
        assert_eq!(lines[1], r#"{"command":"clear_data"}"#);
    }
}
