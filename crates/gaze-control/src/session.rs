//! Drive session runtime
//!
//! Runs a [`GazeController`] on one task, multiplexing gaze frames, the
//! controller's timer deadline, link state changes, user requests and
//! send-failure reports. Frames are handled one at a time in arrival order.

use drive_protocol::{CommandSender, ConnectionState, SendFailure};
use gaze_source::{GazeFrame, GazeTracker};
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tracing::{debug, info, warn};
use zone_map::ZoneMap;

use crate::{ControlError, ControllerConfig, GazeController};

/// Frames buffered between the estimator and the controller
const FRAME_QUEUE: usize = 256;

/// User requests to a running session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    /// Set the speed (percent)
    SetSpeed(u16),
    EmergencyStop,
    Shutdown,
}

/// Handle for sending requests to a running session
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::UnboundedSender<SessionCommand>,
}

impl SessionHandle {
    /// Returns `false` if the session has ended
    pub fn send(&self, command: SessionCommand) -> bool {
        self.tx.send(command).is_ok()
    }

    pub fn set_speed(&self, percent: u16) -> bool {
        self.send(SessionCommand::SetSpeed(percent))
    }

    pub fn emergency_stop(&self) -> bool {
        self.send(SessionCommand::EmergencyStop)
    }

    pub fn shutdown(&self) -> bool {
        self.send(SessionCommand::Shutdown)
    }
}

/// Counters reported when a session ends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub frames: u64,
    pub absent_frames: u64,
    pub send_failures: u64,
}

pub struct DriveSession<G> {
    controller: GazeController<CommandSender>,
    tracker: G,
    frames: mpsc::Receiver<GazeFrame>,
    connection: watch::Receiver<ConnectionState>,
    requests: mpsc::UnboundedReceiver<SessionCommand>,
    handle: SessionHandle,
    failures: Option<mpsc::UnboundedReceiver<SendFailure>>,
    summary: SessionSummary,
}

impl<G: GazeTracker> DriveSession<G> {
    /// Wire a session. `failures` receives write errors from the dispatcher.
    pub fn new(
        config: ControllerConfig,
        zones: ZoneMap,
        mut tracker: G,
        sender: CommandSender,
        failures: Option<mpsc::UnboundedReceiver<SendFailure>>,
    ) -> Result<Self, ControlError> {
        config.validate()?;

        let (frame_tx, frames) = mpsc::channel(FRAME_QUEUE);
        tracker.set_listener(frame_tx);
        let (tx, requests) = mpsc::unbounded_channel();
        let connection = sender.connection();

        Ok(Self {
            controller: GazeController::new(config, zones, sender),
            tracker,
            frames,
            connection,
            requests,
            handle: SessionHandle { tx },
            failures,
            summary: SessionSummary::default(),
        })
    }

    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    pub fn controller(&self) -> &GazeController<CommandSender> {
        &self.controller
    }

    /// Start the estimator and process events until the frame stream ends
    /// or a shutdown is requested. The link is left open.
    pub async fn run(mut self) -> Result<SessionSummary, ControlError> {
        self.tracker.begin()?;
        info!("Drive session started");

        let mut watching_link = true;
        loop {
            let deadline = self.controller.next_deadline();

            tokio::select! {
                biased;

                changed = self.connection.changed(), if watching_link => {
                    let connected = match changed {
                        Ok(()) => self.connection.borrow_and_update().connected,
                        Err(_) => {
                            warn!("Vehicle link closed");
                            watching_link = false;
                            false
                        }
                    };
                    self.controller.on_connection_change(connected);
                }

                _ = wait_until(deadline) => {
                    self.controller.on_timer(Instant::now());
                }

                frame = self.frames.recv() => match frame {
                    Some(frame) => {
                        self.summary.frames += 1;
                        if frame.is_absent() {
                            self.summary.absent_frames += 1;
                        }
                        self.controller.handle_frame(&frame, Instant::now());
                    }
                    None => {
                        info!("Gaze stream ended");
                        break;
                    }
                },

                Some(request) = self.requests.recv() => match request {
                    SessionCommand::SetSpeed(percent) => {
                        self.controller.set_speed(percent);
                    }
                    SessionCommand::EmergencyStop => {
                        self.controller.emergency_stop(Instant::now());
                    }
                    SessionCommand::Shutdown => {
                        info!("Drive session shutdown requested");
                        break;
                    }
                },

                Some(failure) = next_failure(&mut self.failures) => {
                    self.summary.send_failures += 1;
                    warn!("Command {} not delivered: {}", failure.command, failure.error);
                }
            }
        }

        self.teardown();
        Ok(self.summary)
    }

    fn teardown(&mut self) {
        self.controller.teardown();
        if self.tracker.is_running() {
            self.tracker.end();
        }
        debug!("Drive session summary: {:?}", self.summary);
        info!("Drive session ended");
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn next_failure(
    failures: &mut Option<mpsc::UnboundedReceiver<SendFailure>>,
) -> Option<SendFailure> {
    match failures {
        Some(rx) => {
            let failure = rx.recv().await;
            if failure.is_none() {
                *failures = None;
            }
            failure
        }
        None => std::future::pending().await,
    }
}
