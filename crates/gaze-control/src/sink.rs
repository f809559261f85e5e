//! Command output seam

use drive_protocol::{CommandSender, DriveCommand};

/// Where the controller's commands go.
///
/// Sends are fire-and-forget: the controller never waits for the write.
pub trait CommandSink: Send {
    fn send(&mut self, command: DriveCommand);

    /// Whether the vehicle link is currently up
    fn is_connected(&self) -> bool;
}

impl CommandSink for CommandSender {
    fn send(&mut self, command: DriveCommand) {
        if !CommandSender::send(self, command) {
            tracing::warn!("Command dispatcher gone, {} not sent", command);
        }
    }

    fn is_connected(&self) -> bool {
        CommandSender::is_connected(self)
    }
}
