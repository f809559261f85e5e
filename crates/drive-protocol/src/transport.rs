//! Transport Contract

use std::future::Future;
use tokio::sync::watch;

use crate::{DriveCommand, TransportError};

/// Link state published by a transport
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionState {
    /// Whether commands can currently be written
    pub connected: bool,
    /// Name or path of the connected device
    pub device: Option<String>,
}

impl ConnectionState {
    pub fn connected(device: impl Into<String>) -> Self {
        Self {
            connected: true,
            device: Some(device.into()),
        }
    }

    pub fn disconnected() -> Self {
        Self::default()
    }
}

/// A command channel to the vehicle.
///
/// The transport owns its `ConnectionState`; consumers observe it through
/// the receiver returned by [`Transport::connection`]. A transition from
/// connected to disconnected is the disconnected event.
pub trait Transport: Send + 'static {
    /// Open the link
    fn connect(&mut self) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Close the link
    fn disconnect(&mut self) -> impl Future<Output = ()> + Send;

    /// Write one command
    fn send(
        &mut self,
        command: DriveCommand,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Subscribe to connection state changes
    fn connection(&self) -> watch::Receiver<ConnectionState>;

    /// Check if the link is up
    fn is_connected(&self) -> bool {
        self.connection().borrow().connected
    }
}
