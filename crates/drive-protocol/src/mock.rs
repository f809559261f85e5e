//! Mock transport for testing and dry runs (no hardware required)

use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::{ConnectionState, DriveCommand, Transport, TransportError};

#[derive(Debug, Default)]
struct MockState {
    sent: Vec<DriveCommand>,
    fail_writes: bool,
}

/// Transport that records commands instead of writing them
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
    connection: Arc<watch::Sender<ConnectionState>>,
}

/// Inspection and fault-injection handle for a [`MockTransport`]
#[derive(Clone)]
pub struct MockHandle {
    state: Arc<Mutex<MockState>>,
    connection: Arc<watch::Sender<ConnectionState>>,
}

impl MockTransport {
    /// Create a mock transport that starts connected
    pub fn connected() -> (Self, MockHandle) {
        let (transport, handle) = Self::disconnected();
        handle.connection.send_replace(ConnectionState::connected("mock"));
        (transport, handle)
    }

    /// Create a mock transport that starts disconnected
    pub fn disconnected() -> (Self, MockHandle) {
        info!("Creating mock transport");
        let state = Arc::new(Mutex::new(MockState::default()));
        let (connection, _) = watch::channel(ConnectionState::disconnected());
        let connection = Arc::new(connection);
        let handle = MockHandle {
            state: state.clone(),
            connection: connection.clone(),
        };
        (Self { state, connection }, handle)
    }
}

impl MockHandle {
    /// Commands written so far, in order
    pub fn sent(&self) -> Vec<DriveCommand> {
        self.state.lock().map(|s| s.sent.clone()).unwrap_or_default()
    }

    /// Encoded wire strings written so far, in order
    pub fn sent_wire(&self) -> Vec<String> {
        self.sent().iter().map(DriveCommand::encode).collect()
    }

    /// Make subsequent writes fail (or succeed again)
    pub fn set_fail_writes(&self, fail: bool) {
        if let Ok(mut state) = self.state.lock() {
            state.fail_writes = fail;
        }
    }

    /// Simulate the remote device dropping the link
    pub fn drop_link(&self) {
        self.connection.send_replace(ConnectionState::disconnected());
    }

    /// Simulate the link coming back
    pub fn restore_link(&self) {
        self.connection.send_replace(ConnectionState::connected("mock"));
    }

    pub fn clear(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.sent.clear();
        }
    }
}

impl Transport for MockTransport {
    async fn connect(&mut self) -> Result<(), TransportError> {
        self.connection.send_replace(ConnectionState::connected("mock"));
        Ok(())
    }

    async fn disconnect(&mut self) {
        self.connection.send_replace(ConnectionState::disconnected());
    }

    async fn send(&mut self, command: DriveCommand) -> Result<(), TransportError> {
        if !self.connection.borrow().connected {
            return Err(TransportError::NotConnected);
        }

        let mut state = self
            .state
            .lock()
            .map_err(|e| TransportError::WriteFailed(format!("Lock error: {}", e)))?;
        if state.fail_writes {
            return Err(TransportError::WriteFailed("injected write failure".to_string()));
        }

        debug!("Mock transport wrote {}", command);
        state.sent.push(command);
        Ok(())
    }

    fn connection(&self) -> watch::Receiver<ConnectionState> {
        self.connection.subscribe()
    }
}
