//! Ordered Command Dispatcher
//!
//! A single writer task drains a queue into the transport so commands reach
//! the link in the order they were issued. Callers never wait on the write.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::{ConnectionState, DriveCommand, Transport, TransportError};

/// A command that could not be written
#[derive(Debug, Clone)]
pub struct SendFailure {
    pub command: DriveCommand,
    pub error: TransportError,
}

/// Counters shared between the dispatcher task and its senders
#[derive(Debug, Default)]
pub struct DispatchStats {
    sent: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

impl DispatchStats {
    /// Commands written successfully
    pub fn sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }

    /// Commands whose write failed
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Commands discarded because the link was down
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

#[derive(Debug)]
enum Outbound {
    Command(DriveCommand),
    Connect,
    Disconnect,
}

/// Cloneable handle used to queue commands
#[derive(Clone)]
pub struct CommandSender {
    tx: mpsc::UnboundedSender<Outbound>,
    connection: watch::Receiver<ConnectionState>,
    stats: Arc<DispatchStats>,
}

impl CommandSender {
    /// Queue a command. Returns `false` if the dispatcher has shut down.
    pub fn send(&self, command: DriveCommand) -> bool {
        self.tx.send(Outbound::Command(command)).is_ok()
    }

    /// Ask the dispatcher to (re)open the link
    pub fn connect(&self) -> bool {
        self.tx.send(Outbound::Connect).is_ok()
    }

    /// Stop the vehicle, then close the link
    pub fn disconnect(&self) -> bool {
        self.tx.send(Outbound::Disconnect).is_ok()
    }

    /// Current link state
    pub fn is_connected(&self) -> bool {
        self.connection.borrow().connected
    }

    /// Subscribe to link state changes
    pub fn connection(&self) -> watch::Receiver<ConnectionState> {
        self.connection.clone()
    }

    pub fn stats(&self) -> &DispatchStats {
        &self.stats
    }
}

/// Spawns and owns the writer task
pub struct CommandDispatcher;

impl CommandDispatcher {
    /// Spawn the writer task over `transport`.
    ///
    /// Write failures are logged, counted and forwarded to `failures` if
    /// given; they are never retried. The task ends when every
    /// [`CommandSender`] is dropped and hands the transport back without
    /// disconnecting it.
    pub fn spawn<T: Transport>(
        transport: T,
        failures: Option<mpsc::UnboundedSender<SendFailure>>,
    ) -> (CommandSender, JoinHandle<T>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let stats = Arc::new(DispatchStats::default());
        let sender = CommandSender {
            tx,
            connection: transport.connection(),
            stats: stats.clone(),
        };

        let task = tokio::spawn(Self::run(transport, rx, stats, failures));
        (sender, task)
    }

    async fn run<T: Transport>(
        mut transport: T,
        mut rx: mpsc::UnboundedReceiver<Outbound>,
        stats: Arc<DispatchStats>,
        failures: Option<mpsc::UnboundedSender<SendFailure>>,
    ) -> T {
        info!("Starting command dispatcher");

        while let Some(outbound) = rx.recv().await {
            match outbound {
                Outbound::Command(command) => {
                    Self::write(&mut transport, command, &stats, failures.as_ref()).await;
                }
                Outbound::Connect => {
                    if let Err(e) = transport.connect().await {
                        warn!("Vehicle link connect failed: {}", e);
                    }
                }
                Outbound::Disconnect => {
                    if transport.is_connected() {
                        Self::write(&mut transport, DriveCommand::Stop, &stats, failures.as_ref())
                            .await;
                        transport.disconnect().await;
                    }
                }
            }
        }

        info!("Command dispatcher stopped");
        transport
    }

    async fn write<T: Transport>(
        transport: &mut T,
        command: DriveCommand,
        stats: &DispatchStats,
        failures: Option<&mpsc::UnboundedSender<SendFailure>>,
    ) {
        if !transport.is_connected() {
            debug!("Not connected, dropping {}", command);
            stats.dropped.fetch_add(1, Ordering::Relaxed);
            return;
        }

        match transport.send(command).await {
            Ok(()) => {
                stats.sent.fetch_add(1, Ordering::Relaxed);
            }
            Err(error) => {
                warn!("Error sending command {}: {}", command, error);
                stats.failed.fetch_add(1, Ordering::Relaxed);
                if let Some(failures) = failures {
                    let _ = failures.send(SendFailure { command, error });
                }
            }
        }
    }
}
