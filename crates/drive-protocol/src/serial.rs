//! Serial Transport for BLE-UART bridges and ESP32 controllers
//!
//! Writes commands over a serial port (a BLE serial bridge or a USB-attached
//! ESP32 running the vehicle firmware).

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::watch;
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tracing::{debug, info, warn};

use crate::{ConnectionState, DriveCommand, Transport, TransportError};

/// Serial link configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Serial port device path (e.g., "/dev/rfcomm0" or "COM3")
    pub device: String,
    /// Baud rate
    pub baud_rate: u32,
    /// Write timeout in milliseconds
    pub write_timeout_ms: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            device: "/dev/rfcomm0".to_string(),
            baud_rate: 115200,
            write_timeout_ms: 250,
        }
    }
}

/// Command link over a serial port
pub struct SerialTransport {
    config: TransportConfig,
    port: Option<SerialStream>,
    connection: Arc<watch::Sender<ConnectionState>>,
}

impl SerialTransport {
    pub fn new(config: TransportConfig) -> Self {
        info!("Creating serial transport for device: {}", config.device);
        let (connection, _) = watch::channel(ConnectionState::disconnected());
        Self {
            config,
            port: None,
            connection: Arc::new(connection),
        }
    }

    fn mark_disconnected(&mut self) {
        self.port = None;
        self.connection.send_replace(ConnectionState::disconnected());
    }
}

/// Write and flush `bytes` under a single deadline
async fn write_bounded<W>(port: &mut W, bytes: &[u8], timeout_ms: u64) -> Result<(), TransportError>
where
    W: AsyncWrite + Unpin,
{
    let write = async {
        port.write_all(bytes).await?;
        port.flush().await
    };
    match tokio::time::timeout(Duration::from_millis(timeout_ms), write).await {
        Ok(result) => result.map_err(TransportError::from),
        Err(_) => Err(TransportError::Timeout(timeout_ms)),
    }
}

impl Transport for SerialTransport {
    async fn connect(&mut self) -> Result<(), TransportError> {
        if self.port.is_some() {
            return Ok(());
        }

        info!(
            "Opening serial link {} @ {} baud",
            self.config.device, self.config.baud_rate
        );
        let port = tokio_serial::new(&self.config.device, self.config.baud_rate)
            .timeout(Duration::from_millis(self.config.write_timeout_ms))
            .open_native_async()?;

        self.port = Some(port);
        self.connection
            .send_replace(ConnectionState::connected(self.config.device.clone()));
        info!("Serial link connected");
        Ok(())
    }

    async fn disconnect(&mut self) {
        if let Some(mut port) = self.port.take() {
            info!("Closing serial link {}", self.config.device);
            if let Err(e) = port.shutdown().await {
                debug!("Serial shutdown error: {}", e);
            }
        }
        self.connection.send_replace(ConnectionState::disconnected());
    }

    async fn send(&mut self, command: DriveCommand) -> Result<(), TransportError> {
        let timeout_ms = self.config.write_timeout_ms;
        let port = self.port.as_mut().ok_or(TransportError::NotConnected)?;

        let result = write_bounded(port, &command.to_bytes(), timeout_ms).await;
        match result {
            Ok(()) => {
                debug!("Wrote {} to serial link", command);
                Ok(())
            }
            Err(TransportError::Disconnected) => {
                warn!("Serial link dropped while writing {}", command);
                self.mark_disconnected();
                Err(TransportError::Disconnected)
            }
            Err(e) => Err(e),
        }
    }

    fn connection(&self) -> watch::Receiver<ConnectionState> {
        self.connection.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    /// Accepts every write, never completes a flush
    #[derive(Default)]
    struct StalledFlush {
        written: Vec<u8>,
    }

    impl AsyncWrite for StalledFlush {
        fn poll_write(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            self.written.extend_from_slice(buf);
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Pending
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_flush_times_out() {
        let mut port = StalledFlush::default();
        let result = write_bounded(&mut port, b"S", 250).await;
        assert!(matches!(result, Err(TransportError::Timeout(250))));
        assert_eq!(port.written, b"S");
    }

    #[tokio::test]
    async fn test_bounded_write_completes() {
        let mut port = Vec::new();
        write_bounded(&mut port, &DriveCommand::Speed(75).to_bytes(), 250)
            .await
            .unwrap();
        assert_eq!(port, b"V75");
    }

    #[tokio::test]
    async fn test_send_before_connect() {
        let mut transport = SerialTransport::new(TransportConfig::default());
        assert!(!transport.is_connected());
        assert!(matches!(
            transport.send(DriveCommand::Stop).await,
            Err(TransportError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_connect_missing_device() {
        let mut transport = SerialTransport::new(TransportConfig {
            device: "/dev/does-not-exist-gaze-drive".to_string(),
            ..Default::default()
        });
        assert!(matches!(
            transport.connect().await,
            Err(TransportError::ConnectFailed(_))
        ));
        assert!(!transport.is_connected());
    }
}
