//! Gaze Drive Runtime
//!
//! Wires the gaze estimator stream, calibration state, zone map, controller
//! and vehicle link into a running drive session.

pub mod config;

pub use config::{AppConfig, DEFAULT_CONFIG_FILE};

use anyhow::{bail, Context, Result};
use calibration::{CalibrationStatus, CalibrationStore};
use chrono::Utc;
use drive_protocol::{CommandDispatcher, MockTransport, SerialTransport, Transport};
use gaze_control::{DriveSession, SessionSummary};
use gaze_source::NdjsonTracker;
use storage::JsonFileStore;
use tokio::io::BufReader;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use zone_map::ZoneMap;

/// Options for a drive run
#[derive(Debug, Clone, Default)]
pub struct DriveOptions {
    /// Record commands instead of opening the serial link
    pub dry_run: bool,
    /// Drive even if the saved calibration is missing or invalid
    pub skip_calibration_check: bool,
    /// Speed to send at session start (percent)
    pub initial_speed: Option<u16>,
    /// Stop the vehicle and close the link when the session ends
    pub disconnect_on_exit: bool,
}

/// Initialize logging to stderr. `RUST_LOG` overrides the default `info` level.
pub fn init_logging(json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    let result = if json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };
    result.context("Failed to set tracing subscriber")
}

fn calibration_store(config: &AppConfig) -> Result<CalibrationStore<JsonFileStore>> {
    let store = JsonFileStore::open(&config.store_path)
        .with_context(|| format!("Failed to open {}", config.store_path.display()))?;
    Ok(CalibrationStore::new(store))
}

/// Status of the saved calibration
pub fn calibration_status(config: &AppConfig) -> Result<CalibrationStatus> {
    let status = calibration_store(config)?.status(&config.calibration, Utc::now())?;
    Ok(status)
}

/// Remove the saved calibration
pub fn clear_calibration(config: &AppConfig) -> Result<()> {
    calibration_store(config)?.clear()?;
    Ok(())
}

/// Drive from gaze frames read on stdin until the stream ends or Ctrl-C.
///
/// Training commands for the estimator are written to stdout.
pub async fn run_drive(config: AppConfig, options: DriveOptions) -> Result<SessionSummary> {
    let status = calibration_status(&config)?;
    info!("{}", status.message());
    if !status.is_calibrated() {
        if !options.skip_calibration_check {
            bail!("{}", status.message());
        }
        warn!("Driving without a valid calibration");
    }

    let mut zones = ZoneMap::wheelchair_grid(config.viewport, config.zone_gap_px, config.padding)
        .context("Invalid zone layout")?;
    zones.scale_entry_for_accuracy(status.accuracy());

    if options.dry_run {
        info!("Dry run: commands are recorded, not sent");
        let (transport, mock) = MockTransport::connected();
        let summary = drive(transport, zones, config, &options).await?;
        info!("Dry run sent: {:?}", mock.sent_wire());
        Ok(summary)
    } else {
        let mut transport = SerialTransport::new(config.transport.clone());
        transport
            .connect()
            .await
            .with_context(|| format!("Failed to open vehicle link {}", config.transport.device))?;
        drive(transport, zones, config, &options).await
    }
}

async fn drive<T: Transport>(
    transport: T,
    zones: ZoneMap,
    config: AppConfig,
    options: &DriveOptions,
) -> Result<SessionSummary> {
    let (failure_tx, failure_rx) = mpsc::unbounded_channel();
    let (sender, dispatcher) = CommandDispatcher::spawn(transport, Some(failure_tx));
    let link = sender.clone();

    let tracker = NdjsonTracker::new(BufReader::new(tokio::io::stdin()), std::io::stdout());
    let session = DriveSession::new(config.controller, zones, tracker, sender, Some(failure_rx))?;
    let handle = session.handle();

    if let Some(speed) = options.initial_speed {
        handle.set_speed(speed);
    }

    let interrupt = handle.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping");
            interrupt.emergency_stop();
            interrupt.shutdown();
        }
    });

    let summary = session.run().await?;
    info!(
        "Session ended: {} frames ({} without gaze), {} failed sends",
        summary.frames, summary.absent_frames, summary.send_failures
    );

    if options.disconnect_on_exit {
        link.disconnect();
    }
    drop(link);
    dispatcher.await.context("Command dispatcher panicked")?;

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use calibration::{AnchorLayout, CalibrationResult};

    fn config_with_store(name: &str) -> AppConfig {
        AppConfig {
            store_path: std::env::temp_dir()
                .join(format!("gaze-drive-pilot-{}-{}.json", std::process::id(), name)),
            ..Default::default()
        }
    }

    #[test]
    fn test_status_and_clear_round_trip_through_file() {
        let config = config_with_store("status");
        let _ = std::fs::remove_file(&config.store_path);
        assert_eq!(
            calibration_status(&config).unwrap(),
            CalibrationStatus::NotCalibrated
        );

        let anchors = AnchorLayout::NinePoint.anchors(config.viewport, 5);
        calibration_store(&config)
            .unwrap()
            .save(&CalibrationResult::new(82, Utc::now()), &anchors)
            .unwrap();
        assert_eq!(
            calibration_status(&config).unwrap(),
            CalibrationStatus::Calibrated { accuracy: 82 }
        );

        clear_calibration(&config).unwrap();
        assert_eq!(
            calibration_status(&config).unwrap(),
            CalibrationStatus::NotCalibrated
        );
        let _ = std::fs::remove_file(&config.store_path);
    }

    #[tokio::test]
    async fn test_drive_refused_without_calibration() {
        let config = config_with_store("refuse");
        let _ = std::fs::remove_file(&config.store_path);

        let err = run_drive(
            config,
            DriveOptions {
                dry_run: true,
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("not calibrated"));
    }
}
