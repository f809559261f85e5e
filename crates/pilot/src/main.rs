//! Gaze Drive - Main Entry Point

use anyhow::Result;
use clap::{Parser, Subcommand};
use pilot::{calibration_status, clear_calibration, init_logging, run_drive, AppConfig, DriveOptions};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "gaze-drive", version, about = "Steer a wheelchair by gaze")]
struct Cli {
    /// Config file (defaults to ./gaze-drive.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Drive from gaze frames on stdin
    Drive {
        /// Record commands instead of writing to the vehicle link
        #[arg(long)]
        dry_run: bool,

        /// Start even without a valid calibration
        #[arg(long)]
        skip_calibration_check: bool,

        /// Speed to set at start (percent)
        #[arg(long)]
        speed: Option<u16>,

        /// Stop the vehicle and close the link on exit
        #[arg(long)]
        disconnect: bool,
    },
    /// Show the saved calibration status
    Status,
    /// Remove the saved calibration
    ClearCalibration,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.json_logs)?;

    let config = AppConfig::load(cli.config.as_deref())?;
    info!("=== Gaze Drive v{} ===", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Drive {
            dry_run,
            skip_calibration_check,
            speed,
            disconnect,
        } => {
            let options = DriveOptions {
                dry_run,
                skip_calibration_check,
                initial_speed: speed,
                disconnect_on_exit: disconnect,
            };
            run_drive(config, options).await?;
        }
        Command::Status => {
            let status = calibration_status(&config)?;
            println!("{}", status.message());
        }
        Command::ClearCalibration => {
            clear_calibration(&config)?;
            println!("Calibration cleared");
        }
    }

    Ok(())
}
