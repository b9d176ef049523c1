//! `slidekit daemon`: preview daemon lifecycle.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Subcommand;

use slidekit_preview::paths::socket_path;
use slidekit_preview::{request_status, request_stop, start_blocking, DaemonError};

use super::{home_dir, load_config, print_json};

#[derive(Subcommand, Debug)]
pub enum DaemonCommand {
    /// Run the daemon in the foreground (socket server + preview supervisor).
    Start,
    /// Request graceful shutdown; every preview is stopped.
    Stop,
    /// Query daemon runtime status.
    Status,
}

pub fn run(command: DaemonCommand, templates: Option<PathBuf>) -> Result<()> {
    match command {
        DaemonCommand::Start => {
            let (home, config) = load_config(templates)?;
            start_blocking(&home, config).context("daemon exited with error")?;
        }
        DaemonCommand::Stop => {
            let home = home_dir()?;
            match request_stop(&home) {
                Ok(()) => println!("daemon stop requested"),
                Err(DaemonError::DaemonNotRunning { .. }) => {
                    println!("daemon is not running");
                }
                Err(err) => return Err(err).context("failed to stop daemon"),
            }
        }
        DaemonCommand::Status => {
            let home = home_dir()?;
            match request_status(&home) {
                Ok(status) => print_json(&status)?,
                Err(DaemonError::DaemonNotRunning { .. }) => {
                    print_json(&serde_json::json!({
                        "running": false,
                        "socket": socket_path(&home).display().to_string(),
                    }))?;
                }
                Err(err) => return Err(err).context("failed to query daemon status"),
            }
        }
    }

    Ok(())
}
