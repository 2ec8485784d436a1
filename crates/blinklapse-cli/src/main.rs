//! blink-lapse - capture still frames from Blink cameras for timelapse creation.
//!
//! Logs in once (reusing saved credentials when possible), then asks every
//! selected camera for a snapshot on a fixed interval and stores the results
//! under `<frames-dir>/<camera>/`. Ctrl+C stops it cleanly.

mod cli;
mod telemetry;

use std::process::ExitCode;

use anyhow::{Context, Result};
use blinklapse_core::{BlinkClient, Collector, StopReason, TerminalPrompter};
use clap::Parser;
use tracing::{error, info, warn};

use cli::Cli;

fn main() -> ExitCode {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _guard = telemetry::init_tracing(&cli.log_config());

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "Failed to start async runtime");
            return ExitCode::FAILURE;
        }
    };

    let code = match runtime.block_on(run(cli)) {
        Ok(reason) => {
            info!(?reason, "blink-lapse stopped");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    };

    // An interrupted prompt may still be blocked reading stdin
    runtime.shutdown_background();
    code
}

async fn run(cli: Cli) -> Result<StopReason> {
    let blink = BlinkClient::new().context("Failed to create HTTP client")?;
    let mut collector = Collector::new(
        cli.collector_config(),
        cli.env_credentials(),
        TerminalPrompter,
    );

    collector.run_until(|| blink.fresh(), ctrl_c()).await
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}
