//! Command-line and environment configuration.
//!
//! Every setting can come from a flag or the matching `BLINK_*` variable;
//! flags win.

use std::path::PathBuf;
use std::time::Duration;

use blinklapse_core::config::{
    DEFAULT_CREDENTIALS_FILE, DEFAULT_FRAMES_DIR, DEFAULT_INTERVAL_SECS, DEFAULT_SETTLE_DELAY_SECS,
};
use blinklapse_core::{CollectorConfig, EnvCredentials};
use clap::Parser;

use crate::telemetry::LogConfig;

#[derive(Parser, Debug)]
#[command(author, version, about = "Capture timelapse frames from Blink cameras.")]
pub struct Cli {
    /// Capture interval in seconds
    #[arg(
        long,
        env = "BLINK_INTERVAL",
        default_value_t = DEFAULT_INTERVAL_SECS,
        value_parser = clap::value_parser!(u64).range(1..),
        value_name = "SECONDS"
    )]
    pub interval: u64,

    /// Camera name(s) to capture. Defaults to all cameras.
    #[arg(
        long,
        env = "BLINK_CAMERAS",
        num_args = 1..,
        value_delimiter = ',',
        value_name = "NAME"
    )]
    pub cameras: Option<Vec<String>>,

    /// Directory to store captured frames
    #[arg(long, env = "BLINK_FRAMES_DIR", default_value = DEFAULT_FRAMES_DIR, value_name = "DIR")]
    pub frames_dir: PathBuf,

    /// Path to credentials cache file
    #[arg(
        long,
        env = "BLINK_CREDENTIALS",
        default_value = DEFAULT_CREDENTIALS_FILE,
        value_name = "FILE"
    )]
    pub credentials: PathBuf,

    /// Seconds to wait between triggering a snapshot and downloading it
    #[arg(
        long,
        env = "BLINK_SETTLE_DELAY",
        default_value_t = DEFAULT_SETTLE_DELAY_SECS,
        value_name = "SECONDS"
    )]
    pub settle_delay: u64,

    /// Capture a single frame then exit (useful for testing)
    #[arg(long)]
    pub once: bool,

    /// Enable verbose/debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Also write daily log files to this directory
    #[arg(long, env = "BLINK_LOG_DIR", value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// Blink account email; prompted for when unset
    #[arg(long, env = "BLINK_USERNAME", value_name = "EMAIL")]
    pub username: Option<String>,

    /// Blink account password; prompted for when unset
    #[arg(long, env = "BLINK_PASSWORD", hide = true, hide_env_values = true)]
    pub password: Option<String>,
}

impl Cli {
    pub fn collector_config(&self) -> CollectorConfig {
        CollectorConfig {
            interval: Duration::from_secs(self.interval),
            settle_delay: Duration::from_secs(self.settle_delay),
            camera_filter: self
                .cameras
                .clone()
                .filter(|names| !names.is_empty()),
            frames_dir: self.frames_dir.clone(),
            credentials_file: self.credentials.clone(),
            once: self.once,
        }
    }

    pub fn env_credentials(&self) -> EnvCredentials {
        EnvCredentials::new(self.username.clone(), self.password.clone())
    }

    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            verbose: self.verbose,
            log_dir: self.log_dir.clone(),
        }
    }
}
