//! Collector configuration.
//!
//! Values are resolved by the binary from flags and environment variables
//! and passed in explicitly.

use std::path::PathBuf;
use std::time::Duration;

/// Seconds between the start of one capture cycle and the next
pub const DEFAULT_INTERVAL_SECS: u64 = 600;

/// Seconds to wait after a snapshot before downloading it.
/// Battery cameras need this long to wake, capture and upload.
pub const DEFAULT_SETTLE_DELAY_SECS: u64 = 10;

pub const DEFAULT_FRAMES_DIR: &str = "frames";

pub const DEFAULT_CREDENTIALS_FILE: &str = ".credentials.json";

#[derive(Debug, Clone)]
pub struct CollectorConfig {
    pub interval: Duration,
    pub settle_delay: Duration,
    /// Camera names to capture; `None` captures every camera
    pub camera_filter: Option<Vec<String>>,
    pub frames_dir: PathBuf,
    pub credentials_file: PathBuf,
    /// Run a single cycle then stop
    pub once: bool,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_INTERVAL_SECS),
            settle_delay: Duration::from_secs(DEFAULT_SETTLE_DELAY_SECS),
            camera_filter: None,
            frames_dir: PathBuf::from(DEFAULT_FRAMES_DIR),
            credentials_file: PathBuf::from(DEFAULT_CREDENTIALS_FILE),
            once: false,
        }
    }
}
