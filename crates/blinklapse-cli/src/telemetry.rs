use std::io;
use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Log file name prefix inside `--log-dir`; the appender adds the date
const LOG_FILE_PREFIX: &str = "blink-lapse.log";

#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    /// Raise this program and its Blink client to debug
    pub verbose: bool,
    pub log_dir: Option<PathBuf>,
}

/// Debug level for this program and its Blink client
const VERBOSE_DIRECTIVES: &str = "blink_lapse=debug,blinklapse_core=debug";

impl LogConfig {
    /// Filter directives: `RUST_LOG` (or `info`), with `--verbose` layered
    /// on top. Later directives for the same target win.
    fn directives(&self, rust_log: Option<&str>) -> String {
        let base = rust_log
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or("info");
        if self.verbose {
            format!("{},{}", base, VERBOSE_DIRECTIVES)
        } else {
            base.to_string()
        }
    }
}

/// Initialize the tracing subscriber for logging.
///
/// The returned guard flushes the log file on drop and must be held for the
/// life of the program.
pub fn init_tracing(config: &LogConfig) -> Option<WorkerGuard> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = EnvFilter::try_new(config.directives(rust_log.as_deref()))
        .unwrap_or_else(|_| EnvFilter::new(config.directives(None)));

    let (file_layer, guard) = match config.log_dir {
        Some(ref dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}
