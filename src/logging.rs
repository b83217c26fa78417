//! Sets up structured logging for the command line tools.

use std::{fs::OpenOptions, io, path::Path, sync::Arc};

use tracing_subscriber::{
    EnvFilter, Layer, filter, layer::SubscriberExt, util::SubscriberInitExt,
};

/// Where the debug log is written when no other path is given.
pub const DEFAULT_LOG_PATH: &str = "debug.log";

/// Install the global tracing subscriber.
///
/// Logs at the `info` level and above are pretty printed to stdout, and logs
/// at the `debug` level and above are appended to the file at `log_path`.
/// The `RUST_LOG` environment variable, when set, further restricts what is
/// logged.
///
/// # Errors
/// Returns an error if the log file could not be opened.
pub fn setup_logging(log_path: &Path) -> Result<(), io::Error> {
    let stdout_log = tracing_subscriber::fmt::layer().pretty();

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)?;

    let debug_log = tracing_subscriber::fmt::layer()
        .pretty()
        .with_ansi(false)
        .with_writer(Arc::new(log_file));

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            stdout_log
                .with_filter(filter::LevelFilter::INFO)
                .and_then(debug_log)
                .with_filter(filter::LevelFilter::DEBUG),
        )
        .init();

    Ok(())
}
