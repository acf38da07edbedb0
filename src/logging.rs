//! Logging setup.
//!
//! `RUST_LOG` takes precedence over the configured level. File output goes
//! through a non-blocking writer whose guard must live until exit, or
//! buffered lines are lost.

use std::fs::{File, OpenOptions};
use std::io;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Config, LogOutput};

/// Install the global subscriber. Returns the file writer guard, if any.
///
/// A log file that cannot be opened is reported and stdout is used instead.
pub fn init_logging(config: &Config) -> Option<WorkerGuard> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let file = match config.log_output {
        LogOutput::File => Some(open_log_file(config)),
        LogOutput::Stdout => None,
    };

    match file {
        Some(Ok(file)) => {
            let (writer, guard) = tracing_appender::non_blocking(file);
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .try_init()
                .ok();
            Some(guard)
        }
        Some(Err(err)) => {
            init_stdout(env_filter);
            tracing::warn!(
                path = %config.log_file_path.display(),
                error = %err,
                "cannot open log file, logging to stdout"
            );
            None
        }
        None => {
            init_stdout(env_filter);
            None
        }
    }
}

fn open_log_file(config: &Config) -> io::Result<File> {
    if let Some(parent) = config.log_file_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_file_path)
}

fn init_stdout(env_filter: EnvFilter) {
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer())
        .try_init()
        .ok();
}
