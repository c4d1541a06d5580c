//! Logging setup for binaries and tests embedding mapsync.
//!
//! The library itself only emits `tracing` events. Call [`init_logging`] once
//! at startup to install a subscriber; keep the returned guard alive for as
//! long as file output should be flushed.

use std::fs;
use std::path::Path;

use time::macros::format_description;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::LocalTime;
use tracing_subscriber::EnvFilter;

use crate::config::LogConfig;

/// Install a global `tracing` subscriber.
///
/// `RUST_LOG` takes priority over `config.filter`. When `config.file` is set,
/// output is appended to that file through a non-blocking writer and the
/// returned guard must be held until shutdown.
///
/// Returns `None` for stderr output. Calling this twice is harmless; the second
/// subscriber is discarded.
pub fn init_logging(config: &LogConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.filter));
    let timer = LocalTime::new(format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]"
    ));

    let Some(path) = config.file.as_ref() else {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_timer(timer)
            .with_writer(std::io::stderr)
            .try_init();
        return None;
    };

    let directory = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    if let Err(e) = fs::create_dir_all(directory) {
        eprintln!("Failed to create log directory {}: {}", directory.display(), e);
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "mapsync.log".into());

    let appender = tracing_appender::rolling::never(directory, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(timer)
        .with_ansi(false)
        .with_writer(writer)
        .try_init();

    Some(guard)
}
