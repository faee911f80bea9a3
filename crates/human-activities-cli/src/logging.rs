use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_LOG_FILE: &str = "./logs/human-activities.log";

/// Filter used when `TRACING_LEVEL` is unset: warnings from dependencies, and
/// our own crates at a level raised by each `-v`.
fn default_filter(verbose: u8) -> String {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    format!("warn,human_activities={level},human_activities_core={level}")
}

/// Splits `LOG_FILE_PATH` into the directory the appender writes to and the
/// file name inside it.
fn log_file_location(path: &Path) -> (PathBuf, PathBuf) {
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let file_name = path
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("human-activities.log"));
    (directory, file_name)
}

/// Logs to stderr, keeping stdout for command output, and to a daily rolled
/// file. Scan workers are named threads, so the file records thread names.
///
/// The returned guard flushes the file writer when dropped.
pub fn init_logger(verbose: u8) -> WorkerGuard {
    let filter = env::var("TRACING_LEVEL").unwrap_or_else(|_| default_filter(verbose));

    let log_file = env::var_os("LOG_FILE_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE));
    let (directory, file_name) = log_file_location(&log_file);
    let (file_writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(&directory, &file_name));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .compact()
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time(),
        )
        .with(
            fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_thread_names(true),
        )
        .with(EnvFilter::new(filter))
        .init();

    debug!("Logging to stderr and {}", log_file.display());

    guard
}
