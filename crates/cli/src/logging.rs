//! Tracing subscriber setup
//!
//! Logs go to stderr at WARN (DEBUG with `-v`). `GVIEW_LOG` or `RUST_LOG`
//! override the level with full filter directives. `watch` adds a daily-rolling
//! file (in `.gview/logs` unless `--log-dir` is given) written through a
//! non-blocking appender.

use std::path::Path;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber
///
/// The returned guard flushes the file writer on drop; keep it alive for the
/// whole run.
pub fn init(verbose: bool, log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .compact();

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "gview.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(build_filter(verbose, log_dir.is_some()))
        .with(stderr_layer)
        .with(file_layer)
        .init();

    guard
}

fn build_filter(verbose: bool, logging_to_file: bool) -> EnvFilter {
    for var in ["GVIEW_LOG", "RUST_LOG"] {
        if let Ok(directives) = std::env::var(var) {
            if let Ok(filter) = EnvFilter::try_new(&directives) {
                return filter;
            }
        }
    }

    let level = if verbose {
        Level::DEBUG
    } else if logging_to_file {
        Level::INFO
    } else {
        Level::WARN
    };
    EnvFilter::new(level.as_str())
}
