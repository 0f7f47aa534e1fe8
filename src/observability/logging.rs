use std::fs;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const LOG_DIR: &str = "logs";
const LOG_FILE_PREFIX: &str = "ro_ingest.log";
const DEFAULT_DIRECTIVE: &str = "ro_ingest=info";

/// Initializes the logging system with both console and file output.
///
/// Console lines are human readable; the daily-rolled file under `logs/`
/// carries the same events as JSON. `RUST_LOG` refines the default filter.
pub fn init_logging() {
    init_logging_with(true)
}

/// Same as [`init_logging`], with the console layer optional so that
/// machine-readable command output is not interleaved with log lines.
pub fn init_logging_with(console: bool) {
    let _ = fs::create_dir_all(LOG_DIR);

    let file_appender = tracing_appender::rolling::daily(LOG_DIR, LOG_FILE_PREFIX);
    let (non_blocking_writer, _guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer().json().with_writer(non_blocking_writer);

    let console_layer = console.then(|| fmt::layer().with_target(false).with_writer(std::io::stderr));

    let filter = match DEFAULT_DIRECTIVE.parse() {
        Ok(directive) => EnvFilter::from_default_env().add_directive(directive),
        Err(_) => EnvFilter::from_default_env(),
    };

    // try_init: a second call (tests, embedding callers) keeps the first subscriber
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer)
        .try_init();

    // Keep the guard alive for the whole process so buffered lines are flushed
    std::mem::forget(_guard);
}
