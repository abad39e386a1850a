//! Tracing subscriber setup.
//!
//! Filter comes from `PONTS_LOG` (falls back to `warn`). Interactive mode
//! logs to a daily file under `$PONTS_HOME/logs` so nothing is written over
//! the alternate screen; exec mode logs to stderr.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Env var holding the log filter directive.
pub const LOG_ENV: &str = "PONTS_LOG";

const DEFAULT_LEVEL: &str = "warn";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(DEFAULT_LEVEL))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LEVEL))
}

/// Installs a subscriber writing to stderr.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_stderr() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Installs a subscriber writing to `dir/ponts.log.<date>`.
///
/// The returned guard flushes buffered lines on drop and must be held for
/// the lifetime of the program.
pub fn init_file(dir: &Path) -> Option<WorkerGuard> {
    if let Err(err) = std::fs::create_dir_all(dir) {
        eprintln!("Warning: cannot create log dir {}: {err}", dir.display());
        return None;
    }
    let appender = tracing_appender::rolling::daily(dir, "ponts.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .ok()
        .map(|()| guard)
}
