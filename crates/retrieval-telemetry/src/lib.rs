//! Structured logging setup, shared by `retrieval-worker` and `retrieval-cli`
//!
//! Metrics and crash/error reporting have no counterpart here — the store
//! tables (Execution, DiscoveredFile, ProcessedFile) already serve as this
//! system's audit trail, and there is no desktop process to report crashes
//! from.

use tracing_subscriber::EnvFilter;

/// Output shape for log lines: human-readable for a terminal, JSON for
/// anything that ships logs to a collector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Initializes the global `tracing` subscriber.
///
/// `verbosity` follows the CLI's repeated `-v` convention: 0 is `info`,
/// 1 is `debug`, 2+ is `trace`. `RUST_LOG` overrides it when set.
pub fn init_tracing(verbosity: u8, format: LogFormat) {
    let default_filter = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let subscriber = tracing_subscriber::fmt().with_env_filter(env_filter).with_target(false);

    match format {
        LogFormat::Pretty => subscriber.init(),
        LogFormat::Json => subscriber.json().init(),
    }
}
