//! Structured logging for ledger operations.
//!
//! DESIGN PRINCIPLES:
//! - Non-blocking I/O (logging never adds latency to the locked critical section)
//! - JSON format (machine-readable for downstream log aggregation)
//! - Daily rotation (prevents disk exhaustion)

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Configuration for ledger logging.
pub struct LoggingConfig {
    /// Directory for log files.
    pub log_dir: String,
    /// Base filename for logs (will have date appended).
    pub log_prefix: String,
    /// Enable console output (pretty-printed for humans).
    pub console_output: bool,
    /// Log level filter (e.g., "info", "debug", "warn").
    pub level_filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: "logs".to_string(),
            log_prefix: "ledger".to_string(),
            console_output: true,
            level_filter: "info".to_string(),
        }
    }
}

/// Initializes the global tracing subscriber with structured JSON logging.
///
/// Returns a `WorkerGuard` that must be held for the lifetime of the
/// application — dropping it flushes and closes the log file. A subscriber
/// failing to initialize (or its guard being dropped early) never prevents
/// the ledger itself from functioning; logging is not on the correctness
/// path.
///
/// ```text
/// ┌─────────────────┐
/// │  append/lock/    │  info!(), warn!(), error!()
/// │  scan call sites │──────────────┐
/// └──────────────────┘              ▼
///                          ┌─────────────────┐
///                          │  Non-Blocking   │◄── returns immediately
///                          │    Channel      │
///                          └────────┬────────┘
///                                   │ (background thread)
///                                   ▼
///                          ┌─────────────────┐
///                          │  Rolling File   │──► logs/ledger.2026-07-28.log
///                          │    Appender     │
///                          └─────────────────┘
/// ```
pub fn init_tracing(config: LoggingConfig) -> WorkerGuard {
    let file_appender =
        RollingFileAppender::new(Rotation::DAILY, &config.log_dir, &config.log_prefix);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level_filter));

    let json_layer = fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_span_events(FmtSpan::CLOSE)
        .with_current_span(true)
        .with_target(true)
        .with_file(false)
        .with_line_number(false);

    if config.console_output {
        let console_layer = fmt::layer()
            .pretty()
            .with_writer(std::io::stdout)
            .with_target(true);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(json_layer)
            .with(console_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(json_layer)
            .init();
    }

    guard
}

/// Initializes tracing with default configuration.
pub fn init_tracing_default() -> WorkerGuard {
    init_tracing(LoggingConfig::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_points_at_info_level_with_console_on() {
        let config = LoggingConfig::default();
        assert_eq!(config.log_dir, "logs");
        assert_eq!(config.log_prefix, "ledger");
        assert!(config.console_output);
        assert_eq!(config.level_filter, "info");
    }
}
