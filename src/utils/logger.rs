//! Logging utilities
//!
//! Process-wide logger setup plus per-harness sinks.

use std::io;
use tracing::{Dispatch, Level};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

/// Log level configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn to_tracing_level(self) -> Level {
        match self {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "trace" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }

    fn filter(self) -> EnvFilter {
        EnvFilter::new(format!("sdk_conformance={}", self.to_tracing_level()))
    }
}

/// Initialize the global logger with specified level
///
/// Does nothing if a global subscriber is already installed.
pub fn init_logger(level: LogLevel) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(level.filter())
        .with_target(false)
        .compact()
        .try_init();
}

/// Build a standalone sink for one harness, writing to stdout
///
/// Scenarios run under this dispatcher instead of the global one, so
/// harnesses in the same process can log at different levels.
pub fn log_sink(level: LogLevel) -> Dispatch {
    build_sink(level, io::stdout, true)
}

/// Like [`log_sink`], writing plain text to `writer`
pub fn log_sink_to<W>(level: LogLevel, writer: W) -> Dispatch
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    build_sink(level, writer, false)
}

fn build_sink<W>(level: LogLevel, writer: W, ansi: bool) -> Dispatch
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(level.filter())
        .with_writer(writer)
        .with_ansi(ansi)
        .with_target(false)
        .compact()
        .finish();
    Dispatch::new(subscriber)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_from_str() {
        assert_eq!(LogLevel::from_str("info"), Some(LogLevel::Info));
        assert_eq!(LogLevel::from_str("DEBUG"), Some(LogLevel::Debug));
        assert_eq!(LogLevel::from_str("warning"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::from_str("unknown"), None);
    }

    #[test]
    fn test_log_sink_respects_level() {
        let sink = log_sink(LogLevel::Warn);
        tracing::dispatcher::with_default(&sink, || {
            assert!(tracing::enabled!(target: "sdk_conformance::runner", Level::WARN));
            assert!(!tracing::enabled!(target: "sdk_conformance::runner", Level::DEBUG));
        });
    }

    #[test]
    fn test_log_sink_to_writer() {
        let logs = crate::sdk::fake::CapturedLogs::new();
        let sink = log_sink_to(LogLevel::Info, logs.clone());
        tracing::dispatcher::with_default(&sink, || {
            tracing::info!(target: "sdk_conformance::executor", "scenario started");
            tracing::debug!(target: "sdk_conformance::executor", "hidden detail");
            tracing::info!(target: "other_crate", "not ours");
        });

        let output = logs.contents();
        assert!(output.contains("scenario started"));
        assert!(!output.contains("hidden detail"));
        assert!(!output.contains("not ours"));
        assert!(!output.contains("\x1b["));
    }
}
