//! Shared utilities

mod logger;

pub use logger::{init_logger, log_sink, log_sink_to, LogLevel};
