//! Time and Logging Abstractions
//!
//! Injectable time source (used for song id generation) and a logging sink
//! that lets the host mirror core logs into its own pipeline.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::Result;

/// Time source trait
///
/// Abstracts system time so id generation can be made deterministic in tests.
pub trait Clock: Send + Sync {
    /// Get current UTC time
    fn now(&self) -> DateTime<Utc>;

    /// Get current Unix timestamp in seconds
    fn unix_timestamp(&self) -> i64 {
        self.now().timestamp()
    }

    /// Get current Unix timestamp in milliseconds
    fn unix_timestamp_millis(&self) -> i64 {
        self.now().timestamp_millis()
    }
}

/// System clock implementation using actual system time
#[derive(Debug, Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive string understood by `tracing-subscriber` filters.
    pub fn as_directive(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Structured log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub timestamp: DateTime<Utc>,
    /// Target module/component
    pub target: String,
    pub message: String,
    /// Structured fields
    pub fields: HashMap<String, String>,
    /// Name of the span the event was emitted in
    pub span_id: Option<String>,
}

impl LogEntry {
    pub fn new(level: LogLevel, target: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            timestamp: Utc::now(),
            target: target.into(),
            message: message.into(),
            fields: HashMap::new(),
            span_id: None,
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn with_span_id(mut self, span_id: impl Into<String>) -> Self {
        self.span_id = Some(span_id.into());
        self
    }
}

/// Logger sink trait
///
/// Forwards structured logs from the core to host logging pipelines
/// (OSLog, Logcat, a desktop console).
///
/// # Example
///
/// ```ignore
/// use bridge_traits::time::{LoggerSink, LogEntry, LogLevel};
///
/// async fn report(logger: &dyn LoggerSink) {
///     let entry = LogEntry::new(LogLevel::Error, "core_library", "bucket write failed")
///         .with_field("genre", "rock");
///     logger.log(entry).await.ok();
/// }
/// ```
#[async_trait]
pub trait LoggerSink: Send + Sync {
    /// Forward a log entry to the host logging system
    async fn log(&self, entry: LogEntry) -> Result<()>;

    /// Flush any buffered logs
    async fn flush(&self) -> Result<()> {
        Ok(())
    }

    /// Get the minimum log level that will be processed
    ///
    /// Logs below this level are filtered out before reaching the sink.
    fn min_level(&self) -> LogLevel {
        LogLevel::Info
    }
}

/// Console logger implementation for development
#[derive(Debug, Clone)]
pub struct ConsoleLogger {
    pub min_level: LogLevel,
}

impl Default for ConsoleLogger {
    fn default() -> Self {
        Self {
            min_level: LogLevel::Info,
        }
    }
}

#[async_trait]
impl LoggerSink for ConsoleLogger {
    async fn log(&self, entry: LogEntry) -> Result<()> {
        if entry.level >= self.min_level {
            println!(
                "[{}] {} {}: {}",
                entry.timestamp.format("%Y-%m-%d %H:%M:%S%.3f"),
                entry.level.as_directive().to_uppercase(),
                entry.target,
                entry.message
            );

            if !entry.fields.is_empty() {
                println!("  Fields: {:?}", entry.fields);
            }
        }
        Ok(())
    }

    fn min_level(&self) -> LogLevel {
        self.min_level
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock() {
        let clock = SystemClock;
        let now = clock.now();
        let timestamp = clock.unix_timestamp();

        assert!(timestamp > 0);
        assert!(now.timestamp() <= timestamp);
        assert!(clock.unix_timestamp_millis() >= timestamp * 1000);
    }

    #[test]
    fn test_log_entry_builder() {
        let entry = LogEntry::new(LogLevel::Info, "core_library", "Saved song")
            .with_field("genre", "rock")
            .with_span_id("save");

        assert_eq!(entry.level, LogLevel::Info);
        assert_eq!(entry.target, "core_library");
        assert_eq!(entry.message, "Saved song");
        assert_eq!(entry.fields.get("genre"), Some(&"rock".to_string()));
        assert_eq!(entry.span_id, Some("save".to_string()));
    }

    #[test]
    fn test_log_level_ordering_and_directive() {
        assert!(LogLevel::Error > LogLevel::Warn);
        assert!(LogLevel::Trace < LogLevel::Debug);
        assert_eq!(LogLevel::Warn.as_directive(), "warn");
    }

    #[tokio::test]
    async fn test_console_logger() {
        let logger = ConsoleLogger::default();
        let entry = LogEntry::new(LogLevel::Info, "test", "Test log");

        logger.log(entry).await.unwrap();
        assert_eq!(logger.min_level(), LogLevel::Info);
    }
}
