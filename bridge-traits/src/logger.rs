//! Host log forwarding.
//!
//! The bridge logs through `tracing`; a host that wants those records in its
//! own pipeline (OSLog, Logcat, the JS console) registers a [`LoggerSink`] and
//! receives each record as a [`LogEntry`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::error::Result;
use crate::options::NativeLogLevel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Native SDKs name their levels differently; this is the closest match.
impl From<LogLevel> for NativeLogLevel {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => NativeLogLevel::Verbose,
            LogLevel::Debug => NativeLogLevel::Debug,
            LogLevel::Info => NativeLogLevel::Info,
            LogLevel::Warn => NativeLogLevel::Warning,
            LogLevel::Error => NativeLogLevel::Error,
        }
    }
}

/// One forwarded log record.
///
/// Fields are kept sorted so hosts that print them get stable output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub level: LogLevel,
    pub timestamp: DateTime<Utc>,
    /// Module path of the emitting code, e.g. `core_trigger::operation`.
    pub target: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, String>,
    /// Innermost span active when the record was emitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<String>,
}

impl LogEntry {
    pub fn new(level: LogLevel, target: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            timestamp: Utc::now(),
            target: target.into(),
            message: message.into(),
            fields: BTreeMap::new(),
            span: None,
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn with_span(mut self, span: impl Into<String>) -> Self {
        self.span = Some(span.into());
        self
    }

    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// Trigger or purchase correlation id, when the record carries one.
    pub fn request_id(&self) -> Option<&str> {
        self.field("request_id")
    }

    /// `LEVEL target: message key=value ...` on a single line.
    pub fn to_line(&self) -> String {
        let mut line = format!(
            "{} {:<5} {}: {}",
            self.timestamp.format("%H:%M:%S%.3f"),
            self.level.as_str().to_uppercase(),
            self.target,
            self.message
        );
        for (key, value) in &self.fields {
            let _ = write!(line, " {}={}", key, value);
        }
        line
    }
}

/// Receiver for forwarded log records.
///
/// Records arrive already redacted when redaction is enabled in the logging
/// configuration. Implementations should return quickly; delivery happens on
/// the runtime when one is available and inline otherwise.
#[async_trait]
pub trait LoggerSink: Send + Sync {
    async fn log(&self, entry: LogEntry) -> Result<()>;

    /// Records below this level are never built.
    fn min_level(&self) -> LogLevel {
        LogLevel::Info
    }

    fn accepts(&self, level: LogLevel) -> bool {
        level >= self.min_level()
    }
}

/// Writes each record as one line on stderr. Meant for development builds.
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
        if self.accepts(entry.level) {
            eprintln!("{}", entry.to_line());
        }
        Ok(())
    }

    fn min_level(&self) -> LogLevel {
        self.min_level
    }
}
