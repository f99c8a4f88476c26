//! Integration tests for logging and configure-options

use async_trait::async_trait;
use bridge_traits::error::Result as SinkResult;
use bridge_traits::logger::{LogEntry, LogLevel, LoggerSink};
use bridge_traits::options::Environment;
use core_runtime::config::{ClientSettings, ConfigureOptions, WRAPPER_VERSION};
use core_runtime::logging::{init_logging, redact_if_sensitive, LogFormat, LoggingConfig};
use core_runtime::Error;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct CollectingSink {
    entries: Mutex<Vec<LogEntry>>,
}

#[async_trait]
impl LoggerSink for CollectingSink {
    async fn log(&self, entry: LogEntry) -> SinkResult<()> {
        self.entries.lock().unwrap().push(entry);
        Ok(())
    }

    fn min_level(&self) -> LogLevel {
        LogLevel::Debug
    }
}

#[test]
fn test_global_logging_forwards_redacted_fields_to_sink() {
    // The global subscriber can only be installed once per process
    let sink = Arc::new(CollectingSink::default());
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Debug)
        .with_redaction(true)
        .with_logger_sink(sink.clone());

    init_logging(config).expect("first initialization succeeds");

    tracing::info!(
        target: "core_service",
        api_key = "NX_live_secret",
        request_id = "req-9",
        "Configuring native module"
    );

    let entries = sink.entries.lock().unwrap();
    let entry = entries
        .iter()
        .find(|entry| entry.message == "Configuring native module")
        .expect("event forwarded to sink");
    assert_eq!(entry.level, LogLevel::Info);
    assert_eq!(entry.field("api_key"), Some("[REDACTED]"));
    assert_eq!(entry.request_id(), Some("req-9"));
    drop(entries);

    let second = init_logging(LoggingConfig::default());
    assert!(matches!(second, Err(Error::Config(_))));
}

#[test]
fn test_redaction_of_bridge_fields() {
    assert_eq!(redact_if_sensitive("api_key", "NX_live_123"), "[REDACTED]");
    assert_eq!(redact_if_sensitive("apiKey", "NX_live_123"), "[REDACTED]");
    assert_eq!(redact_if_sensitive("purchase_token", "abc"), "[REDACTED]");
    assert_eq!(redact_if_sensitive("product_id", "pro_monthly"), "pro_monthly");
}

#[test]
fn test_configure_options_end_to_end() {
    let options = ConfigureOptions::builder()
        .api_key("  NX_TEST  ")
        .environment(Environment::Development)
        .request_timeout_seconds(15.0)
        .build()
        .unwrap();

    assert_eq!(options.explicit_api_key(), Some("NX_TEST"));
    let json = serde_json::to_value(&options.configuration).unwrap();
    assert_eq!(json["environment"], "development");
    assert_eq!(json["requestTimeoutSeconds"], 15.0);
    assert!(json.get("apiEndpoint").is_none());
}

#[test]
fn test_client_settings_report_crate_version() {
    let settings = ClientSettings::default();
    assert_eq!(settings.wrapper_version(), WRAPPER_VERSION);
    assert!(!WRAPPER_VERSION.is_empty());
}
