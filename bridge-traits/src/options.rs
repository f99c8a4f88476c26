//! Native SDK configuration fields.
//!
//! Forwarded verbatim to `NativeModule::configure`; the bridge never interprets
//! them. Absent fields are omitted so the native SDK applies its own defaults.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Production,
    Staging,
    Development,
    Custom,
}

/// Log level understood by the native SDK (distinct from the bridge's own
/// [`LogLevel`](crate::logger::LogLevel)).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NativeLogLevel {
    Verbose,
    Debug,
    Info,
    Warning,
    Error,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventLinkingPolicy {
    KeepSeparate,
    MigrateOnIdentify,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigurationOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<Environment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<NativeLogLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_console_logging: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_file_logging: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redact_sensitive_data: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout_seconds: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_delay_seconds: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync_interval_seconds: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_compression: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_batch_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flush_at: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flush_interval_seconds: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_queue_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_cache_size_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_expiration_seconds: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_encryption: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_storage_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature_cache_ttl_seconds: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_paywall_timeout_seconds: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub respect_do_not_track: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_linking_policy: Option<EventLinkingPolicy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale_identifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_debug_mode: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_plugins: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_flow_cache_size_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flow_cache_expiration_seconds: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_concurrent_flow_downloads: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flow_download_timeout_seconds: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flow_cache_directory: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_only_present_fields_serialized() {
        let options = ConfigurationOptions {
            environment: Some(Environment::Staging),
            flush_at: Some(5),
            event_linking_policy: Some(EventLinkingPolicy::MigrateOnIdentify),
            ..Default::default()
        };

        assert_eq!(
            serde_json::to_value(&options).unwrap(),
            json!({
                "environment": "staging",
                "flushAt": 5,
                "eventLinkingPolicy": "migrate_on_identify"
            })
        );
    }

    #[test]
    fn test_default_is_empty_object() {
        assert_eq!(
            serde_json::to_value(ConfigurationOptions::default()).unwrap(),
            json!({})
        );
    }
}
