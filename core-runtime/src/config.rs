//! # Client Configuration
//!
//! Builder for the options passed to `NuxieClient::configure`, plus the settings
//! the client itself runs with.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::ConfigureOptions;
//! use bridge_traits::options::Environment;
//!
//! let options = ConfigureOptions::builder()
//!     .api_key("NX_live_123")
//!     .environment(Environment::Staging)
//!     .flush_at(5u32)
//!     .use_purchase_controller(true)
//!     .build()
//!     .expect("valid options");
//! ```
//!
//! ## Validation
//!
//! `build()` fails fast with [`Error::Config`] on values the native SDK would
//! reject anyway (zero batch sizes, non-positive timeouts, blank endpoints). The
//! API key is not required here: when it is absent, `configure` falls back to the
//! key baked into the app by the host platform.

use crate::error::{Error, Result};
use bridge_traits::options::{
    ConfigurationOptions, Environment, EventLinkingPolicy, NativeLogLevel,
};
use std::fmt;

/// Version reported to the native SDK as the wrapper version.
pub const WRAPPER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default buffer size of the client's broadcast event bus.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

/// Options accepted by `configure`.
#[derive(Clone, Default, PartialEq)]
pub struct ConfigureOptions {
    /// Explicit API key; blank or absent falls back to the native default key
    pub api_key: Option<String>,
    /// Ask the native SDK to route purchases through the host's controller
    pub use_purchase_controller: bool,
    /// Native configuration fields, forwarded unchanged
    pub configuration: ConfigurationOptions,
}

impl ConfigureOptions {
    pub fn builder() -> ConfigureOptionsBuilder {
        ConfigureOptionsBuilder::default()
    }

    /// Shorthand for options carrying only an API key.
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            ..Default::default()
        }
    }

    /// The explicit API key, trimmed, if it is non-empty.
    pub fn explicit_api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }
}

impl fmt::Debug for ConfigureOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigureOptions")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("use_purchase_controller", &self.use_purchase_controller)
            .field("configuration", &self.configuration)
            .finish()
    }
}

macro_rules! configuration_setters {
    ($($field:ident: $ty:ty),* $(,)?) => {
        $(
            pub fn $field(mut self, value: impl Into<$ty>) -> Self {
                self.options.configuration.$field = Some(value.into());
                self
            }
        )*
    };
}

/// Builder for [`ConfigureOptions`].
#[derive(Debug, Default)]
pub struct ConfigureOptionsBuilder {
    options: ConfigureOptions,
}

impl ConfigureOptionsBuilder {
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.options.api_key = Some(api_key.into());
        self
    }

    pub fn use_purchase_controller(mut self, enabled: bool) -> Self {
        self.options.use_purchase_controller = enabled;
        self
    }

    /// Replace all native configuration fields at once.
    pub fn configuration(mut self, configuration: ConfigurationOptions) -> Self {
        self.options.configuration = configuration;
        self
    }

    configuration_setters! {
        environment: Environment,
        api_endpoint: String,
        log_level: NativeLogLevel,
        enable_console_logging: bool,
        enable_file_logging: bool,
        redact_sensitive_data: bool,
        request_timeout_seconds: f64,
        retry_count: u32,
        retry_delay_seconds: f64,
        sync_interval_seconds: f64,
        enable_compression: bool,
        event_batch_size: u32,
        flush_at: u32,
        flush_interval_seconds: f64,
        max_queue_size: u32,
        max_cache_size_bytes: u64,
        cache_expiration_seconds: f64,
        enable_encryption: bool,
        custom_storage_path: String,
        feature_cache_ttl_seconds: f64,
        default_paywall_timeout_seconds: f64,
        respect_do_not_track: bool,
        event_linking_policy: EventLinkingPolicy,
        locale_identifier: String,
        is_debug_mode: bool,
        enable_plugins: bool,
        max_flow_cache_size_bytes: u64,
        flow_cache_expiration_seconds: f64,
        max_concurrent_flow_downloads: u32,
        flow_download_timeout_seconds: f64,
        flow_cache_directory: String,
    }

    /// Validate and build the options.
    pub fn build(self) -> Result<ConfigureOptions> {
        validate(&self.options.configuration)?;
        Ok(self.options)
    }
}

fn validate(config: &ConfigurationOptions) -> Result<()> {
    if let Some(endpoint) = &config.api_endpoint {
        if endpoint.trim().is_empty() {
            return Err(Error::Config("api_endpoint must not be blank".to_string()));
        }
    }

    let counts = [
        ("event_batch_size", config.event_batch_size),
        ("flush_at", config.flush_at),
        ("max_queue_size", config.max_queue_size),
        (
            "max_concurrent_flow_downloads",
            config.max_concurrent_flow_downloads,
        ),
    ];
    for (name, value) in counts {
        if value == Some(0) {
            return Err(Error::Config(format!("{} must be greater than zero", name)));
        }
    }

    let positive_durations = [
        ("request_timeout_seconds", config.request_timeout_seconds),
        ("sync_interval_seconds", config.sync_interval_seconds),
        ("flush_interval_seconds", config.flush_interval_seconds),
        ("cache_expiration_seconds", config.cache_expiration_seconds),
        ("feature_cache_ttl_seconds", config.feature_cache_ttl_seconds),
        (
            "default_paywall_timeout_seconds",
            config.default_paywall_timeout_seconds,
        ),
        (
            "flow_cache_expiration_seconds",
            config.flow_cache_expiration_seconds,
        ),
        (
            "flow_download_timeout_seconds",
            config.flow_download_timeout_seconds,
        ),
    ];
    for (name, value) in positive_durations {
        if let Some(seconds) = value {
            if !seconds.is_finite() || seconds <= 0.0 {
                return Err(Error::Config(format!(
                    "{} must be a positive number of seconds, got {}",
                    name, seconds
                )));
            }
        }
    }

    if let Some(delay) = config.retry_delay_seconds {
        if !delay.is_finite() || delay < 0.0 {
            return Err(Error::Config(format!(
                "retry_delay_seconds must not be negative, got {}",
                delay
            )));
        }
    }

    Ok(())
}

/// Settings of the client façade itself (not forwarded to the native SDK).
///
/// Fields are only set through the validating builders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    wrapper_version: String,
    event_buffer_size: usize,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            wrapper_version: WRAPPER_VERSION.to_string(),
            event_buffer_size: DEFAULT_EVENT_BUFFER_SIZE,
        }
    }
}

impl ClientSettings {
    /// Wrapper version reported on `configure`.
    pub fn wrapper_version(&self) -> &str {
        &self.wrapper_version
    }

    /// Capacity of the broadcast event bus. Never zero.
    pub fn event_buffer_size(&self) -> usize {
        self.event_buffer_size
    }

    pub fn with_wrapper_version(mut self, version: impl Into<String>) -> Result<Self> {
        let version = version.into();
        if version.trim().is_empty() {
            return Err(Error::Config("wrapper_version must not be blank".to_string()));
        }
        self.wrapper_version = version;
        Ok(self)
    }

    pub fn with_event_buffer_size(mut self, size: usize) -> Result<Self> {
        if size == 0 {
            return Err(Error::Config(
                "event_buffer_size must be greater than zero".to_string(),
            ));
        }
        self.event_buffer_size = size;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_sets_native_fields() {
        let options = ConfigureOptions::builder()
            .api_key("NX_TEST")
            .environment(Environment::Staging)
            .flush_at(5u32)
            .use_purchase_controller(true)
            .build()
            .unwrap();

        assert_eq!(options.api_key.as_deref(), Some("NX_TEST"));
        assert!(options.use_purchase_controller);
        assert_eq!(options.configuration.environment, Some(Environment::Staging));
        assert_eq!(options.configuration.flush_at, Some(5));
        assert!(options.configuration.api_endpoint.is_none());
    }

    #[test]
    fn test_explicit_api_key_trims_and_ignores_blank() {
        assert_eq!(
            ConfigureOptions::with_api_key("  NX_TEST ").explicit_api_key(),
            Some("NX_TEST")
        );
        assert_eq!(ConfigureOptions::with_api_key("   ").explicit_api_key(), None);
        assert_eq!(ConfigureOptions::default().explicit_api_key(), None);
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let result = ConfigureOptions::builder().event_batch_size(0u32).build();
        match result {
            Err(Error::Config(message)) => assert!(message.contains("event_batch_size")),
            other => panic!("expected config error, got {:?}", other),
        }
    }

    #[test]
    fn test_non_positive_timeout_rejected() {
        assert!(ConfigureOptions::builder()
            .request_timeout_seconds(0.0)
            .build()
            .is_err());
        assert!(ConfigureOptions::builder()
            .flow_download_timeout_seconds(f64::NAN)
            .build()
            .is_err());
        assert!(ConfigureOptions::builder()
            .retry_delay_seconds(0.0)
            .build()
            .is_ok());
    }

    #[test]
    fn test_blank_endpoint_rejected() {
        assert!(ConfigureOptions::builder().api_endpoint(" ").build().is_err());
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let options = ConfigureOptions::with_api_key("NX_secret");
        let rendered = format!("{:?}", options);
        assert!(!rendered.contains("NX_secret"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn test_client_settings_defaults() {
        let settings = ClientSettings::default();
        assert_eq!(settings.wrapper_version(), WRAPPER_VERSION);
        assert_eq!(settings.event_buffer_size(), DEFAULT_EVENT_BUFFER_SIZE);
    }

    #[test]
    fn test_client_settings_reject_invalid_values() {
        let err = ClientSettings::default().with_event_buffer_size(0).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(ClientSettings::default().with_wrapper_version("  ").is_err());

        let settings = ClientSettings::default()
            .with_event_buffer_size(8)
            .and_then(|settings| settings.with_wrapper_version("2.0.0-rn"))
            .unwrap();
        assert_eq!(settings.event_buffer_size(), 8);
        assert_eq!(settings.wrapper_version(), "2.0.0-rn");
    }
}
