//! # Host Bridge Traits
//!
//! Contract between the bridge core and the native SDK installed on each platform.
//!
//! ## Overview
//!
//! The native SDK (feature evaluation, journeys, analytics queueing, store
//! plumbing) lives outside this workspace. Each platform binding exposes it to the
//! core as a [`NativeModule`]: async request/response calls plus a push channel of
//! [`NativeEvent`]s registered per [`NativeEventName`].
//!
//! ## Modules
//!
//! - [`native`] - the `NativeModule` trait, event handlers and subscriptions
//! - [`events`] - native event categories and payloads
//! - [`trigger`] - trigger requests and the updates streamed back for them
//! - [`purchase`] - purchase/restore requests and the results that complete them
//! - [`feature`] - feature access and profile snapshots
//! - [`options`] - native configuration fields
//! - [`logger`] - `LoggerSink` for forwarding structured logs to the host
//!
//! ## Error Handling
//!
//! All calls return [`BridgeError`]. Platform implementations should:
//!
//! - Map native rejections to [`BridgeError::Native`] with the host's code
//! - Use [`BridgeError::NotAvailable`] when the module cannot be reached at all
//!
//! ## Thread Safety
//!
//! `NativeModule`, `NativeSubscription` and `LoggerSink` require `Send + Sync`.
//! Event handlers may be invoked from any thread the host delivers events on.

pub mod error;
pub mod events;
pub mod feature;
pub mod logger;
pub mod native;
pub mod options;
pub mod purchase;
pub mod trigger;

pub use error::BridgeError;

// Re-export commonly used types
pub use events::{
    FeatureAccessChangedEvent, FlowDismissedEvent, FlowPresentedEvent, NativeEvent,
    NativeEventName, TriggerUpdateEvent,
};
pub use feature::{
    FeatureAccess, FeatureCheckResult, FeatureType, FeatureUsageResult, FeatureUsageStats,
    ProfileResponse,
};
pub use logger::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
pub use native::{NativeEventHandler, NativeModule, NativeSubscription};
pub use options::{ConfigurationOptions, Environment, EventLinkingPolicy, NativeLogLevel};
pub use purchase::{
    Platform, PurchaseRequest, PurchaseResult, PurchaseSuccess, RestoreRequest, RestoreResult,
};
pub use trigger::{
    EntitlementUpdate, GateSource, JourneyExitReason, JourneyRef, JourneyUpdate, JsonObject,
    SuppressReason, TriggerDecision, TriggerError, TriggerOptions, TriggerUpdate,
};
