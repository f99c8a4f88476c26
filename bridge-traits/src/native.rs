//! Native Module Contract
//!
//! The single capability the core needs from a host platform: a handle to the
//! native SDK module. Calls are async and may suspend; events are pushed back
//! through listeners registered with [`NativeModule::add_listener`].
//!
//! # Example
//!
//! ```ignore
//! use bridge_traits::native::{NativeModule, NativeEventName};
//! use std::sync::Arc;
//!
//! async fn start(module: Arc<dyn NativeModule>) -> bridge_traits::error::Result<()> {
//!     let subscription = module.add_listener(
//!         NativeEventName::TriggerUpdate,
//!         Arc::new(|event| println!("{}", event.description())),
//!     );
//!     module.start_trigger("req-1", "premium_tapped", None).await?;
//!     subscription.remove();
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::Result;
use crate::events::{NativeEvent, NativeEventName};
use crate::feature::{FeatureAccess, FeatureCheckResult, FeatureUsageResult, ProfileResponse};
use crate::options::ConfigurationOptions;
use crate::purchase::{PurchaseResult, RestoreResult};
use crate::trigger::{JsonObject, TriggerOptions};

/// Callback invoked by the native layer for every event of a subscribed category.
///
/// Handlers run on whatever thread the host delivers events on and must not block.
pub type NativeEventHandler = Arc<dyn Fn(NativeEvent) + Send + Sync>;

/// Live registration of a [`NativeEventHandler`].
pub trait NativeSubscription: Send + Sync {
    /// Detach the handler. Calling `remove` more than once is a no-op.
    fn remove(&self);
}

/// Handle to the platform's native SDK module.
///
/// Implementations convert platform-specific failures into
/// [`BridgeError`](crate::error::BridgeError); a synchronous rejection from the
/// native side surfaces as an `Err` from the corresponding call.
#[async_trait]
pub trait NativeModule: Send + Sync {
    /// Configure the native SDK.
    async fn configure(
        &self,
        api_key: &str,
        options: &ConfigurationOptions,
        use_purchase_controller: bool,
        wrapper_version: &str,
    ) -> Result<()>;

    /// API key baked into the app manifest/plist, if any.
    async fn get_default_api_key(&self) -> Result<Option<String>> {
        Ok(None)
    }

    async fn shutdown(&self) -> Result<()>;

    async fn identify(
        &self,
        distinct_id: &str,
        user_properties: Option<&JsonObject>,
        user_properties_set_once: Option<&JsonObject>,
    ) -> Result<()>;

    async fn reset(&self, keep_anonymous_id: Option<bool>) -> Result<()>;

    async fn get_distinct_id(&self) -> Result<String>;

    async fn get_anonymous_id(&self) -> Result<String>;

    async fn get_is_identified(&self) -> Result<bool>;

    /// Begin evaluating a trigger. Updates for `request_id` arrive later as
    /// [`NativeEvent::TriggerUpdate`] events.
    async fn start_trigger(
        &self,
        request_id: &str,
        event_name: &str,
        options: Option<&TriggerOptions>,
    ) -> Result<()>;

    async fn cancel_trigger(&self, request_id: &str) -> Result<()>;

    async fn show_flow(&self, flow_id: &str) -> Result<()>;

    async fn refresh_profile(&self) -> Result<ProfileResponse>;

    async fn has_feature(
        &self,
        feature_id: &str,
        required_balance: Option<f64>,
        entity_id: Option<&str>,
    ) -> Result<FeatureAccess>;

    async fn get_cached_feature(
        &self,
        feature_id: &str,
        entity_id: Option<&str>,
    ) -> Result<Option<FeatureAccess>>;

    async fn check_feature(
        &self,
        feature_id: &str,
        required_balance: Option<f64>,
        entity_id: Option<&str>,
    ) -> Result<FeatureCheckResult>;

    async fn refresh_feature(
        &self,
        feature_id: &str,
        required_balance: Option<f64>,
        entity_id: Option<&str>,
    ) -> Result<FeatureCheckResult>;

    async fn use_feature(
        &self,
        feature_id: &str,
        amount: Option<f64>,
        entity_id: Option<&str>,
        metadata: Option<&JsonObject>,
    ) -> Result<()>;

    async fn use_feature_and_wait(
        &self,
        feature_id: &str,
        amount: Option<f64>,
        entity_id: Option<&str>,
        set_usage: Option<bool>,
        metadata: Option<&JsonObject>,
    ) -> Result<FeatureUsageResult>;

    async fn flush_events(&self) -> Result<bool>;

    async fn get_queued_event_count(&self) -> Result<u64>;

    async fn pause_event_queue(&self) -> Result<()>;

    async fn resume_event_queue(&self) -> Result<()>;

    /// Report the outcome of a native-originated purchase request.
    async fn complete_purchase(&self, request_id: &str, result: &PurchaseResult) -> Result<()>;

    /// Report the outcome of a native-originated restore request.
    async fn complete_restore(&self, request_id: &str, result: &RestoreResult) -> Result<()>;

    /// Register `handler` for every event of category `event`.
    fn add_listener(
        &self,
        event: NativeEventName,
        handler: NativeEventHandler,
    ) -> Box<dyn NativeSubscription>;
}
