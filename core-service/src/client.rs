//! # Nuxie Client
//!
//! Public façade over the native SDK module.
//!
//! ## Overview
//!
//! [`NuxieClient`] resolves the native module lazily, owns the live trigger
//! registry, the purchase controller slot and the event router, and exposes:
//!
//! - `configure` / `shutdown`
//! - `trigger` / `trigger_once`
//! - `set_purchase_controller`
//! - `on` listeners and a `subscribe` stream
//! - identity, feature and event-queue pass-throughs
//!
//! ## Usage
//!
//! ```ignore
//! use core_service::{fixed_module, NuxieClient};
//! use core_runtime::config::ConfigureOptions;
//!
//! let client = NuxieClient::new(fixed_module(native));
//! client.configure(ConfigureOptions::with_api_key("NX_live_123")).await?;
//!
//! let terminal = client.trigger_once("premium_tapped", None).await;
//! if let Some(error) = terminal.error() {
//!     tracing::warn!(code = %error.code, "Trigger ended with an error");
//! }
//! ```

use crate::error::{ClientError, Result};
use crate::options::{FeatureQuery, FeatureUsage, IdentifyOptions};
use crate::resolver::{ModuleResolver, ModuleSlot};
use crate::router::EventRouter;
use async_trait::async_trait;
use bridge_traits::error::BridgeError;
use bridge_traits::events::{NativeEvent, NativeEventName};
use bridge_traits::feature::{FeatureAccess, FeatureCheckResult, FeatureUsageResult, ProfileResponse};
use bridge_traits::native::NativeModule;
use bridge_traits::trigger::TriggerOptions;
use core_purchase::{PurchaseBridge, PurchaseController};
use core_runtime::config::{ClientSettings, ConfigureOptions};
use core_runtime::events::{EventBus, EventKind, EventStream, ListenerHandle, ListenerRegistry};
use core_runtime::logging::redact_if_sensitive;
use core_trigger::{
    StartGate, TerminalUpdate, TriggerBackend, TriggerManager, TriggerOperation, TriggerRegistry,
    TriggerRequest,
};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{debug, info, instrument, warn};

/// Module resolution plus subscription management, shared with the trigger
/// backend.
struct NativeLink {
    modules: ModuleSlot,
    router: EventRouter,
}

impl NativeLink {
    async fn module(&self) -> Result<Arc<dyn NativeModule>> {
        self.modules
            .get()
            .await
            .map_err(|err| ClientError::ModuleUnavailable(err.message()))
    }

    async fn ensure_subscription(&self, name: NativeEventName) -> Result<()> {
        let module = self.module().await?;
        self.router.ensure_subscription(&module, name).await
    }

    /// Create subscriptions in the background; failures are logged.
    fn ensure_in_background(self: &Arc<Self>, names: &[NativeEventName]) {
        let Ok(runtime) = Handle::try_current() else {
            debug!("No runtime, native subscriptions deferred to configure");
            return;
        };
        for &name in names {
            let link = Arc::clone(self);
            runtime.spawn(async move {
                if let Err(err) = link.ensure_subscription(name).await {
                    warn!(event = %name, error = %err, "Failed to create native subscription");
                }
            });
        }
    }
}

fn to_bridge_error(err: ClientError) -> BridgeError {
    match err {
        ClientError::Bridge(err) => err,
        other => BridgeError::OperationFailed(other.to_string()),
    }
}

#[async_trait]
impl TriggerBackend for NativeLink {
    async fn prepare(&self, gate: &StartGate) -> std::result::Result<(), BridgeError> {
        let module = self.module().await.map_err(to_bridge_error)?;
        self.router
            .ensure_subscription_when(&module, NativeEventName::TriggerUpdate, || gate.is_open())
            .await
            .map_err(to_bridge_error)
    }

    async fn start(&self, request: TriggerRequest) -> std::result::Result<(), BridgeError> {
        let module = self.module().await.map_err(to_bridge_error)?;
        module
            .start_trigger(
                &request.request_id,
                &request.event_name,
                request.options.as_ref(),
            )
            .await
    }

    async fn cancel(&self, request_id: &str) -> std::result::Result<(), BridgeError> {
        let module = self.module().await.map_err(to_bridge_error)?;
        module.cancel_trigger(request_id).await
    }
}

/// Resets a flag when dropped, including when the owning future is dropped.
struct FlagGuard<'a>(&'a AtomicBool);

impl<'a> FlagGuard<'a> {
    fn raise(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for FlagGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

struct ClientInner {
    settings: ClientSettings,
    link: Arc<NativeLink>,
    triggers: TriggerManager,
    purchases: Arc<PurchaseBridge>,
    configured: AtomicBool,
    configuring: AtomicBool,
}

/// Client façade. Cheap to clone; clones share all state.
#[derive(Clone)]
pub struct NuxieClient {
    inner: Arc<ClientInner>,
}

impl NuxieClient {
    pub fn new(resolver: Arc<dyn ModuleResolver>) -> Self {
        Self::with_settings(resolver, ClientSettings::default())
    }

    pub fn with_settings(resolver: Arc<dyn ModuleResolver>, settings: ClientSettings) -> Self {
        let registry = TriggerRegistry::new();
        let purchases = Arc::new(PurchaseBridge::new());
        let router = EventRouter::new(
            registry.clone(),
            Arc::clone(&purchases),
            ListenerRegistry::new(),
            EventBus::new(settings.event_buffer_size()),
        );
        let link = Arc::new(NativeLink {
            modules: ModuleSlot::new(resolver),
            router,
        });
        let backend: Arc<dyn TriggerBackend> = link.clone();
        let triggers = TriggerManager::new(registry, backend);

        Self {
            inner: Arc::new(ClientInner {
                settings,
                link,
                triggers,
                purchases,
                configured: AtomicBool::new(false),
                configuring: AtomicBool::new(false),
            }),
        }
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.inner.settings
    }

    pub fn is_configured(&self) -> bool {
        self.inner.configured.load(Ordering::SeqCst)
    }

    pub fn is_configuring(&self) -> bool {
        self.inner.configuring.load(Ordering::SeqCst)
    }

    pub fn is_module_resolved(&self) -> bool {
        self.inner.link.modules.is_resolved()
    }

    async fn module(&self) -> Result<Arc<dyn NativeModule>> {
        self.inner.link.module().await
    }

    /// Configure the native SDK.
    ///
    /// The explicit API key wins when non-blank; otherwise the native default
    /// key is used. Fails with [`ClientError::MissingApiKey`] when neither
    /// yields a key, without calling native `configure`.
    #[instrument(skip_all, fields(use_purchase_controller = tracing::field::Empty))]
    pub async fn configure(&self, options: ConfigureOptions) -> Result<()> {
        let _configuring = FlagGuard::raise(&self.inner.configuring);

        let module = self.module().await?;
        let api_key = match options.explicit_api_key() {
            Some(key) => key.to_string(),
            None => default_api_key(module.as_ref())
                .await
                .ok_or(ClientError::MissingApiKey)?,
        };

        let use_purchase_controller =
            options.use_purchase_controller || self.inner.purchases.has_controller();
        tracing::Span::current().record("use_purchase_controller", use_purchase_controller);
        info!(
            api_key = %redact_if_sensitive("api_key", &api_key),
            wrapper_version = %self.inner.settings.wrapper_version(),
            "Configuring native SDK"
        );

        module
            .configure(
                &api_key,
                &options.configuration,
                use_purchase_controller,
                self.inner.settings.wrapper_version(),
            )
            .await?;

        let router = &self.inner.link.router;
        router
            .ensure_subscription(&module, NativeEventName::TriggerUpdate)
            .await?;
        router
            .ensure_subscription(&module, NativeEventName::FeatureAccessChanged)
            .await?;
        if use_purchase_controller {
            router
                .ensure_subscription(&module, NativeEventName::PurchaseRequest)
                .await?;
            router
                .ensure_subscription(&module, NativeEventName::RestoreRequest)
                .await?;
        }

        self.inner.configured.store(true, Ordering::SeqCst);
        info!("Native SDK configured");
        Ok(())
    }

    /// Shut the native SDK down and release local state.
    ///
    /// Local teardown always runs: subscriptions are removed and every pending
    /// trigger finishes with `trigger_cancelled`. A native shutdown error is
    /// returned afterwards.
    #[instrument(skip(self))]
    pub async fn shutdown(&self) -> Result<()> {
        let module = self.module().await?;
        let native_result = module.shutdown().await;

        self.inner.configured.store(false, Ordering::SeqCst);
        self.inner.configuring.store(false, Ordering::SeqCst);
        // Cancel first so a trigger still preparing cannot subscribe again
        let cancelled = self.inner.triggers.registry().cancel_all();
        let removed = self.inner.link.router.remove_all().await;
        info!(
            subscriptions = removed,
            cancelled_triggers = cancelled,
            "Client shut down"
        );

        native_result.map_err(ClientError::from)
    }

    // ------------------------------------------------------------------
    // Triggers
    // ------------------------------------------------------------------

    /// Start a trigger. Returns immediately; see [`TriggerOperation`].
    pub fn trigger(
        &self,
        event_name: impl Into<String>,
        options: Option<TriggerOptions>,
    ) -> TriggerOperation {
        self.inner.triggers.start(event_name, options)
    }

    /// Start a trigger and wait for its terminal update.
    pub async fn trigger_once(
        &self,
        event_name: impl Into<String>,
        options: Option<TriggerOptions>,
    ) -> TerminalUpdate {
        self.inner.triggers.trigger_once(event_name, options).await
    }

    /// Number of triggers still waiting for a terminal update.
    pub fn active_trigger_count(&self) -> usize {
        self.inner.triggers.registry().len()
    }

    // ------------------------------------------------------------------
    // Purchases
    // ------------------------------------------------------------------

    /// Install (or clear with `None`) the controller that answers native
    /// purchase and restore requests.
    pub fn set_purchase_controller(&self, controller: Option<Arc<dyn PurchaseController>>) {
        let installed = controller.is_some();
        self.inner.purchases.set_controller(controller);
        if installed {
            self.inner.link.ensure_in_background(&[
                NativeEventName::PurchaseRequest,
                NativeEventName::RestoreRequest,
            ]);
        }
    }

    pub fn has_purchase_controller(&self) -> bool {
        self.inner.purchases.has_controller()
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    /// Listen to every event of one category.
    ///
    /// The native subscription for the category is created in the background.
    /// Listeners run on the thread the native layer delivers on and must not
    /// block.
    pub fn on<F>(&self, kind: EventKind, listener: F) -> ListenerHandle
    where
        F: Fn(&NativeEvent) + Send + Sync + 'static,
    {
        let handle = self
            .inner
            .link
            .router
            .listeners()
            .add(kind, Arc::new(listener));
        self.inner.link.ensure_in_background(&[kind.native_name()]);
        handle
    }

    /// Stream of every routed native event.
    ///
    /// Does not create native subscriptions by itself; `configure`, `on` and
    /// `set_purchase_controller` do.
    pub fn subscribe(&self) -> EventStream {
        EventStream::new(self.inner.link.router.bus().subscribe())
    }

    // ------------------------------------------------------------------
    // Identity
    // ------------------------------------------------------------------

    pub async fn identify(&self, distinct_id: &str, options: IdentifyOptions) -> Result<()> {
        let module = self.module().await?;
        debug!(
            distinct_id = %redact_if_sensitive("distinct_id", distinct_id),
            "Identifying user"
        );
        module
            .identify(
                distinct_id,
                options.user_properties.as_ref(),
                options.user_properties_set_once.as_ref(),
            )
            .await?;
        Ok(())
    }

    pub async fn reset(&self, keep_anonymous_id: Option<bool>) -> Result<()> {
        let module = self.module().await?;
        module.reset(keep_anonymous_id).await?;
        Ok(())
    }

    pub async fn distinct_id(&self) -> Result<String> {
        let module = self.module().await?;
        Ok(module.get_distinct_id().await?)
    }

    pub async fn anonymous_id(&self) -> Result<String> {
        let module = self.module().await?;
        Ok(module.get_anonymous_id().await?)
    }

    pub async fn is_identified(&self) -> Result<bool> {
        let module = self.module().await?;
        Ok(module.get_is_identified().await?)
    }

    // ------------------------------------------------------------------
    // Flows, profile and features
    // ------------------------------------------------------------------

    pub async fn show_flow(&self, flow_id: &str) -> Result<()> {
        let module = self.module().await?;
        module.show_flow(flow_id).await?;
        Ok(())
    }

    pub async fn refresh_profile(&self) -> Result<ProfileResponse> {
        let module = self.module().await?;
        Ok(module.refresh_profile().await?)
    }

    pub async fn has_feature(&self, feature_id: &str, query: FeatureQuery) -> Result<FeatureAccess> {
        let module = self.module().await?;
        Ok(module
            .has_feature(feature_id, query.required_balance, query.entity_id.as_deref())
            .await?)
    }

    pub async fn cached_feature(
        &self,
        feature_id: &str,
        entity_id: Option<&str>,
    ) -> Result<Option<FeatureAccess>> {
        let module = self.module().await?;
        Ok(module.get_cached_feature(feature_id, entity_id).await?)
    }

    pub async fn check_feature(
        &self,
        feature_id: &str,
        query: FeatureQuery,
    ) -> Result<FeatureCheckResult> {
        let module = self.module().await?;
        Ok(module
            .check_feature(feature_id, query.required_balance, query.entity_id.as_deref())
            .await?)
    }

    pub async fn refresh_feature(
        &self,
        feature_id: &str,
        query: FeatureQuery,
    ) -> Result<FeatureCheckResult> {
        let module = self.module().await?;
        Ok(module
            .refresh_feature(feature_id, query.required_balance, query.entity_id.as_deref())
            .await?)
    }

    pub async fn use_feature(&self, feature_id: &str, usage: FeatureUsage) -> Result<()> {
        let module = self.module().await?;
        module
            .use_feature(
                feature_id,
                usage.amount,
                usage.entity_id.as_deref(),
                usage.metadata.as_ref(),
            )
            .await?;
        Ok(())
    }

    pub async fn use_feature_and_wait(
        &self,
        feature_id: &str,
        usage: FeatureUsage,
    ) -> Result<FeatureUsageResult> {
        let module = self.module().await?;
        Ok(module
            .use_feature_and_wait(
                feature_id,
                usage.amount,
                usage.entity_id.as_deref(),
                usage.set_usage,
                usage.metadata.as_ref(),
            )
            .await?)
    }

    // ------------------------------------------------------------------
    // Event queue
    // ------------------------------------------------------------------

    pub async fn flush_events(&self) -> Result<bool> {
        let module = self.module().await?;
        Ok(module.flush_events().await?)
    }

    pub async fn queued_event_count(&self) -> Result<u64> {
        let module = self.module().await?;
        Ok(module.get_queued_event_count().await?)
    }

    pub async fn pause_event_queue(&self) -> Result<()> {
        let module = self.module().await?;
        module.pause_event_queue().await?;
        Ok(())
    }

    pub async fn resume_event_queue(&self) -> Result<()> {
        let module = self.module().await?;
        module.resume_event_queue().await?;
        Ok(())
    }
}

impl fmt::Debug for NuxieClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NuxieClient")
            .field("configured", &self.is_configured())
            .field("configuring", &self.is_configuring())
            .field("active_triggers", &self.active_trigger_count())
            .field("has_purchase_controller", &self.has_purchase_controller())
            .field("router", &self.inner.link.router)
            .finish()
    }
}

/// The native default API key, trimmed. A failing lookup counts as no key.
async fn default_api_key(module: &dyn NativeModule) -> Option<String> {
    match module.get_default_api_key().await {
        Ok(key) => key
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty()),
        Err(err) => {
            warn!(error = %err, "Default API key lookup failed");
            None
        }
    }
}
