//! Trigger handles returned to callers.

use crate::backend::{StartGate, TriggerBackend, TriggerRequest};
use crate::id::generate_request_id;
use crate::registry::TriggerRegistry;
use crate::state::{Delivery, OperationState, UpdateListener};
use crate::update::TerminalUpdate;
use bridge_traits::trigger::{TriggerOptions, TriggerUpdate};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};
use tokio::runtime::Handle;
use tracing::{debug, instrument, warn};

/// Starts trigger operations against one backend and one registry.
#[derive(Clone)]
pub struct TriggerManager {
    registry: TriggerRegistry,
    backend: Arc<dyn TriggerBackend>,
}

impl TriggerManager {
    pub fn new(registry: TriggerRegistry, backend: Arc<dyn TriggerBackend>) -> Self {
        Self { registry, backend }
    }

    pub fn registry(&self) -> &TriggerRegistry {
        &self.registry
    }

    /// Register a new operation and start it in the background.
    ///
    /// Returns before any native round trip. The native start runs on the
    /// current Tokio runtime; outside one, the operation ends immediately with
    /// `trigger_start_failed`.
    pub fn start(
        &self,
        event_name: impl Into<String>,
        options: Option<TriggerOptions>,
    ) -> TriggerOperation {
        let request = TriggerRequest {
            request_id: generate_request_id(),
            event_name: event_name.into(),
            options,
        };
        let (state, rx) = OperationState::new(request.request_id.clone());
        self.registry.insert(Arc::clone(&state));

        let done = TriggerDone {
            inner: rx
                .map(|result| result.unwrap_or_else(|_| TerminalUpdate::cancelled()))
                .boxed()
                .shared(),
        };
        let operation = TriggerOperation {
            state: Arc::clone(&state),
            registry: self.registry.clone(),
            backend: Arc::clone(&self.backend),
            done,
        };

        debug!(
            request_id = %request.request_id,
            event = %request.event_name,
            "Starting trigger"
        );

        match Handle::try_current() {
            Ok(handle) => {
                let backend = Arc::clone(&self.backend);
                let registry = self.registry.clone();
                handle.spawn(run_start(backend, registry, state, request));
            }
            Err(err) => {
                fail_start(&self.registry, &state, err.to_string());
            }
        }

        operation
    }

    /// Start a trigger and wait for its terminal update.
    pub async fn trigger_once(
        &self,
        event_name: impl Into<String>,
        options: Option<TriggerOptions>,
    ) -> TerminalUpdate {
        self.start(event_name, options).done().await
    }
}

impl fmt::Debug for TriggerManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TriggerManager")
            .field("registry", &self.registry)
            .finish()
    }
}

async fn run_start(
    backend: Arc<dyn TriggerBackend>,
    registry: TriggerRegistry,
    state: Arc<OperationState>,
    request: TriggerRequest,
) {
    let gate = StartGate::new(Arc::clone(&state));
    if !gate.is_open() {
        debug!(request_id = %request.request_id, "Trigger ended before native start");
        return;
    }

    if let Err(err) = backend.prepare(&gate).await {
        fail_start(&registry, &state, err.message());
        return;
    }
    if !gate.is_open() {
        debug!(request_id = %request.request_id, "Trigger ended before native start");
        return;
    }

    if let Err(err) = backend.start(request).await {
        fail_start(&registry, &state, err.message());
    }
}

fn fail_start(registry: &TriggerRegistry, state: &OperationState, message: String) {
    warn!(request_id = %state.request_id(), error = %message, "Trigger start failed");
    if state.deliver_local(TerminalUpdate::start_failed(message)) == Delivery::Finished {
        registry.remove(state.request_id());
    }
}

/// Handle to one outstanding trigger.
///
/// Clones refer to the same operation. Dropping every handle does not cancel
/// the trigger; it keeps running until a terminal update arrives.
#[derive(Clone)]
pub struct TriggerOperation {
    state: Arc<OperationState>,
    registry: TriggerRegistry,
    backend: Arc<dyn TriggerBackend>,
    done: TriggerDone,
}

impl TriggerOperation {
    pub fn request_id(&self) -> &str {
        self.state.request_id()
    }

    pub fn is_finished(&self) -> bool {
        self.state.is_finished()
    }

    /// Observe every update from now on. Past updates are not replayed, and
    /// a listener attached after the operation finished is never called.
    pub fn on_update<F>(&self, listener: F) -> UpdateHandle
    where
        F: Fn(&TriggerUpdate) + Send + Sync + 'static,
    {
        let listener: UpdateListener = Arc::new(listener);
        let id = self.state.add_listener(listener);
        UpdateHandle {
            state: Arc::downgrade(&self.state),
            id,
        }
    }

    /// Cancel the trigger.
    ///
    /// No-op once finished. Otherwise asks the native layer to cancel, then
    /// finishes locally with `trigger_cancelled` whatever the native answer.
    #[instrument(skip(self), fields(request_id = %self.request_id()))]
    pub async fn cancel(&self) {
        if !self.state.begin_cancel() {
            debug!("Trigger already finished or cancelling");
            return;
        }

        if let Err(err) = self.backend.cancel(self.request_id()).await {
            warn!(error = %err, "Native trigger cancel failed");
        }

        if self.state.deliver_local(TerminalUpdate::cancelled()) == Delivery::Finished {
            self.registry.remove(self.request_id());
        }
    }

    /// Resolves with the terminal update that ended the operation.
    pub fn done(&self) -> TriggerDone {
        self.done.clone()
    }
}

impl fmt::Debug for TriggerOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TriggerOperation")
            .field("request_id", &self.request_id())
            .field("finished", &self.is_finished())
            .finish()
    }
}

/// Clonable future of a trigger's terminal update.
#[derive(Clone)]
pub struct TriggerDone {
    inner: Shared<BoxFuture<'static, TerminalUpdate>>,
}

impl TriggerDone {
    /// The terminal update, if the future has already been resolved and polled.
    pub fn peek(&self) -> Option<&TerminalUpdate> {
        self.inner.peek()
    }
}

impl Future for TriggerDone {
    type Output = TerminalUpdate;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.inner).poll(cx)
    }
}

impl fmt::Debug for TriggerDone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TriggerDone")
            .field("resolved", &self.peek().is_some())
            .finish()
    }
}

/// Registration of one update listener.
#[must_use = "dropping the handle keeps the listener registered"]
#[derive(Debug, Clone)]
pub struct UpdateHandle {
    state: Weak<OperationState>,
    id: u64,
}

impl UpdateHandle {
    /// Detach the listener. Safe after the operation finished.
    pub fn remove(&self) {
        if let Some(state) = self.state.upgrade() {
            state.remove_listener(self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::BridgeError;
    use bridge_traits::events::TriggerUpdateEvent;
    use bridge_traits::trigger::{EntitlementUpdate, GateSource, JourneyRef, TriggerDecision};
    use mockall::mock;
    use std::sync::Mutex;
    use std::time::Duration;

    mock! {
        Backend {}

        #[async_trait]
        impl TriggerBackend for Backend {
            async fn prepare(&self, gate: &StartGate) -> Result<(), BridgeError>;
            async fn start(&self, request: TriggerRequest) -> Result<(), BridgeError>;
            async fn cancel(&self, request_id: &str) -> Result<(), BridgeError>;
        }
    }

    fn manager(backend: MockBackend) -> TriggerManager {
        TriggerManager::new(TriggerRegistry::new(), Arc::new(backend))
    }

    fn accepting_backend() -> MockBackend {
        let mut backend = MockBackend::new();
        backend.expect_prepare().returning(|_| Ok(()));
        backend.expect_start().returning(|_| Ok(()));
        backend
    }

    fn update_event(request_id: &str, update: TriggerUpdate) -> TriggerUpdateEvent {
        TriggerUpdateEvent {
            request_id: request_id.to_string(),
            update,
            is_terminal: None,
            timestamp_ms: 0,
        }
    }

    fn flow_shown() -> TriggerUpdate {
        TriggerUpdate::decision(TriggerDecision::FlowShown {
            journey: JourneyRef {
                journey_id: "j1".to_string(),
                campaign_id: "c1".to_string(),
                flow_id: Some("f1".to_string()),
            },
        })
    }

    fn allowed() -> TriggerUpdate {
        TriggerUpdate::entitlement(EntitlementUpdate::Allowed {
            source: GateSource::Purchase,
        })
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    #[tokio::test]
    async fn test_start_forwards_request_to_backend() {
        let mut backend = MockBackend::new();
        backend.expect_prepare().times(1).returning(|_| Ok(()));
        backend
            .expect_start()
            .withf(|request| {
                request.event_name == "premium_tapped"
                    && request.options.as_ref().map_or(false, |o| o.properties.is_some())
            })
            .times(1)
            .returning(|_| Ok(()));
        let manager = manager(backend);

        let mut properties = serde_json::Map::new();
        properties.insert("source".to_string(), serde_json::json!("paywall"));
        let operation = manager.start(
            "premium_tapped",
            Some(TriggerOptions::default().with_properties(properties)),
        );
        settle().await;

        assert!(manager.registry().contains(operation.request_id()));
        assert!(!operation.is_finished());
    }

    #[tokio::test]
    async fn test_done_resolves_with_terminal_update_after_listeners() {
        let manager = manager(accepting_backend());
        let operation = manager.start("premium_tapped", None);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _handle = operation.on_update(move |update| sink.lock().unwrap().push(update.clone()));

        let registry = manager.registry();
        registry.route(&update_event(operation.request_id(), flow_shown()));
        registry.route(&update_event(operation.request_id(), allowed()));

        let terminal = operation.done().await;
        assert_eq!(terminal.into_inner(), allowed());
        assert_eq!(*seen.lock().unwrap(), vec![flow_shown(), allowed()]);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_cancel_before_any_update() {
        let mut backend = accepting_backend();
        backend.expect_cancel().times(1).returning(|_| Ok(()));
        let manager = manager(backend);
        let operation = manager.start("premium_tapped", None);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _handle = operation.on_update(move |update| sink.lock().unwrap().push(update.clone()));

        operation.cancel().await;
        operation.cancel().await;

        let terminal = operation.done().await;
        assert!(terminal.is_cancelled());
        assert_eq!(terminal.error().unwrap().message, "Trigger cancelled");
        assert_eq!(seen.lock().unwrap().len(), 1);
        assert!(manager.registry().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_finalizes_even_when_native_cancel_fails() {
        let mut backend = accepting_backend();
        backend
            .expect_cancel()
            .times(1)
            .returning(|_| Err(BridgeError::OperationFailed("gone".to_string())));
        let manager = manager(backend);
        let operation = manager.start("premium_tapped", None);

        operation.cancel().await;
        assert!(operation.done().await.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancel_after_completion_is_noop() {
        let mut backend = accepting_backend();
        backend.expect_cancel().never();
        let manager = manager(backend);
        let operation = manager.start("premium_tapped", None);

        manager
            .registry()
            .route(&update_event(operation.request_id(), allowed()));
        operation.cancel().await;

        assert_eq!(operation.done().await.into_inner(), allowed());
    }

    #[tokio::test]
    async fn test_start_failure_resolves_with_start_failed() {
        let mut backend = MockBackend::new();
        backend.expect_prepare().returning(|_| Ok(()));
        backend
            .expect_start()
            .returning(|_| Err(BridgeError::native("E_START", "start failed")));
        let manager = manager(backend);

        let terminal = manager.trigger_once("premium_tapped", None).await;
        let error = terminal.error().unwrap();
        assert_eq!(error.code, "trigger_start_failed");
        assert_eq!(error.message, "start failed");
        assert!(manager.registry().is_empty());
    }

    #[tokio::test]
    async fn test_start_failure_reaches_listeners() {
        let mut backend = MockBackend::new();
        backend.expect_prepare().returning(|_| Ok(()));
        backend
            .expect_start()
            .returning(|_| Err(BridgeError::OperationFailed("offline".to_string())));
        let manager = manager(backend);

        // The current-thread test runtime has not run the start task yet
        let operation = manager.start("premium_tapped", None);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _handle = operation.on_update(move |update| sink.lock().unwrap().push(update.clone()));

        let terminal = operation.done().await;
        assert_eq!(
            *seen.lock().unwrap(),
            vec![TriggerUpdate::error("trigger_start_failed", "offline")]
        );
        assert_eq!(terminal.error().unwrap().code, "trigger_start_failed");
    }

    #[tokio::test]
    async fn test_removed_listener_misses_later_updates() {
        let manager = manager(accepting_backend());
        let operation = manager.start("premium_tapped", None);
        let seen = Arc::new(Mutex::new(0usize));
        let counter = Arc::clone(&seen);
        let handle = operation.on_update(move |_| *counter.lock().unwrap() += 1);

        manager
            .registry()
            .route(&update_event(operation.request_id(), flow_shown()));
        handle.remove();
        manager
            .registry()
            .route(&update_event(operation.request_id(), allowed()));

        operation.done().await;
        assert_eq!(*seen.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_listener_attached_after_finish_is_never_called() {
        let manager = manager(accepting_backend());
        let operation = manager.start("premium_tapped", None);
        manager
            .registry()
            .route(&update_event(operation.request_id(), allowed()));
        operation.done().await;

        let called = Arc::new(Mutex::new(false));
        let flag = Arc::clone(&called);
        let handle = operation.on_update(move |_| *flag.lock().unwrap() = true);
        manager
            .registry()
            .route(&update_event(operation.request_id(), allowed()));
        handle.remove();

        assert!(!*called.lock().unwrap());
    }

    #[tokio::test]
    async fn test_done_is_shared_between_awaiters() {
        let manager = manager(accepting_backend());
        let operation = manager.start("premium_tapped", None);
        let first = operation.done();
        let second = operation.done();

        manager
            .registry()
            .route(&update_event(operation.request_id(), allowed()));

        let (a, b) = tokio::join!(first, second);
        assert_eq!(a, b);
        assert!(operation.done().peek().is_some());
    }

    #[test]
    fn test_start_outside_runtime_fails_fast() {
        let manager = TriggerManager::new(TriggerRegistry::new(), Arc::new(MockBackend::new()));
        let operation = manager.start("premium_tapped", None);

        assert!(operation.is_finished());
        let terminal = futures::executor::block_on(operation.done());
        assert_eq!(terminal.error().unwrap().code, "trigger_start_failed");
        assert!(manager.registry().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_before_start_task_skips_native_start() {
        let mut backend = MockBackend::new();
        backend.expect_prepare().never();
        backend.expect_start().never();
        backend.expect_cancel().times(1).returning(|_| Ok(()));
        let manager = manager(backend);

        // The current-thread test runtime has not run the start task yet
        let operation = manager.start("premium_tapped", None);
        operation.cancel().await;
        settle().await;

        assert!(operation.done().await.is_cancelled());
        assert!(manager.registry().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_all_during_prepare_skips_native_start() {
        let registry = TriggerRegistry::new();
        let during = registry.clone();
        let mut backend = MockBackend::new();
        backend.expect_prepare().times(1).returning(move |gate| {
            assert!(gate.is_open());
            during.cancel_all();
            assert!(!gate.is_open());
            Ok(())
        });
        backend.expect_start().never();
        let manager = TriggerManager::new(registry, Arc::new(backend));

        let terminal = manager.trigger_once("premium_tapped", None).await;
        assert!(terminal.is_cancelled());
        assert!(manager.registry().is_empty());
    }
}
