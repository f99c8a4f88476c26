//! # Event Router
//!
//! Owns at most one native subscription per event category and fans each
//! native event out to the component that correlates it and to general
//! listeners.
//!
//! | Category | Correlated by | Then |
//! |----------|---------------|------|
//! | trigger update | [`TriggerRegistry::route`] | listeners, bus |
//! | purchase / restore request | listeners, bus | [`PurchaseBridge`] on the runtime |
//! | feature access, flow presented / dismissed | none | listeners, bus |

use crate::error::{ClientError, Result};
use bridge_traits::events::{NativeEvent, NativeEventName};
use bridge_traits::native::{NativeEventHandler, NativeModule, NativeSubscription};
use core_purchase::PurchaseBridge;
use core_runtime::events::{EventBus, EventSeverity, ListenerRegistry};
use core_trigger::TriggerRegistry;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};
use tokio::runtime::Handle;
use tokio::sync::Mutex;
use tracing::{debug, info, trace, warn};

struct RouterInner {
    triggers: TriggerRegistry,
    purchases: Arc<PurchaseBridge>,
    listeners: ListenerRegistry,
    bus: EventBus,
    subscriptions: Mutex<HashMap<NativeEventName, Box<dyn NativeSubscription>>>,
}

#[derive(Clone)]
pub struct EventRouter {
    inner: Arc<RouterInner>,
}

impl EventRouter {
    pub fn new(
        triggers: TriggerRegistry,
        purchases: Arc<PurchaseBridge>,
        listeners: ListenerRegistry,
        bus: EventBus,
    ) -> Self {
        Self {
            inner: Arc::new(RouterInner {
                triggers,
                purchases,
                listeners,
                bus,
                subscriptions: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn listeners(&self) -> &ListenerRegistry {
        &self.inner.listeners
    }

    pub fn bus(&self) -> &EventBus {
        &self.inner.bus
    }

    /// Subscribe to `name` on `module` unless already subscribed.
    ///
    /// Creation is serialized: a concurrent caller for the same category waits
    /// for the first one and then finds the subscription in place.
    pub async fn ensure_subscription(
        &self,
        module: &Arc<dyn NativeModule>,
        name: NativeEventName,
    ) -> Result<()> {
        self.ensure_subscription_when(module, name, || true).await
    }

    /// Like [`ensure_subscription`](Self::ensure_subscription), but a missing
    /// subscription is only created if `wanted` still holds once the
    /// subscription table is locked.
    pub async fn ensure_subscription_when<F>(
        &self,
        module: &Arc<dyn NativeModule>,
        name: NativeEventName,
        wanted: F,
    ) -> Result<()>
    where
        F: FnOnce() -> bool + Send,
    {
        let mut subscriptions = self.inner.subscriptions.lock().await;
        if subscriptions.contains_key(&name) {
            return Ok(());
        }
        if !wanted() {
            trace!(event = %name, "Native subscription no longer wanted");
            return Ok(());
        }

        let runtime = Handle::try_current()
            .map_err(|err| ClientError::Runtime(core_runtime::Error::NoRuntime(err.to_string())))?;

        let router = Arc::downgrade(&self.inner);
        let module_ref = Arc::downgrade(module);
        let handler: NativeEventHandler = Arc::new(move |event| {
            let Some(router) = router.upgrade() else {
                return;
            };
            router.dispatch(event, &module_ref, &runtime);
        });

        let subscription = module.add_listener(name, handler);
        subscriptions.insert(name, subscription);
        debug!(event = %name, "Native subscription created");
        Ok(())
    }

    pub async fn has_subscription(&self, name: NativeEventName) -> bool {
        self.inner.subscriptions.lock().await.contains_key(&name)
    }

    pub async fn subscription_count(&self) -> usize {
        self.inner.subscriptions.lock().await.len()
    }

    /// Detach every native subscription. Returns how many were removed.
    pub async fn remove_all(&self) -> usize {
        let mut subscriptions = self.inner.subscriptions.lock().await;
        let count = subscriptions.len();
        for (name, subscription) in subscriptions.drain() {
            subscription.remove();
            trace!(event = %name, "Native subscription removed");
        }
        count
    }

    /// Route one event as if it had arrived from the native layer.
    ///
    /// Purchase and restore handling is spawned on the current runtime; it
    /// needs the native module to report completion.
    pub fn dispatch(&self, event: NativeEvent, module: &Arc<dyn NativeModule>) {
        match Handle::try_current() {
            Ok(runtime) => self.inner.dispatch(event, &Arc::downgrade(module), &runtime),
            Err(err) => warn!(error = %err, "Cannot dispatch native event outside a runtime"),
        }
    }
}

impl RouterInner {
    fn dispatch(&self, event: NativeEvent, module: &Weak<dyn NativeModule>, runtime: &Handle) {
        match EventSeverity::of(&event) {
            EventSeverity::Debug => trace!(event = %event.name(), "Native event received"),
            EventSeverity::Info => info!(event = %event.name(), "Native event received"),
            EventSeverity::Warning | EventSeverity::Error => {
                warn!(event = %event.name(), description = event.description(), "Native event received")
            }
        }

        match event {
            NativeEvent::TriggerUpdate(ref payload) => {
                self.triggers.route(payload);
                self.emit(event);
            }
            NativeEvent::PurchaseRequest(ref request) => {
                let request = request.clone();
                self.emit(event);
                let Some(module) = module.upgrade() else {
                    warn!(request_id = %request.request_id, "Native module dropped before purchase handling");
                    return;
                };
                let purchases = Arc::clone(&self.purchases);
                runtime.spawn(async move {
                    // Outcomes are logged by the bridge
                    let _ = purchases.handle_purchase(module.as_ref(), request).await;
                });
            }
            NativeEvent::RestoreRequest(ref request) => {
                let request = request.clone();
                self.emit(event);
                let Some(module) = module.upgrade() else {
                    warn!(request_id = %request.request_id, "Native module dropped before restore handling");
                    return;
                };
                let purchases = Arc::clone(&self.purchases);
                runtime.spawn(async move {
                    let _ = purchases.handle_restore(module.as_ref(), request).await;
                });
            }
            NativeEvent::FeatureAccessChanged(_)
            | NativeEvent::FlowPresented(_)
            | NativeEvent::FlowDismissed(_) => self.emit(event),
        }
    }

    fn emit(&self, event: NativeEvent) {
        self.listeners.emit(&event);
        // No stream subscribers is the common case
        let _ = self.bus.emit(event);
    }
}

impl fmt::Debug for EventRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventRouter")
            .field("triggers", &self.inner.triggers)
            .field("listeners", &self.inner.listeners)
            .field("bus", &self.inner.bus)
            .finish()
    }
}
