//! Recording native module used by the client integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result};
use bridge_traits::events::{NativeEvent, NativeEventName, TriggerUpdateEvent};
use bridge_traits::feature::{
    FeatureAccess, FeatureCheckResult, FeatureType, FeatureUsageResult, ProfileResponse,
};
use bridge_traits::native::{NativeEventHandler, NativeModule, NativeSubscription};
use bridge_traits::options::ConfigurationOptions;
use bridge_traits::purchase::{PurchaseResult, RestoreResult};
use bridge_traits::trigger::{JsonObject, TriggerOptions, TriggerUpdate};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Configure {
        api_key: String,
        options: ConfigurationOptions,
        use_purchase_controller: bool,
        wrapper_version: String,
    },
    Shutdown,
    Identify {
        distinct_id: String,
        user_properties: Option<JsonObject>,
    },
    StartTrigger {
        request_id: String,
        event_name: String,
        options: Option<TriggerOptions>,
    },
    CancelTrigger {
        request_id: String,
    },
    HasFeature {
        feature_id: String,
        required_balance: Option<f64>,
        entity_id: Option<String>,
    },
    UseFeatureAndWait {
        feature_id: String,
        amount: Option<f64>,
        set_usage: Option<bool>,
    },
    CompletePurchase {
        request_id: String,
        result: PurchaseResult,
    },
    CompleteRestore {
        request_id: String,
        result: RestoreResult,
    },
    Other(&'static str),
}

type HandlerTable = Arc<Mutex<HashMap<NativeEventName, Vec<(u64, NativeEventHandler)>>>>;

#[derive(Default)]
pub struct TestNativeModule {
    calls: Mutex<Vec<Call>>,
    handlers: HandlerTable,
    next_handler_id: AtomicU64,
    add_listener_calls: Mutex<HashMap<NativeEventName, usize>>,
    default_api_key: Mutex<Option<String>>,
    default_api_key_error: Mutex<Option<String>>,
    start_trigger_error: Mutex<Option<String>>,
    cancel_trigger_error: Mutex<Option<String>>,
    shutdown_error: Mutex<Option<String>>,
}

impl TestNativeModule {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_default_api_key(&self, key: Option<&str>) {
        *self.default_api_key.lock().unwrap() = key.map(str::to_string);
    }

    pub fn fail_default_api_key(&self, message: &str) {
        *self.default_api_key_error.lock().unwrap() = Some(message.to_string());
    }

    pub fn fail_start_trigger(&self, message: &str) {
        *self.start_trigger_error.lock().unwrap() = Some(message.to_string());
    }

    pub fn fail_cancel_trigger(&self, message: &str) {
        *self.cancel_trigger_error.lock().unwrap() = Some(message.to_string());
    }

    pub fn fail_shutdown(&self, message: &str) {
        *self.shutdown_error.lock().unwrap() = Some(message.to_string());
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn configure_calls(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| matches!(call, Call::Configure { .. }))
            .collect()
    }

    pub fn started_request_ids(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::StartTrigger { request_id, .. } => Some(request_id),
                _ => None,
            })
            .collect()
    }

    pub fn cancelled_request_ids(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::CancelTrigger { request_id } => Some(request_id),
                _ => None,
            })
            .collect()
    }

    pub fn purchase_completions(&self) -> Vec<(String, PurchaseResult)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::CompletePurchase { request_id, result } => Some((request_id, result)),
                _ => None,
            })
            .collect()
    }

    pub fn restore_completions(&self) -> Vec<(String, RestoreResult)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::CompleteRestore { request_id, result } => Some((request_id, result)),
                _ => None,
            })
            .collect()
    }

    /// Handlers currently attached for `name`.
    pub fn listener_count(&self, name: NativeEventName) -> usize {
        self.handlers
            .lock()
            .unwrap()
            .get(&name)
            .map_or(0, Vec::len)
    }

    /// Total `add_listener` calls ever made for `name`.
    pub fn add_listener_calls(&self, name: NativeEventName) -> usize {
        self.add_listener_calls
            .lock()
            .unwrap()
            .get(&name)
            .copied()
            .unwrap_or(0)
    }

    /// Deliver `event` synchronously to every attached handler of its category.
    pub fn emit(&self, event: NativeEvent) {
        let handlers: Vec<NativeEventHandler> = self
            .handlers
            .lock()
            .unwrap()
            .get(&event.name())
            .map(|entries| entries.iter().map(|(_, h)| Arc::clone(h)).collect())
            .unwrap_or_default();
        for handler in handlers {
            handler(event.clone());
        }
    }

    pub fn emit_trigger_update(&self, request_id: &str, update: TriggerUpdate) {
        self.emit(NativeEvent::TriggerUpdate(TriggerUpdateEvent {
            request_id: request_id.to_string(),
            update,
            is_terminal: None,
            timestamp_ms: 1_700_000_000_000,
        }));
    }

    /// Wait until `count` triggers have been started natively.
    pub async fn wait_for_started(&self, count: usize) -> Vec<String> {
        wait_until(|| self.started_request_ids().len() >= count).await;
        self.started_request_ids()
    }

    fn take_error(slot: &Mutex<Option<String>>) -> Result<()> {
        match slot.lock().unwrap().clone() {
            Some(message) => Err(BridgeError::OperationFailed(message)),
            None => Ok(()),
        }
    }
}

/// Poll `condition` until it holds, failing the test after a second.
pub async fn wait_until<F>(mut condition: F)
where
    F: FnMut() -> bool,
{
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not met in time");
}

/// Await `future` with a one second limit.
pub async fn within<F: Future>(future: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(1), future)
        .await
        .expect("future did not complete in time")
}

struct TestSubscription {
    handlers: HandlerTable,
    name: NativeEventName,
    id: u64,
}

impl NativeSubscription for TestSubscription {
    fn remove(&self) {
        if let Some(entries) = self.handlers.lock().unwrap().get_mut(&self.name) {
            entries.retain(|(id, _)| *id != self.id);
        }
    }
}

#[async_trait]
impl NativeModule for TestNativeModule {
    async fn configure(
        &self,
        api_key: &str,
        options: &ConfigurationOptions,
        use_purchase_controller: bool,
        wrapper_version: &str,
    ) -> Result<()> {
        self.record(Call::Configure {
            api_key: api_key.to_string(),
            options: options.clone(),
            use_purchase_controller,
            wrapper_version: wrapper_version.to_string(),
        });
        Ok(())
    }

    async fn get_default_api_key(&self) -> Result<Option<String>> {
        if let Some(message) = self.default_api_key_error.lock().unwrap().clone() {
            return Err(BridgeError::native("E_MANIFEST", message));
        }
        Ok(self.default_api_key.lock().unwrap().clone())
    }

    async fn shutdown(&self) -> Result<()> {
        self.record(Call::Shutdown);
        Self::take_error(&self.shutdown_error)
    }

    async fn identify(
        &self,
        distinct_id: &str,
        user_properties: Option<&JsonObject>,
        _user_properties_set_once: Option<&JsonObject>,
    ) -> Result<()> {
        self.record(Call::Identify {
            distinct_id: distinct_id.to_string(),
            user_properties: user_properties.cloned(),
        });
        Ok(())
    }

    async fn reset(&self, _keep_anonymous_id: Option<bool>) -> Result<()> {
        self.record(Call::Other("reset"));
        Ok(())
    }

    async fn get_distinct_id(&self) -> Result<String> {
        Ok("user_1".to_string())
    }

    async fn get_anonymous_id(&self) -> Result<String> {
        Ok("anon_1".to_string())
    }

    async fn get_is_identified(&self) -> Result<bool> {
        Ok(true)
    }

    async fn start_trigger(
        &self,
        request_id: &str,
        event_name: &str,
        options: Option<&TriggerOptions>,
    ) -> Result<()> {
        self.record(Call::StartTrigger {
            request_id: request_id.to_string(),
            event_name: event_name.to_string(),
            options: options.cloned(),
        });
        Self::take_error(&self.start_trigger_error)
    }

    async fn cancel_trigger(&self, request_id: &str) -> Result<()> {
        self.record(Call::CancelTrigger {
            request_id: request_id.to_string(),
        });
        Self::take_error(&self.cancel_trigger_error)
    }

    async fn show_flow(&self, _flow_id: &str) -> Result<()> {
        self.record(Call::Other("show_flow"));
        Ok(())
    }

    async fn refresh_profile(&self) -> Result<ProfileResponse> {
        Ok(ProfileResponse {
            customer_id: Some("cus_1".to_string()),
            ..Default::default()
        })
    }

    async fn has_feature(
        &self,
        feature_id: &str,
        required_balance: Option<f64>,
        entity_id: Option<&str>,
    ) -> Result<FeatureAccess> {
        self.record(Call::HasFeature {
            feature_id: feature_id.to_string(),
            required_balance,
            entity_id: entity_id.map(str::to_string),
        });
        Ok(FeatureAccess {
            allowed: true,
            unlimited: false,
            balance: Some(5.0),
            feature_type: FeatureType::Metered,
        })
    }

    async fn get_cached_feature(
        &self,
        _feature_id: &str,
        _entity_id: Option<&str>,
    ) -> Result<Option<FeatureAccess>> {
        Ok(None)
    }

    async fn check_feature(
        &self,
        feature_id: &str,
        required_balance: Option<f64>,
        _entity_id: Option<&str>,
    ) -> Result<FeatureCheckResult> {
        Ok(FeatureCheckResult {
            customer_id: "cus_1".to_string(),
            feature_id: feature_id.to_string(),
            required_balance: required_balance.unwrap_or(1.0),
            code: "ok".to_string(),
            allowed: true,
            unlimited: false,
            balance: Some(5.0),
            feature_type: FeatureType::Metered,
            preview: None,
        })
    }

    async fn refresh_feature(
        &self,
        feature_id: &str,
        required_balance: Option<f64>,
        entity_id: Option<&str>,
    ) -> Result<FeatureCheckResult> {
        self.check_feature(feature_id, required_balance, entity_id)
            .await
    }

    async fn use_feature(
        &self,
        _feature_id: &str,
        _amount: Option<f64>,
        _entity_id: Option<&str>,
        _metadata: Option<&JsonObject>,
    ) -> Result<()> {
        self.record(Call::Other("use_feature"));
        Ok(())
    }

    async fn use_feature_and_wait(
        &self,
        feature_id: &str,
        amount: Option<f64>,
        _entity_id: Option<&str>,
        set_usage: Option<bool>,
        _metadata: Option<&JsonObject>,
    ) -> Result<FeatureUsageResult> {
        self.record(Call::UseFeatureAndWait {
            feature_id: feature_id.to_string(),
            amount,
            set_usage,
        });
        Ok(FeatureUsageResult {
            success: true,
            feature_id: feature_id.to_string(),
            amount_used: amount.unwrap_or(1.0),
            message: None,
            usage: None,
        })
    }

    async fn flush_events(&self) -> Result<bool> {
        Ok(true)
    }

    async fn get_queued_event_count(&self) -> Result<u64> {
        Ok(3)
    }

    async fn pause_event_queue(&self) -> Result<()> {
        self.record(Call::Other("pause_event_queue"));
        Ok(())
    }

    async fn resume_event_queue(&self) -> Result<()> {
        self.record(Call::Other("resume_event_queue"));
        Ok(())
    }

    async fn complete_purchase(&self, request_id: &str, result: &PurchaseResult) -> Result<()> {
        self.record(Call::CompletePurchase {
            request_id: request_id.to_string(),
            result: result.clone(),
        });
        Ok(())
    }

    async fn complete_restore(&self, request_id: &str, result: &RestoreResult) -> Result<()> {
        self.record(Call::CompleteRestore {
            request_id: request_id.to_string(),
            result: result.clone(),
        });
        Ok(())
    }

    fn add_listener(
        &self,
        event: NativeEventName,
        handler: NativeEventHandler,
    ) -> Box<dyn NativeSubscription> {
        let id = self.next_handler_id.fetch_add(1, Ordering::Relaxed);
        self.handlers
            .lock()
            .unwrap()
            .entry(event)
            .or_default()
            .push((id, handler));
        *self
            .add_listener_calls
            .lock()
            .unwrap()
            .entry(event)
            .or_default() += 1;

        Box::new(TestSubscription {
            handlers: Arc::clone(&self.handlers),
            name: event,
            id,
        })
    }
}
