//! Native Event Payloads
//!
//! Events the native SDK pushes to the bridge through
//! [`NativeModule::add_listener`](crate::native::NativeModule::add_listener).
//! Each [`NativeEventName`] owns exactly one payload shape.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::feature::FeatureAccess;
use crate::purchase::{PurchaseRequest, RestoreRequest};
use crate::trigger::TriggerUpdate;

/// Event category name as registered with the native event emitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NativeEventName {
    #[serde(rename = "onTriggerUpdate")]
    TriggerUpdate,
    #[serde(rename = "onFeatureAccessChanged")]
    FeatureAccessChanged,
    #[serde(rename = "onPurchaseRequest")]
    PurchaseRequest,
    #[serde(rename = "onRestoreRequest")]
    RestoreRequest,
    #[serde(rename = "onFlowPresented")]
    FlowPresented,
    #[serde(rename = "onFlowDismissed")]
    FlowDismissed,
}

impl NativeEventName {
    pub const ALL: [NativeEventName; 6] = [
        NativeEventName::TriggerUpdate,
        NativeEventName::FeatureAccessChanged,
        NativeEventName::PurchaseRequest,
        NativeEventName::RestoreRequest,
        NativeEventName::FlowPresented,
        NativeEventName::FlowDismissed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NativeEventName::TriggerUpdate => "onTriggerUpdate",
            NativeEventName::FeatureAccessChanged => "onFeatureAccessChanged",
            NativeEventName::PurchaseRequest => "onPurchaseRequest",
            NativeEventName::RestoreRequest => "onRestoreRequest",
            NativeEventName::FlowPresented => "onFlowPresented",
            NativeEventName::FlowDismissed => "onFlowDismissed",
        }
    }
}

impl fmt::Display for NativeEventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Update for one in-flight trigger, correlated by `request_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerUpdateEvent {
    pub request_id: String,
    pub update: TriggerUpdate,
    /// Native-side hint that this update ends the trigger.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_terminal: Option<bool>,
    pub timestamp_ms: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureAccessChangedEvent {
    pub feature_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<FeatureAccess>,
    pub to: FeatureAccess,
    pub timestamp_ms: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowPresentedEvent {
    pub flow_id: String,
    pub timestamp_ms: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowDismissedEvent {
    pub flow_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub timestamp_ms: i64,
}

/// Any event delivered by the native layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload")]
pub enum NativeEvent {
    #[serde(rename = "onTriggerUpdate")]
    TriggerUpdate(TriggerUpdateEvent),
    #[serde(rename = "onFeatureAccessChanged")]
    FeatureAccessChanged(FeatureAccessChangedEvent),
    #[serde(rename = "onPurchaseRequest")]
    PurchaseRequest(PurchaseRequest),
    #[serde(rename = "onRestoreRequest")]
    RestoreRequest(RestoreRequest),
    #[serde(rename = "onFlowPresented")]
    FlowPresented(FlowPresentedEvent),
    #[serde(rename = "onFlowDismissed")]
    FlowDismissed(FlowDismissedEvent),
}

impl NativeEvent {
    pub fn name(&self) -> NativeEventName {
        match self {
            NativeEvent::TriggerUpdate(_) => NativeEventName::TriggerUpdate,
            NativeEvent::FeatureAccessChanged(_) => NativeEventName::FeatureAccessChanged,
            NativeEvent::PurchaseRequest(_) => NativeEventName::PurchaseRequest,
            NativeEvent::RestoreRequest(_) => NativeEventName::RestoreRequest,
            NativeEvent::FlowPresented(_) => NativeEventName::FlowPresented,
            NativeEvent::FlowDismissed(_) => NativeEventName::FlowDismissed,
        }
    }

    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &'static str {
        match self {
            NativeEvent::TriggerUpdate(_) => "Trigger update received",
            NativeEvent::FeatureAccessChanged(_) => "Feature access changed",
            NativeEvent::PurchaseRequest(_) => "Purchase requested by native SDK",
            NativeEvent::RestoreRequest(_) => "Restore requested by native SDK",
            NativeEvent::FlowPresented(_) => "Flow presented",
            NativeEvent::FlowDismissed(_) => "Flow dismissed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trigger::TriggerDecision;
    use serde_json::json;

    #[test]
    fn test_event_names_match_wire() {
        for name in NativeEventName::ALL {
            let value = serde_json::to_value(name).unwrap();
            assert_eq!(value, json!(name.as_str()));
        }
    }

    #[test]
    fn test_trigger_update_event_roundtrip_name() {
        let event = NativeEvent::TriggerUpdate(TriggerUpdateEvent {
            request_id: "req-1".to_string(),
            update: TriggerUpdate::decision(TriggerDecision::NoMatch),
            is_terminal: Some(true),
            timestamp_ms: 42,
        });

        assert_eq!(event.name(), NativeEventName::TriggerUpdate);
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], json!("onTriggerUpdate"));
        assert_eq!(value["payload"]["requestId"], json!("req-1"));
        assert_eq!(value["payload"]["isTerminal"], json!(true));
    }
}
