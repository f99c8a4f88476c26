//! Trigger Wire Types
//!
//! Shapes exchanged with the native SDK while a trigger is in flight. The native
//! side pushes a stream of [`TriggerUpdate`] values tagged with the request id the
//! client minted; deciding which of them end the stream is the job of
//! `core-trigger`, not of these types.

use serde::{Deserialize, Serialize};

/// Free-form JSON object used for event and user properties.
pub type JsonObject = serde_json::Map<String, serde_json::Value>;

/// Properties forwarded with a trigger request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<JsonObject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_properties: Option<JsonObject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_properties_set_once: Option<JsonObject>,
}

impl TriggerOptions {
    pub fn with_properties(mut self, properties: JsonObject) -> Self {
        self.properties = Some(properties);
        self
    }

    pub fn with_user_properties(mut self, properties: JsonObject) -> Self {
        self.user_properties = Some(properties);
        self
    }

    pub fn with_user_properties_set_once(mut self, properties: JsonObject) -> Self {
        self.user_properties_set_once = Some(properties);
        self
    }
}

/// Reference to the journey (and optionally flow) a decision points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JourneyRef {
    pub journey_id: String,
    pub campaign_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuppressReason {
    AlreadyActive,
    ReentryLimited,
    Holdout,
    NoFlow,
    Unknown,
}

/// Campaign decision reached for a trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TriggerDecision {
    NoMatch,
    Suppressed {
        reason: SuppressReason,
        #[serde(
            rename = "rawReason",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        raw_reason: Option<String>,
    },
    JourneyStarted {
        #[serde(rename = "ref")]
        journey: JourneyRef,
    },
    JourneyResumed {
        #[serde(rename = "ref")]
        journey: JourneyRef,
    },
    FlowShown {
        #[serde(rename = "ref")]
        journey: JourneyRef,
    },
    AllowedImmediate,
    DeniedImmediate,
}

/// Where an allowed entitlement came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateSource {
    Cache,
    Purchase,
    Restore,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EntitlementUpdate {
    Pending,
    Allowed { source: GateSource },
    Denied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JourneyExitReason {
    Completed,
    GoalMet,
    TriggerUnmatched,
    Expired,
    Error,
    Cancelled,
}

/// Completion record of a journey started or resumed by a trigger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JourneyUpdate {
    pub journey_id: String,
    pub campaign_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_id: Option<String>,
    pub exit_reason: JourneyExitReason,
    pub goal_met: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal_met_at_epoch_millis: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_exit_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerError {
    pub code: String,
    pub message: String,
}

impl TriggerError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// One update in a trigger's lifecycle.
///
/// On the wire: `{"kind": "decision", "decision": {"type": "no_match"}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TriggerUpdate {
    Decision { decision: TriggerDecision },
    Entitlement { entitlement: EntitlementUpdate },
    Journey { journey: JourneyUpdate },
    Error { error: TriggerError },
}

impl TriggerUpdate {
    pub fn decision(decision: TriggerDecision) -> Self {
        Self::Decision { decision }
    }

    pub fn entitlement(entitlement: EntitlementUpdate) -> Self {
        Self::Entitlement { entitlement }
    }

    pub fn journey(journey: JourneyUpdate) -> Self {
        Self::Journey { journey }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Error {
            error: TriggerError::new(code, message),
        }
    }

    /// Wire tag of this update (`decision`, `entitlement`, `journey`, `error`).
    pub fn kind(&self) -> &'static str {
        match self {
            TriggerUpdate::Decision { .. } => "decision",
            TriggerUpdate::Entitlement { .. } => "entitlement",
            TriggerUpdate::Journey { .. } => "journey",
            TriggerUpdate::Error { .. } => "error",
        }
    }
}
