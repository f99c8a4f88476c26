//! Terminality rules and the [`TerminalUpdate`] type that `done` resolves with.

use crate::error::Error;
use bridge_traits::trigger::{EntitlementUpdate, TriggerDecision, TriggerError, TriggerUpdate};
use serde::{Deserialize, Serialize};
use std::ops::Deref;

/// Error codes synthesized locally rather than by the native SDK.
pub mod codes {
    pub const TRIGGER_CANCELLED: &str = "trigger_cancelled";
    pub const TRIGGER_START_FAILED: &str = "trigger_start_failed";
    pub const INVALID_TERMINAL_UPDATE: &str = "invalid_terminal_update";
}

const CANCELLED_MESSAGE: &str = "Trigger cancelled";
const START_FAILED_FALLBACK: &str = "trigger_failed";
const INVALID_TERMINAL_MESSAGE: &str =
    "Native bridge marked a non-terminal trigger update as terminal.";

/// Whether `update` ends a trigger by its shape alone.
///
/// `journey` and `error` always do. `entitlement` does unless it is still
/// pending. A `decision` does unless it points at a journey or flow that will
/// report back later.
pub fn is_terminal(update: &TriggerUpdate) -> bool {
    match update {
        TriggerUpdate::Journey { .. } | TriggerUpdate::Error { .. } => true,
        TriggerUpdate::Entitlement { entitlement } => match entitlement {
            EntitlementUpdate::Allowed { .. } | EntitlementUpdate::Denied => true,
            EntitlementUpdate::Pending => false,
        },
        TriggerUpdate::Decision { decision } => match decision {
            TriggerDecision::NoMatch
            | TriggerDecision::Suppressed { .. }
            | TriggerDecision::AllowedImmediate
            | TriggerDecision::DeniedImmediate => true,
            TriggerDecision::JourneyStarted { .. }
            | TriggerDecision::JourneyResumed { .. }
            | TriggerDecision::FlowShown { .. } => false,
        },
    }
}

/// A [`TriggerUpdate`] known to have a terminal shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TriggerUpdate", into = "TriggerUpdate")]
pub struct TerminalUpdate(TriggerUpdate);

impl TerminalUpdate {
    /// The update reported when a trigger is cancelled locally.
    pub fn cancelled() -> Self {
        Self(TriggerUpdate::error(codes::TRIGGER_CANCELLED, CANCELLED_MESSAGE))
    }

    /// The update reported when the native layer rejects a trigger start.
    pub fn start_failed(message: impl Into<String>) -> Self {
        let message = message.into();
        let message = if message.is_empty() {
            START_FAILED_FALLBACK.to_string()
        } else {
            message
        };
        Self(TriggerUpdate::error(codes::TRIGGER_START_FAILED, message))
    }

    /// Replaces a native update flagged terminal whose shape is not.
    pub fn invalid_terminal() -> Self {
        Self(TriggerUpdate::error(
            codes::INVALID_TERMINAL_UPDATE,
            INVALID_TERMINAL_MESSAGE,
        ))
    }

    pub fn as_update(&self) -> &TriggerUpdate {
        &self.0
    }

    pub fn into_inner(self) -> TriggerUpdate {
        self.0
    }

    /// The error payload, if the trigger ended with one.
    pub fn error(&self) -> Option<&TriggerError> {
        match &self.0 {
            TriggerUpdate::Error { error } => Some(error),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.error()
            .map_or(false, |error| error.code == codes::TRIGGER_CANCELLED)
    }
}

impl TryFrom<TriggerUpdate> for TerminalUpdate {
    type Error = Error;

    fn try_from(update: TriggerUpdate) -> Result<Self, Self::Error> {
        if is_terminal(&update) {
            Ok(Self(update))
        } else {
            Err(Error::NotTerminal(update))
        }
    }
}

impl From<TerminalUpdate> for TriggerUpdate {
    fn from(terminal: TerminalUpdate) -> Self {
        terminal.0
    }
}

impl Deref for TerminalUpdate {
    type Target = TriggerUpdate;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<TriggerUpdate> for TerminalUpdate {
    fn as_ref(&self) -> &TriggerUpdate {
        &self.0
    }
}
