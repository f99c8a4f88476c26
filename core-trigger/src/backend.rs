use crate::state::OperationState;
use async_trait::async_trait;
use bridge_traits::error::BridgeError;
use bridge_traits::trigger::TriggerOptions;
use std::fmt;
use std::sync::Arc;

/// A trigger start request as handed to the native layer.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerRequest {
    pub request_id: String,
    pub event_name: String,
    pub options: Option<TriggerOptions>,
}

/// Whether an operation still wants its native start.
///
/// Closes for good once the operation is cancelled or finished.
#[derive(Clone)]
pub struct StartGate {
    state: Arc<OperationState>,
}

impl StartGate {
    pub(crate) fn new(state: Arc<OperationState>) -> Self {
        Self { state }
    }

    pub fn request_id(&self) -> &str {
        self.state.request_id()
    }

    pub fn is_open(&self) -> bool {
        self.state.is_startable()
    }
}

impl fmt::Debug for StartGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StartGate")
            .field("request_id", &self.request_id())
            .field("open", &self.is_open())
            .finish()
    }
}

/// The native calls a trigger operation makes.
///
/// `prepare` covers what has to happen before the native SDK may push updates
/// (event subscription, module resolution). It should not set up anything
/// once `gate` is closed. `start` is only called while the gate is still
/// open after `prepare` returned. An error from either ends the operation
/// with `trigger_start_failed`.
#[async_trait]
pub trait TriggerBackend: Send + Sync {
    async fn prepare(&self, gate: &StartGate) -> Result<(), BridgeError>;

    async fn start(&self, request: TriggerRequest) -> Result<(), BridgeError>;

    /// Best-effort; failures are logged and otherwise ignored.
    async fn cancel(&self, request_id: &str) -> Result<(), BridgeError>;
}
