use crate::state::{Delivery, OperationState};
use crate::update::TerminalUpdate;
use bridge_traits::events::TriggerUpdateEvent;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, trace};

/// Live trigger operations keyed by request identifier.
///
/// Owned by one client; cloning shares the same table.
#[derive(Clone, Default)]
pub struct TriggerRegistry {
    operations: Arc<Mutex<HashMap<String, Arc<OperationState>>>>,
}

impl TriggerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self) -> MutexGuard<'_, HashMap<String, Arc<OperationState>>> {
        self.operations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn insert(&self, state: Arc<OperationState>) {
        self.table().insert(state.request_id().to_string(), state);
    }

    pub(crate) fn get(&self, request_id: &str) -> Option<Arc<OperationState>> {
        self.table().get(request_id).cloned()
    }

    pub(crate) fn remove(&self, request_id: &str) {
        self.table().remove(request_id);
    }

    /// Hand a native trigger update to the operation it belongs to.
    ///
    /// Returns `false` when no live operation matches; late events after a
    /// cancel or a failed start land here and are dropped.
    pub fn route(&self, event: &TriggerUpdateEvent) -> bool {
        let Some(state) = self.get(&event.request_id) else {
            trace!(
                request_id = %event.request_id,
                kind = event.update.kind(),
                "Dropping trigger update without a live operation"
            );
            return false;
        };

        match state.deliver_native(&event.update, event.is_terminal.unwrap_or(false)) {
            Delivery::Ignored => false,
            Delivery::Delivered => true,
            Delivery::Finished => {
                self.remove(&event.request_id);
                true
            }
        }
    }

    /// Finish every live operation with `trigger_cancelled` and empty the table.
    ///
    /// Observers receive the cancellation like an explicit `cancel()`. The
    /// native layer is not asked to cancel anything. Returns how many
    /// operations were finished.
    pub fn cancel_all(&self) -> usize {
        let drained: Vec<Arc<OperationState>> =
            self.table().drain().map(|(_, state)| state).collect();

        let finished = drained
            .iter()
            .filter(|state| state.deliver_local(TerminalUpdate::cancelled()) == Delivery::Finished)
            .count();
        if finished > 0 {
            debug!(count = finished, "Cancelled outstanding triggers");
        }
        finished
    }

    pub fn contains(&self, request_id: &str) -> bool {
        self.table().contains_key(request_id)
    }

    pub fn len(&self) -> usize {
        self.table().len()
    }

    pub fn is_empty(&self) -> bool {
        self.table().is_empty()
    }
}

impl fmt::Debug for TriggerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TriggerRegistry")
            .field("live_operations", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::trigger::{TriggerDecision, TriggerUpdate};
    use std::sync::Mutex as StdMutex;

    fn event(request_id: &str, update: TriggerUpdate) -> TriggerUpdateEvent {
        TriggerUpdateEvent {
            request_id: request_id.to_string(),
            update,
            is_terminal: None,
            timestamp_ms: 0,
        }
    }

    #[test]
    fn test_unknown_request_is_dropped() {
        let registry = TriggerRegistry::new();
        assert!(!registry.route(&event(
            "missing",
            TriggerUpdate::decision(TriggerDecision::NoMatch)
        )));
    }

    #[test]
    fn test_terminal_update_removes_operation() {
        let registry = TriggerRegistry::new();
        let (state, mut rx) = OperationState::new("req-1".to_string());
        registry.insert(state);

        assert!(registry.route(&event(
            "req-1",
            TriggerUpdate::decision(TriggerDecision::NoMatch)
        )));
        assert!(!registry.contains("req-1"));
        assert!(rx.try_recv().is_ok());

        assert!(!registry.route(&event("req-1", TriggerUpdate::error("late", "late"))));
    }

    #[test]
    fn test_updates_do_not_cross_operations() {
        let registry = TriggerRegistry::new();
        let (a, _rx_a) = OperationState::new("a".to_string());
        let (b, _rx_b) = OperationState::new("b".to_string());
        let seen_b = Arc::new(StdMutex::new(0usize));
        let counter = Arc::clone(&seen_b);
        b.add_listener(Arc::new(move |_: &TriggerUpdate| {
            *counter.lock().unwrap() += 1;
        }));
        registry.insert(a);
        registry.insert(b);

        registry.route(&event("a", TriggerUpdate::decision(TriggerDecision::NoMatch)));
        assert_eq!(*seen_b.lock().unwrap(), 0);
        assert!(registry.contains("b"));
    }

    #[test]
    fn test_cancel_all_resolves_pending_operations() {
        let registry = TriggerRegistry::new();
        let (a, mut rx_a) = OperationState::new("a".to_string());
        let (b, mut rx_b) = OperationState::new("b".to_string());
        registry.insert(a);
        registry.insert(b);

        assert_eq!(registry.cancel_all(), 2);
        assert!(registry.is_empty());
        assert!(rx_a.try_recv().unwrap().is_cancelled());
        assert!(rx_b.try_recv().unwrap().is_cancelled());
    }
}
