//! # Event Fan-out
//!
//! Client-side delivery of native events to general-purpose consumers, in two
//! flavours:
//!
//! - **Listeners**: synchronous callbacks registered per [`EventKind`] through a
//!   [`ListenerRegistry`], removed with the returned [`ListenerHandle`].
//! - **EventBus**: a `tokio::sync::broadcast` channel of every routed
//!   [`NativeEvent`] for consumers that prefer a stream.
//!
//! Per-request correlation (trigger operations, purchase completion) is not done
//! here; the router in `core-service` hands events to those components first and
//! to this module second.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::events::{EventKind, ListenerRegistry};
//! use std::sync::Arc;
//!
//! let listeners = ListenerRegistry::new();
//! let handle = listeners.add(
//!     EventKind::FeatureAccessChanged,
//!     Arc::new(|event| println!("{}", event.description())),
//! );
//! // ...
//! handle.remove();
//! ```
//!
//! ## Error Handling
//!
//! Stream consumers see `RecvError::Lagged(n)` when they fall more than the bus
//! capacity behind, and `RecvError::Closed` once the client is dropped.

use bridge_traits::events::{NativeEvent, NativeEventName};
use bridge_traits::trigger::TriggerUpdate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

// ============================================================================
// Event Categories
// ============================================================================

/// Event category as seen by client consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
    TriggerUpdate,
    FeatureAccessChanged,
    PurchaseRequest,
    RestoreRequest,
    FlowPresented,
    FlowDismissed,
}

impl EventKind {
    /// The native event category backing this kind.
    pub fn native_name(&self) -> NativeEventName {
        match self {
            EventKind::TriggerUpdate => NativeEventName::TriggerUpdate,
            EventKind::FeatureAccessChanged => NativeEventName::FeatureAccessChanged,
            EventKind::PurchaseRequest => NativeEventName::PurchaseRequest,
            EventKind::RestoreRequest => NativeEventName::RestoreRequest,
            EventKind::FlowPresented => NativeEventName::FlowPresented,
            EventKind::FlowDismissed => NativeEventName::FlowDismissed,
        }
    }

    pub fn of(event: &NativeEvent) -> Self {
        match event {
            NativeEvent::TriggerUpdate(_) => EventKind::TriggerUpdate,
            NativeEvent::FeatureAccessChanged(_) => EventKind::FeatureAccessChanged,
            NativeEvent::PurchaseRequest(_) => EventKind::PurchaseRequest,
            NativeEvent::RestoreRequest(_) => EventKind::RestoreRequest,
            NativeEvent::FlowPresented(_) => EventKind::FlowPresented,
            NativeEvent::FlowDismissed(_) => EventKind::FlowDismissed,
        }
    }
}

/// Log level the router uses when an event of this shape arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

impl EventSeverity {
    pub fn of(event: &NativeEvent) -> Self {
        match event {
            NativeEvent::TriggerUpdate(payload) => match payload.update {
                TriggerUpdate::Error { .. } => EventSeverity::Warning,
                _ => EventSeverity::Debug,
            },
            NativeEvent::PurchaseRequest(_) | NativeEvent::RestoreRequest(_) => {
                EventSeverity::Info
            }
            _ => EventSeverity::Debug,
        }
    }
}

// ============================================================================
// Listener Registry
// ============================================================================

/// Synchronous listener for one event category. Must not block.
pub type EventListener = Arc<dyn Fn(&NativeEvent) + Send + Sync>;

#[derive(Default)]
struct ListenerTable {
    next_id: u64,
    listeners: HashMap<EventKind, Vec<(u64, EventListener)>>,
}

fn lock_table(table: &Mutex<ListenerTable>) -> MutexGuard<'_, ListenerTable> {
    table.lock().unwrap_or_else(PoisonError::into_inner)
}

/// General-purpose listeners keyed by [`EventKind`].
///
/// Listeners of one kind are invoked in registration order. The table lock is
/// never held while a listener runs, so listeners may add or remove listeners.
#[derive(Clone, Default)]
pub struct ListenerRegistry {
    table: Arc<Mutex<ListenerTable>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, kind: EventKind, listener: EventListener) -> ListenerHandle {
        let mut table = lock_table(&self.table);
        table.next_id += 1;
        let id = table.next_id;
        table.listeners.entry(kind).or_default().push((id, listener));

        ListenerHandle {
            kind,
            id,
            table: Arc::downgrade(&self.table),
        }
    }

    /// Deliver `event` to every listener of its kind. Returns how many ran.
    pub fn emit(&self, event: &NativeEvent) -> usize {
        let kind = EventKind::of(event);
        let snapshot: Vec<EventListener> = {
            let table = lock_table(&self.table);
            table
                .listeners
                .get(&kind)
                .map(|entries| entries.iter().map(|(_, l)| Arc::clone(l)).collect())
                .unwrap_or_default()
        };

        for listener in &snapshot {
            if catch_unwind(AssertUnwindSafe(|| listener(event))).is_err() {
                tracing::warn!(event = %event.name(), "Event listener panicked");
            }
        }
        snapshot.len()
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        lock_table(&self.table)
            .listeners
            .get(&kind)
            .map_or(0, Vec::len)
    }

    pub fn clear(&self) {
        lock_table(&self.table).listeners.clear();
    }
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let table = lock_table(&self.table);
        let counts: HashMap<EventKind, usize> = table
            .listeners
            .iter()
            .map(|(kind, entries)| (*kind, entries.len()))
            .collect();
        f.debug_struct("ListenerRegistry")
            .field("listeners", &counts)
            .finish()
    }
}

/// Registration of one listener. Dropping the handle keeps the listener.
#[must_use = "dropping the handle keeps the listener registered forever"]
#[derive(Debug, Clone)]
pub struct ListenerHandle {
    kind: EventKind,
    id: u64,
    table: Weak<Mutex<ListenerTable>>,
}

impl ListenerHandle {
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Detach this listener only. Safe to call more than once.
    pub fn remove(&self) {
        let Some(table) = self.table.upgrade() else {
            return;
        };
        let mut table = lock_table(&table);
        if let Some(entries) = table.listeners.get_mut(&self.kind) {
            entries.retain(|(id, _)| *id != self.id);
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Broadcast channel of every routed native event.
///
/// Multiple producers (clone the `EventBus`), multiple consumers (each
/// `subscribe()` creates a new receiver). Slow subscribers get
/// `RecvError::Lagged` instead of blocking the router.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<NativeEvent>,
}

impl EventBus {
    /// `capacity` is how far a stream consumer may fall behind before lagging.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Returns the number of streams that will see `event`; errors when there
    /// are none, which the router ignores.
    pub fn emit(&self, event: NativeEvent) -> Result<usize, SendError<NativeEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<NativeEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Filtered Streams
// ============================================================================

type EventFilter = Box<dyn Fn(&NativeEvent) -> bool + Send + Sync>;

/// A `broadcast::Receiver` with optional filtering.
///
/// ```ignore
/// use core_runtime::events::{EventBus, EventKind, EventStream};
///
/// let bus = EventBus::new(100);
/// let flows = EventStream::new(bus.subscribe())
///     .only(&[EventKind::FlowPresented, EventKind::FlowDismissed]);
/// ```
pub struct EventStream {
    receiver: Receiver<NativeEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<NativeEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only yield events matching `predicate`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&NativeEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    /// Only yield events of the given kinds.
    pub fn only(self, kinds: &[EventKind]) -> Self {
        let kinds = kinds.to_vec();
        self.filter(move |event| kinds.contains(&EventKind::of(event)))
    }

    fn accepts(&self, event: &NativeEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Next event accepted by the filter.
    ///
    /// # Errors
    ///
    /// `RecvError::Lagged(n)` if the subscriber fell behind by `n` events,
    /// `RecvError::Closed` if the bus was dropped.
    pub async fn recv(&mut self) -> Result<NativeEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Non-blocking [`recv`](Self::recv); `None` when nothing accepted is queued.
    pub fn try_recv(&mut self) -> Option<Result<NativeEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
