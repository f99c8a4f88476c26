//! Per-request trigger state.

use crate::update::{is_terminal, TerminalUpdate};
use bridge_traits::trigger::TriggerUpdate;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// Observer of every update a trigger receives.
pub type UpdateListener = Arc<dyn Fn(&TriggerUpdate) + Send + Sync>;

/// Outcome of handing one update to an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The operation had already finished; nothing ran.
    Ignored,
    /// Observers ran and the operation is still pending.
    Delivered,
    /// Observers ran (unless the update was replaced) and the operation finished.
    Finished,
}

/// Mutable record of one outstanding trigger.
///
/// Deliveries are serialized by the dispatch lock and observers run while it
/// is held, so no observer is called after the operation finished. The
/// `finished` and `cancel_requested` flags are only written under that lock
/// but can be read without it, which keeps [`is_finished`](Self::is_finished)
/// safe to call from inside an observer. Observers must not block.
pub struct OperationState {
    request_id: String,
    listeners: Mutex<Vec<(u64, UpdateListener)>>,
    next_listener_id: AtomicU64,
    finished: AtomicBool,
    cancel_requested: AtomicBool,
    dispatch: Mutex<Option<oneshot::Sender<TerminalUpdate>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl OperationState {
    pub(crate) fn new(request_id: String) -> (Arc<Self>, oneshot::Receiver<TerminalUpdate>) {
        let (tx, rx) = oneshot::channel();
        let state = Arc::new(Self {
            request_id,
            listeners: Mutex::new(Vec::new()),
            next_listener_id: AtomicU64::new(1),
            finished: AtomicBool::new(false),
            cancel_requested: AtomicBool::new(false),
            dispatch: Mutex::new(Some(tx)),
        });
        (state, rx)
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    /// `false` once the operation finished or a cancel began.
    pub fn is_startable(&self) -> bool {
        !self.is_finished() && !self.cancel_requested.load(Ordering::Acquire)
    }

    pub(crate) fn add_listener(&self, listener: UpdateListener) -> u64 {
        let id = self.next_listener_id.fetch_add(1, Ordering::Relaxed);
        lock(&self.listeners).push((id, listener));
        id
    }

    pub(crate) fn remove_listener(&self, id: u64) {
        lock(&self.listeners).retain(|(listener_id, _)| *listener_id != id);
    }

    pub(crate) fn listener_count(&self) -> usize {
        lock(&self.listeners).len()
    }

    /// Marks a cancel as in progress. Returns `false` when the operation is
    /// already finished or another cancel got there first.
    pub(crate) fn begin_cancel(&self) -> bool {
        if self.is_finished() {
            return false;
        }
        !self.cancel_requested.swap(true, Ordering::AcqRel)
    }

    /// Route an update pushed by the native layer.
    ///
    /// Observers see the raw update first. The operation then finishes if the
    /// update has a terminal shape, or if the native side flagged it terminal;
    /// in the latter case with a non-terminal shape, `done` resolves with
    /// `invalid_terminal_update` instead of the native payload.
    pub(crate) fn deliver_native(&self, update: &TriggerUpdate, flagged_terminal: bool) -> Delivery {
        let mut resolver = lock(&self.dispatch);
        if self.is_finished() {
            return Delivery::Ignored;
        }

        self.notify(update);

        let shape_terminal = is_terminal(update);
        if !(flagged_terminal || shape_terminal) {
            return Delivery::Delivered;
        }

        let terminal = match TerminalUpdate::try_from(update.clone()) {
            Ok(terminal) => terminal,
            Err(err) => {
                warn!(
                    request_id = %self.request_id,
                    error = %err,
                    "Native update flagged terminal with a non-terminal shape"
                );
                TerminalUpdate::invalid_terminal()
            }
        };
        self.finish_locked(&mut resolver, terminal);
        Delivery::Finished
    }

    /// Deliver a locally synthesized terminal update to observers, then finish.
    pub(crate) fn deliver_local(&self, terminal: TerminalUpdate) -> Delivery {
        let mut resolver = lock(&self.dispatch);
        if self.is_finished() {
            return Delivery::Ignored;
        }

        self.notify(terminal.as_update());
        self.finish_locked(&mut resolver, terminal);
        Delivery::Finished
    }

    fn notify(&self, update: &TriggerUpdate) {
        let snapshot: Vec<UpdateListener> = lock(&self.listeners)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in snapshot {
            if catch_unwind(AssertUnwindSafe(|| listener(update))).is_err() {
                warn!(
                    request_id = %self.request_id,
                    kind = update.kind(),
                    "Trigger update listener panicked"
                );
            }
        }
    }

    fn finish_locked(
        &self,
        resolver: &mut Option<oneshot::Sender<TerminalUpdate>>,
        terminal: TerminalUpdate,
    ) {
        self.finished.store(true, Ordering::Release);
        lock(&self.listeners).clear();

        debug!(
            request_id = %self.request_id,
            kind = terminal.kind(),
            "Trigger finished"
        );
        if let Some(resolver) = resolver.take() {
            // The receiver is gone only when every `done` handle was dropped
            let _ = resolver.send(terminal);
        }
    }
}
