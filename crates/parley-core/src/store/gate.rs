//! Batched notification delivery shared by a group of stores.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A store whose notification has been deferred until the end of a batch.
pub(crate) trait PendingNotify: Send + Sync {
    /// Marks the store dirty. Returns `true` the first time within a batch.
    fn mark_dirty(&self) -> bool;

    /// Clears the dirty mark and delivers the current value to subscribers.
    fn flush(&self);
}

#[derive(Default)]
struct GateState {
    depth: usize,
    pending: Vec<Arc<dyn PendingNotify>>,
}

/// Groups stores so that a multi-store mutation is observed as one step.
///
/// Every [`Store`](super::Store) is created against a gate. Outside a batch a
/// `set` notifies subscribers immediately. Inside [`NotificationGate::batch`]
/// notifications are queued and delivered once per dirty store after the
/// outermost batch returns, so subscribers only ever see the state before the
/// batch or the state after all of its mutations.
#[derive(Clone, Default)]
pub struct NotificationGate {
    state: Arc<Mutex<GateState>>,
}

impl NotificationGate {
    /// Creates a gate with no open batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` as one observable step.
    ///
    /// Batches nest; only the outermost one flushes. The flush also happens
    /// when `f` panics, so the gate never stays closed.
    pub fn batch<R>(&self, f: impl FnOnce() -> R) -> R {
        self.lock().depth += 1;
        let _guard = BatchGuard { gate: self };
        f()
    }

    /// Returns `true` while a batch is open.
    pub fn is_batching(&self) -> bool {
        self.lock().depth > 0
    }

    /// Queues `target` if a batch is open. Returns `false` when the caller
    /// must notify right away.
    pub(crate) fn defer(&self, target: Arc<dyn PendingNotify>) -> bool {
        let mut state = self.lock();
        if state.depth == 0 {
            return false;
        }
        if target.mark_dirty() {
            state.pending.push(target);
        }
        true
    }

    fn close(&self) {
        let pending = {
            let mut state = self.lock();
            state.depth = state.depth.saturating_sub(1);
            if state.depth > 0 {
                return;
            }
            std::mem::take(&mut state.pending)
        };

        for target in pending {
            target.flush();
        }
    }

    fn lock(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for NotificationGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("NotificationGate")
            .field("depth", &state.depth)
            .field("pending", &state.pending.len())
            .finish()
    }
}

struct BatchGuard<'a> {
    gate: &'a NotificationGate,
}

impl Drop for BatchGuard<'_> {
    fn drop(&mut self) {
        self.gate.close();
    }
}
