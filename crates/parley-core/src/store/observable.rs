//! The observable store primitive.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};

use super::gate::{NotificationGate, PendingNotify};

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct StoreInner<T> {
    name: &'static str,
    value: RwLock<T>,
    subscribers: Mutex<Vec<(u64, Callback<T>)>>,
    next_subscriber_id: AtomicU64,
    dirty: AtomicBool,
    gate: NotificationGate,
}

impl<T: Clone + Send + Sync + 'static> StoreInner<T> {
    fn get(&self) -> T {
        self.value
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn subscribe(self: &Arc<Self>, callback: Callback<T>) -> Subscription {
        let id = self.next_subscriber_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, callback));

        let weak: Weak<Self> = Arc::downgrade(self);
        Subscription {
            store: self.name,
            cancel: Some(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner
                        .subscribers
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .retain(|(sub_id, _)| *sub_id != id);
                }
            })),
        }
    }

    fn notify(&self) {
        // Callbacks run without any store lock held so they may read or
        // write other stores.
        let callbacks: Vec<Callback<T>> = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, cb)| cb.clone())
            .collect();

        if callbacks.is_empty() {
            return;
        }

        let value = self.get();
        tracing::trace!(store = self.name, subscribers = callbacks.len(), "notify");
        for callback in callbacks {
            callback(&value);
        }
    }
}

impl<T: Clone + Send + Sync + 'static> PendingNotify for StoreInner<T> {
    fn mark_dirty(&self) -> bool {
        !self.dirty.swap(true, Ordering::AcqRel)
    }

    fn flush(&self) {
        self.dirty.store(false, Ordering::Release);
        self.notify();
    }
}

/// A named, independently subscribable unit of state.
///
/// `Store` is the writable handle. Hand out [`StoreReader`]s to anything that
/// only needs to observe the value; only the component that owns the store
/// should keep the `Store` itself.
pub struct Store<T> {
    inner: Arc<StoreInner<T>>,
}

impl<T: Clone + Send + Sync + 'static> Store<T> {
    /// Creates a store bound to `gate`.
    pub fn new(name: &'static str, initial: T, gate: &NotificationGate) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                name,
                value: RwLock::new(initial),
                subscribers: Mutex::new(Vec::new()),
                next_subscriber_id: AtomicU64::new(0),
                dirty: AtomicBool::new(false),
                gate: gate.clone(),
            }),
        }
    }

    /// Creates a store with a private gate.
    pub fn standalone(name: &'static str, initial: T) -> Self {
        Self::new(name, initial, &NotificationGate::new())
    }

    pub fn name(&self) -> &'static str {
        self.inner.name
    }

    /// Returns a clone of the current value.
    pub fn get(&self) -> T {
        self.inner.get()
    }

    /// Reads the current value without cloning it.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let value = self.inner.value.read().unwrap_or_else(PoisonError::into_inner);
        f(&value)
    }

    /// Replaces the value and notifies subscribers.
    pub fn set(&self, value: T) {
        {
            let mut guard = self.inner.value.write().unwrap_or_else(PoisonError::into_inner);
            *guard = value;
        }
        self.publish();
    }

    /// Mutates the value in place and notifies subscribers.
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let result = {
            let mut guard = self.inner.value.write().unwrap_or_else(PoisonError::into_inner);
            f(&mut guard)
        };
        self.publish();
        result
    }

    /// Registers `callback`; it is invoked with the new value after every
    /// change (once per batch when the change happens inside one).
    pub fn subscribe(&self, callback: impl Fn(&T) + Send + Sync + 'static) -> Subscription {
        self.inner.subscribe(Arc::new(callback))
    }

    /// Returns a read-only view of this store.
    pub fn reader(&self) -> StoreReader<T> {
        StoreReader {
            inner: self.inner.clone(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn publish(&self) {
        let pending: Arc<dyn PendingNotify> = self.inner.clone();
        if !self.inner.gate.defer(pending) {
            self.inner.notify();
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Store<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let value = self.inner.value.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("Store")
            .field("name", &self.inner.name)
            .field("value", &*value)
            .finish()
    }
}

/// Read-only view of a [`Store`]. Cheap to clone.
pub struct StoreReader<T> {
    inner: Arc<StoreInner<T>>,
}

impl<T: Clone + Send + Sync + 'static> StoreReader<T> {
    pub fn name(&self) -> &'static str {
        self.inner.name
    }

    pub fn get(&self) -> T {
        self.inner.get()
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let value = self.inner.value.read().unwrap_or_else(PoisonError::into_inner);
        f(&value)
    }

    pub fn subscribe(&self, callback: impl Fn(&T) + Send + Sync + 'static) -> Subscription {
        self.inner.subscribe(Arc::new(callback))
    }
}

impl<T> Clone for StoreReader<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

/// Handle returned by `subscribe`.
///
/// Dropping the handle keeps the subscription alive; call
/// [`Subscription::unsubscribe`] to remove it.
#[must_use = "keep the handle to be able to unsubscribe"]
pub struct Subscription {
    store: &'static str,
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    /// Name of the store this subscription belongs to.
    pub fn store(&self) -> &'static str {
        self.store
    }

    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("store", &self.store)
            .finish()
    }
}
