//! Operation failure log.
//!
//! The observability sink the coordinators report gateway and catalog
//! failures to. It is an observable store itself, so a UI can surface a
//! notification when a delete or import did not complete.

use chrono::{DateTime, Utc};
use parley_core::error::ParleyError;
use parley_core::store::{NotificationGate, Store, StoreReader};
use serde::Serialize;

/// One operation that did not complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationFailure {
    pub timestamp: DateTime<Utc>,
    /// Operation name, e.g. `delete_conversation`.
    pub operation: String,
    /// The entity the operation targeted.
    pub target: String,
    pub message: String,
}

/// Bounded FIFO of [`OperationFailure`]s.
pub struct FailureLog {
    entries: Store<Vec<OperationFailure>>,
    capacity: usize,
}

impl FailureLog {
    pub fn new(capacity: usize, gate: &NotificationGate) -> Self {
        Self {
            entries: Store::new("operation_failures", Vec::new(), gate),
            capacity: capacity.max(1),
        }
    }

    /// Appends a failure, evicting the oldest entries past capacity.
    pub fn record(&self, operation: &str, target: &str, error: &ParleyError) {
        let entry = OperationFailure {
            timestamp: Utc::now(),
            operation: operation.to_string(),
            target: target.to_string(),
            message: error.to_string(),
        };
        let capacity = self.capacity;
        self.entries.update(|entries| {
            entries.push(entry);
            if entries.len() > capacity {
                let overflow = entries.len() - capacity;
                entries.drain(..overflow);
            }
        });
    }

    pub fn entries(&self) -> Vec<OperationFailure> {
        self.entries.get()
    }

    pub fn latest(&self) -> Option<OperationFailure> {
        self.entries.with(|entries| entries.last().cloned())
    }

    pub fn len(&self) -> usize {
        self.entries.with(Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.set(Vec::new());
    }

    pub fn reader(&self) -> StoreReader<Vec<OperationFailure>> {
        self.entries.reader()
    }
}
