//! Committed-record storage shared across a builder, its nested children,
//! and queued tasks.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;

use crate::record::Record;

/// Shared cell holding the committed record.
///
/// Snapshots taken via [`load`](StateCell::load) are cheap `Arc` clones. In
/// mutable mode a commit updates the record behind the lock, cloning only
/// when an earlier snapshot is still held, so a held snapshot never observes
/// later writes. In immutable mode every commit swaps in a fresh allocation,
/// so the snapshot pointer identity changes on each committed write.
///
/// Clones of the cell share the same slot; the root cell handed to nested
/// children is exactly such a clone.
#[derive(Clone)]
pub(crate) struct StateCell {
    slot: Arc<Mutex<Arc<Record>>>,
}

impl StateCell {
    pub(crate) fn new(record: Record) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Arc::new(record))),
        }
    }

    /// Snapshot of the committed record.
    pub(crate) fn load(&self) -> Arc<Record> {
        Arc::clone(&self.lock())
    }

    /// Commit a single resolved field write.
    pub(crate) fn commit_field(&self, field: &str, value: Value, immutable: bool) {
        let mut slot = self.lock();
        if immutable {
            let mut copy = slot.as_ref().clone();
            copy.insert(field, value);
            *slot = Arc::new(copy);
        } else {
            Arc::make_mut(&mut *slot).insert(field, value);
        }
    }

    /// Replace the whole record under the same copy policy as a field write.
    pub(crate) fn replace(&self, record: Record, immutable: bool) {
        let mut slot = self.lock();
        if immutable {
            *slot = Arc::new(record);
        } else {
            *Arc::make_mut(&mut *slot) = record;
        }
    }

    fn lock(&self) -> MutexGuard<'_, Arc<Record>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
