use std::{
    collections::BTreeMap,
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use solo_model::{BuildableItem, LabelBinding, LabelExpr, QueueItemId};

use crate::queue::{AdmissionQueue, QueueError};

/// Lifecycle of an entry in [`MemoryQueue`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryState {
    /// Waiting for a worker.
    Pending,
    /// Finished on a worker.
    Completed { success: bool },
    /// Failed explicitly.
    Cancelled { reason: String },
}

impl fmt::Display for EntryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryState::Pending => f.write_str("pending"),
            EntryState::Completed { success: true } => f.write_str("succeeded"),
            EntryState::Completed { success: false } => f.write_str("failed"),
            EntryState::Cancelled { .. } => f.write_str("cancelled"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    pub item: BuildableItem,
    pub state: EntryState,
    /// Reason given by the last requeue or cancel.
    pub last_reason: Option<String>,
}

/// In-process admission queue.
///
/// Requeued items are published on an optional channel so a driver can feed them back to the listener.
pub struct MemoryQueue {
    entries: RwLock<BTreeMap<QueueItemId, QueueEntry>>,
    next_id: AtomicU64,
    requeued: Option<mpsc::UnboundedSender<BuildableItem>>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
            requeued: None,
        }
    }

    /// Queue plus the receiving end of its requeue channel.
    pub fn with_requeue_channel() -> (Self, mpsc::UnboundedReceiver<BuildableItem>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut queue = Self::new();
        queue.requeued = Some(tx);
        (queue, rx)
    }

    /// Enqueue a new pending task.
    pub fn push(&self, task: impl Into<String>, label: Option<LabelExpr>) -> BuildableItem {
        let id = QueueItemId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let item = BuildableItem::new(id, task, label);
        self.entries.write().insert(
            id,
            QueueEntry {
                item: item.clone(),
                state: EntryState::Pending,
                last_reason: None,
            },
        );
        item
    }

    pub fn get(&self, id: QueueItemId) -> Option<QueueEntry> {
        self.entries.read().get(&id).cloned()
    }

    /// Drop an entry entirely, as if the scheduler forgot it.
    pub fn remove(&self, id: QueueItemId) -> Option<QueueEntry> {
        self.entries.write().remove(&id)
    }

    /// Record the outcome of a task that ran on a worker.
    pub fn complete(&self, id: QueueItemId, success: bool) -> Result<(), QueueError> {
        self.with_pending(id, |entry| {
            entry.state = EntryState::Completed { success };
        })
    }

    pub fn list(&self) -> Vec<QueueEntry> {
        self.entries.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    fn with_pending<R>(
        &self,
        id: QueueItemId,
        f: impl FnOnce(&mut QueueEntry) -> R,
    ) -> Result<R, QueueError> {
        let mut entries = self.entries.write();
        let entry = entries.get_mut(&id).ok_or(QueueError::NotFound(id))?;
        if entry.state != EntryState::Pending {
            return Err(QueueError::NotPending {
                item: id,
                state: entry.state.to_string(),
            });
        }
        Ok(f(entry))
    }
}

impl Default for MemoryQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl AdmissionQueue for MemoryQueue {
    fn bind(&self, id: QueueItemId, binding: LabelBinding) -> Result<(), QueueError> {
        self.with_pending(id, |entry| match &entry.item.binding {
            Some(existing) => Err(QueueError::AlreadyBound {
                item: id,
                label: existing.label().clone(),
            }),
            None => {
                entry.item.binding = Some(binding);
                Ok(())
            }
        })?
    }

    fn is_pending(&self, id: QueueItemId) -> bool {
        self.entries
            .read()
            .get(&id)
            .is_some_and(|e| e.state == EntryState::Pending)
    }

    fn requeue(&self, id: QueueItemId, reason: &str) -> Result<(), QueueError> {
        let item = self.with_pending(id, |entry| {
            entry.item.binding = None;
            entry.item.requeues += 1;
            entry.last_reason = Some(reason.to_string());
            entry.item.clone()
        })?;
        debug!(item = %id, requeues = item.requeues, reason, "item requeued");

        if let Some(tx) = &self.requeued {
            if tx.send(item).is_err() {
                warn!(item = %id, "requeue channel closed; item stays pending without a binding");
            }
        }
        Ok(())
    }

    fn cancel(&self, id: QueueItemId, reason: &str) -> Result<(), QueueError> {
        self.with_pending(id, |entry| {
            entry.state = EntryState::Cancelled {
                reason: reason.to_string(),
            };
            entry.last_reason = Some(reason.to_string());
        })?;
        debug!(item = %id, reason, "item cancelled");
        Ok(())
    }
}
