//! Admission queue contract consumed by the listener and the orchestrator.
//!
//! Methods are synchronous so the listener can call them on the admission thread.
mod memory;
pub use memory::{EntryState, MemoryQueue, QueueEntry};

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use solo_model::{AffinityLabel, FailureAction, LabelBinding, ProvisionConfig, QueueItemId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error("queue item {0} not found")]
    NotFound(QueueItemId),

    #[error("queue item {item} is already bound to '{label}'")]
    AlreadyBound {
        item: QueueItemId,
        label: AffinityLabel,
    },

    #[error("queue item {item} is not pending ({state})")]
    NotPending { item: QueueItemId, state: String },
}

pub trait AdmissionQueue: Send + Sync + 'static {
    /// Attach a label binding to a pending item.
    fn bind(&self, item: QueueItemId, binding: LabelBinding) -> Result<(), QueueError>;

    /// Returns `true` while the item still waits in the queue.
    fn is_pending(&self, item: QueueItemId) -> bool;

    /// Drop the binding and send the item back through admission.
    fn requeue(&self, item: QueueItemId, reason: &str) -> Result<(), QueueError>;

    /// Fail the item explicitly.
    fn cancel(&self, item: QueueItemId, reason: &str) -> Result<(), QueueError>;
}

/// Shared handle to an admission queue.
pub type QueueHandle = Arc<dyn AdmissionQueue>;

/// Release an item whose worker failed, per the configured `on_failure` action.
///
/// Requeues only while the item is under `max_requeues` and `retryable` holds; cancels otherwise.
pub(crate) fn release_failed(
    queue: &dyn AdmissionQueue,
    cfg: &ProvisionConfig,
    item: QueueItemId,
    requeues: u32,
    retryable: bool,
    reason: &str,
) {
    let requeue =
        retryable && cfg.on_failure == FailureAction::Requeue && requeues < cfg.max_requeues;

    let (action, result) = if requeue {
        ("requeued", queue.requeue(item, reason))
    } else {
        ("cancelled", queue.cancel(item, reason))
    };
    match result {
        Ok(()) => info!(%item, action, requeues, "task released"),
        Err(e) => warn!(%item, action, error = %e, "could not release task"),
    }
}
