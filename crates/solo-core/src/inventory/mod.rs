//! Node inventory contract: the scheduler-side registry of workers the matcher can see.
mod memory;
pub use memory::MemoryInventory;

use std::sync::Arc;

use thiserror::Error;

use solo_model::AffinityLabel;

use crate::worker::WorkerRef;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InventoryError {
    #[error("worker name '{0}' is already registered")]
    DuplicateName(String),

    #[error("affinity label '{0}' is already carried by a registered worker")]
    DuplicateLabel(AffinityLabel),
}

impl InventoryError {
    /// A duplicate name can be retried under a fresh name; a duplicate label cannot.
    pub fn is_retryable(&self) -> bool {
        matches!(self, InventoryError::DuplicateName(_))
    }
}

/// Registry of worker handles shared by concurrent provisioning units.
///
/// `register` must be atomic: a handle is either fully visible (by name and by label) or not at all.
pub trait NodeInventory: Send + Sync + 'static {
    fn register(&self, worker: WorkerRef) -> Result<(), InventoryError>;

    /// Remove a worker by name, returning it if it was registered.
    fn deregister(&self, name: &str) -> Option<WorkerRef>;

    fn get(&self, name: &str) -> Option<WorkerRef>;

    fn find_by_label(&self, label: &AffinityLabel) -> Option<WorkerRef>;

    fn list(&self) -> Vec<WorkerRef>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Shared handle to a node inventory.
pub type InventoryHandle = Arc<dyn NodeInventory>;
