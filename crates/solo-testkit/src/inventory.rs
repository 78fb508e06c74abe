use std::sync::atomic::{AtomicU32, Ordering};

use solo_model::AffinityLabel;

use solo_core::{
    inventory::{InventoryError, MemoryInventory, NodeInventory},
    worker::WorkerRef,
};

/// Memory inventory that rejects the first `n` registrations as duplicate names.
pub struct ConflictingInventory {
    inner: MemoryInventory,
    conflicts: AtomicU32,
}

impl ConflictingInventory {
    pub fn new(conflicts: u32) -> Self {
        Self {
            inner: MemoryInventory::new(),
            conflicts: AtomicU32::new(conflicts),
        }
    }
}

impl NodeInventory for ConflictingInventory {
    fn register(&self, worker: WorkerRef) -> Result<(), InventoryError> {
        let left = self
            .conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if left.is_ok() {
            return Err(InventoryError::DuplicateName(worker.name().to_string()));
        }
        self.inner.register(worker)
    }

    fn deregister(&self, name: &str) -> Option<WorkerRef> {
        self.inner.deregister(name)
    }

    fn get(&self, name: &str) -> Option<WorkerRef> {
        self.inner.get(name)
    }

    fn find_by_label(&self, label: &AffinityLabel) -> Option<WorkerRef> {
        self.inner.find_by_label(label)
    }

    fn list(&self) -> Vec<WorkerRef> {
        self.inner.list()
    }

    fn len(&self) -> usize {
        self.inner.len()
    }
}
