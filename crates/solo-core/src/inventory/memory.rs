use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::trace;

use solo_model::AffinityLabel;

use crate::{
    inventory::{InventoryError, NodeInventory},
    worker::WorkerRef,
};

#[derive(Default)]
struct Inner {
    by_name: HashMap<String, WorkerRef>,
    by_label: HashMap<AffinityLabel, String>,
}

/// In-process inventory guarded by a single `RwLock`.
#[derive(Default)]
pub struct MemoryInventory {
    inner: RwLock<Inner>,
}

impl MemoryInventory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl NodeInventory for MemoryInventory {
    fn register(&self, worker: WorkerRef) -> Result<(), InventoryError> {
        let mut inner = self.inner.write();
        if inner.by_name.contains_key(worker.name()) {
            return Err(InventoryError::DuplicateName(worker.name().to_string()));
        }
        if inner.by_label.contains_key(worker.label()) {
            return Err(InventoryError::DuplicateLabel(worker.label().clone()));
        }
        inner
            .by_label
            .insert(worker.label().clone(), worker.name().to_string());
        inner.by_name.insert(worker.name().to_string(), worker);
        trace!(total = inner.by_name.len(), "worker registered");
        Ok(())
    }

    fn deregister(&self, name: &str) -> Option<WorkerRef> {
        let mut inner = self.inner.write();
        let worker = inner.by_name.remove(name)?;
        inner.by_label.remove(worker.label());
        Some(worker)
    }

    fn get(&self, name: &str) -> Option<WorkerRef> {
        self.inner.read().by_name.get(name).cloned()
    }

    fn find_by_label(&self, label: &AffinityLabel) -> Option<WorkerRef> {
        let inner = self.inner.read();
        inner
            .by_label
            .get(label)
            .and_then(|name| inner.by_name.get(name))
            .cloned()
    }

    fn list(&self) -> Vec<WorkerRef> {
        let mut out: Vec<_> = self.inner.read().by_name.values().cloned().collect();
        out.sort_by(|a, b| a.name().cmp(b.name()));
        out
    }

    fn len(&self) -> usize {
        self.inner.read().by_name.len()
    }
}
