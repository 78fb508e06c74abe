use tracing::{debug, info, warn};

use solo_model::AffinityLabel;

use crate::{
    affinity::AffinityRegistry, inventory::InventoryHandle, launch::LaunchedWorker,
    metrics::MetricsHandle, retention::TeardownReason,
    worker::{TransitionError, WorkerHandle},
};

/// Tears a worker down: terminate, release backing, deregister, free the label.
#[derive(Clone)]
pub struct Reaper {
    inventory: InventoryHandle,
    affinity: AffinityRegistry,
    metrics: MetricsHandle,
}

impl Reaper {
    pub fn new(inventory: InventoryHandle, affinity: AffinityRegistry, metrics: MetricsHandle) -> Self {
        Self {
            inventory,
            affinity,
            metrics,
        }
    }

    /// Free a label whose worker never made it into the inventory.
    pub fn release_label(&self, label: &AffinityLabel) -> bool {
        self.affinity.release(label)
    }

    /// Returns `false` if the worker was already terminated.
    pub async fn reap(&self, worker: &WorkerHandle, reason: TeardownReason) -> bool {
        let Ok(backing) = self.retire(worker, reason) else {
            return false;
        };

        if let Some(backing) = backing {
            let id = backing.id().to_string();
            if let Err(e) = backing.release().await {
                warn!(worker = worker.name(), backing = %id, error = %e, "failed to release backing process");
            }
        }
        true
    }

    /// Synchronous part of [`Reaper::reap`]: terminate, deregister, free the label.
    ///
    /// Hands back the backing (if any) for the caller to release; fails if the worker
    /// was already terminated.
    pub fn retire(
        &self,
        worker: &WorkerHandle,
        reason: TeardownReason,
    ) -> Result<Option<Box<dyn LaunchedWorker>>, TransitionError> {
        let previous = worker.connection().terminate().inspect_err(|_| {
            debug!(worker = worker.name(), %reason, "worker already terminated");
        })?;

        let backing = worker.take_backing();
        self.inventory.deregister(worker.name());
        self.affinity.release(worker.label());
        self.metrics.record_teardown(reason.as_label());

        info!(
            worker = worker.name(),
            label = %worker.label(),
            %previous,
            %reason,
            "worker torn down"
        );
        Ok(backing)
    }
}
