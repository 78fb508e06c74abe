//! Retention: when a used or failed worker is torn down.
mod policy;
pub use policy::{RetentionDecision, RetentionPolicy, TaskResult, TeardownReason};

mod reaper;
pub use reaper::Reaper;

use std::sync::Arc;

use tracing::{debug, instrument};

use solo_model::{ConnectionState, ProvisionConfig};

use crate::{
    error::CoreError,
    inventory::InventoryHandle,
    queue::{QueueHandle, release_failed},
};

/// Node lifecycle hooks the scheduler calls for provisioned workers.
#[derive(Clone)]
pub struct RetentionManager {
    cfg: Arc<ProvisionConfig>,
    inventory: InventoryHandle,
    queue: QueueHandle,
    reaper: Reaper,
}

impl RetentionManager {
    pub fn new(
        cfg: Arc<ProvisionConfig>,
        inventory: InventoryHandle,
        queue: QueueHandle,
        reaper: Reaper,
    ) -> Self {
        Self {
            cfg,
            inventory,
            queue,
            reaper,
        }
    }

    /// A task finished on `worker`; tears it down if its policy says so.
    #[instrument(level = "debug", skip(self))]
    pub async fn task_completed(
        &self,
        worker: &str,
        result: TaskResult,
    ) -> Result<RetentionDecision, CoreError> {
        let handle = self
            .inventory
            .get(worker)
            .ok_or_else(|| CoreError::UnknownWorker(worker.to_string()))?;

        let state = handle.state();
        if state != ConnectionState::Online {
            return Err(CoreError::WorkerNotOnline {
                worker: worker.to_string(),
                state,
            });
        }

        let completed = handle.record_completion();
        let decision = handle.retention().evaluate(completed);
        debug!(completed, ?decision, "retention evaluated");

        if decision == RetentionDecision::Terminate {
            self.reaper.reap(&handle, TeardownReason::Retention).await;
        }
        Ok(decision)
    }

    /// The transport lost the worker.
    ///
    /// A task still waiting for an online worker is bound to a label no worker will
    /// carry again, so it is released per `on_failure`. Before the worker is online its
    /// provisioning unit sees the teardown and releases the task itself.
    #[instrument(level = "debug", skip(self))]
    pub async fn worker_disconnected(&self, worker: &str) -> Result<(), CoreError> {
        let handle = self
            .inventory
            .get(worker)
            .ok_or_else(|| CoreError::UnknownWorker(worker.to_string()))?;
        let was_online = handle.is_online();
        self.reaper.reap(&handle, TeardownReason::Disconnected).await;

        if was_online && self.queue.is_pending(handle.item()) {
            let reason = format!("worker {} disconnected before the task ran", handle.name());
            release_failed(
                self.queue.as_ref(),
                &self.cfg,
                handle.item(),
                handle.requeues(),
                true,
                &reason,
            );
        }
        Ok(())
    }

    /// Tear down every registered worker; returns how many were reaped.
    pub async fn shutdown(&self) -> usize {
        let mut reaped = 0;
        for worker in self.inventory.list() {
            if self.reaper.reap(&worker, TeardownReason::Shutdown).await {
                reaped += 1;
            }
        }
        reaped
    }

    pub fn reaper(&self) -> &Reaper {
        &self.reaper
    }
}
