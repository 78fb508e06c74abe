//! Provisioning orchestrator: the background unit that turns an admitted task's
//! affinity label into an online worker, or cleans up and releases the task.
mod error;
pub use error::{CancelReason, ProvisionError};

use std::sync::Arc;

use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use solo_model::{AffinityLabel, ConnectionState, ProvisionConfig, QueueItemId};

use crate::{
    context::ProvisionContext,
    inventory::{InventoryError, InventoryHandle},
    metrics::ProvisionOutcome,
    queue::{QueueHandle, release_failed},
    retention::{Reaper, TeardownReason},
    supervisor::ConnectionSupervisor,
    worker::{WorkerHandle, WorkerRef, make_worker_name},
};

/// Input of one provisioning unit.
#[derive(Debug, Clone)]
pub struct ProvisionRequest {
    pub label: AffinityLabel,
    pub item: QueueItemId,
    /// Requeues the item already went through.
    pub requeues: u32,
    pub cancel: CancellationToken,
}

struct Failed {
    worker: Option<WorkerRef>,
    error: ProvisionError,
}

impl Failed {
    fn before_register(error: ProvisionError) -> Self {
        Self {
            worker: None,
            error,
        }
    }

    fn with(worker: &WorkerRef, error: impl Into<ProvisionError>) -> Self {
        Self {
            worker: Some(Arc::clone(worker)),
            error: error.into(),
        }
    }
}

#[derive(Clone)]
pub struct Orchestrator {
    cfg: Arc<ProvisionConfig>,
    inventory: InventoryHandle,
    queue: QueueHandle,
    supervisor: Arc<ConnectionSupervisor>,
    reaper: Reaper,
    ctx: ProvisionContext,
}

impl Orchestrator {
    pub fn new(
        cfg: Arc<ProvisionConfig>,
        inventory: InventoryHandle,
        queue: QueueHandle,
        supervisor: Arc<ConnectionSupervisor>,
        reaper: Reaper,
        ctx: ProvisionContext,
    ) -> Self {
        Self {
            cfg,
            inventory,
            queue,
            supervisor,
            reaper,
            ctx,
        }
    }

    pub fn reaper(&self) -> &Reaper {
        &self.reaper
    }

    /// Register and provision a worker for `req`, waiting until it is online.
    pub async fn run(&self, req: ProvisionRequest) -> Result<WorkerRef, ProvisionError> {
        let registered = self.register(&req);
        self.run_registered(req, registered).await
    }

    /// Continue after [`Orchestrator::register`] ran on the admission path.
    ///
    /// On failure the worker is torn down and the task requeued or cancelled before
    /// this returns; the error is only informational.
    #[instrument(name = "provision", skip_all, fields(item = %req.item, label = %req.label))]
    pub async fn run_registered(
        &self,
        req: ProvisionRequest,
        registered: Result<WorkerRef, ProvisionError>,
    ) -> Result<WorkerRef, ProvisionError> {
        let metrics = self.ctx.metrics();
        metrics.record_provision_started();
        let started = Instant::now();

        let result = match registered {
            Ok(worker) => self.provision(&req, worker).await,
            Err(error) => Err(Failed::before_register(error)),
        };
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(worker) => {
                metrics.record_provision_completed(ProvisionOutcome::Online, elapsed_ms);
                info!(worker = worker.name(), elapsed_ms, "worker ready");
                Ok(worker)
            }
            Err(Failed { worker, error }) => {
                metrics.record_provision_error(error.kind());
                metrics.record_provision_completed(error.outcome(), elapsed_ms);
                self.fail(&req, worker, &error).await;
                Err(error)
            }
        }
    }

    async fn provision(&self, req: &ProvisionRequest, worker: WorkerRef) -> Result<WorkerRef, Failed> {
        tokio::select! {
            res = self.supervisor.start(&worker) => {
                res.map_err(|e| Failed::with(&worker, e))?;
            }
            _ = req.cancel.cancelled() => {
                return Err(Failed::with(&worker, ProvisionError::Cancelled(CancelReason::Shutdown)));
            }
        }

        self.await_online(&worker, req)
            .await
            .map_err(|e| Failed::with(&worker, e))?;
        Ok(worker)
    }

    /// Register a fresh handle, re-minting the name on conflicts.
    ///
    /// Synchronous; the listener calls it so the worker is visible before admission returns.
    pub fn register(&self, req: &ProvisionRequest) -> Result<WorkerRef, ProvisionError> {
        let attempts = self.cfg.registration_attempts.max(1);
        let mut last = String::new();

        for attempt in 1..=attempts {
            let worker = Arc::new(WorkerHandle::new(
                make_worker_name(&req.label),
                req.label.clone(),
                req.item,
                self.cfg.remote_fs.as_str(),
            )
            .with_requeues(req.requeues));
            match self.inventory.register(Arc::clone(&worker)) {
                Ok(()) => {
                    debug!(worker = worker.name(), attempt, "worker registered");
                    return Ok(worker);
                }
                Err(InventoryError::DuplicateName(name)) => {
                    warn!(worker = %name, attempt, "worker name taken, retrying with a fresh one");
                    last = name;
                }
                Err(e) => return Err(ProvisionError::Inventory(e)),
            }
        }
        Err(ProvisionError::RegistrationConflict { attempts, last })
    }

    /// Suspend until the worker is online.
    ///
    /// Wakes on every state change; each poll tick also re-checks the probe, the
    /// backing process and the queue item. Bounded by the ready timeout and the token.
    async fn await_online(
        &self,
        worker: &WorkerHandle,
        req: &ProvisionRequest,
    ) -> Result<(), ProvisionError> {
        let timeout = self.cfg.ready_timeout();
        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);

        let mut tick = tokio::time::interval(self.cfg.poll_interval());
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut rx = worker.subscribe();
        loop {
            match *rx.borrow_and_update() {
                ConnectionState::Online => return Ok(()),
                ConnectionState::Terminated => return Err(ProvisionError::Terminated),
                ConnectionState::Pending => {}
            }

            tokio::select! {
                _ = req.cancel.cancelled() => {
                    return Err(ProvisionError::Cancelled(CancelReason::Shutdown));
                }
                _ = &mut deadline => {
                    return Err(ProvisionError::ReadyTimeout(timeout));
                }
                changed = rx.changed() => {
                    if changed.is_err() {
                        return Err(ProvisionError::Terminated);
                    }
                }
                _ = tick.tick() => {
                    if !self.queue.is_pending(req.item) {
                        return Err(ProvisionError::Cancelled(CancelReason::ItemGone));
                    }
                    self.supervisor.poll(worker).await?;
                    debug!(worker = worker.name(), "waiting for worker to connect");
                }
            }
        }
    }

    /// Cleanup path: tear down, then requeue or cancel the originating task.
    async fn fail(&self, req: &ProvisionRequest, worker: Option<WorkerRef>, error: &ProvisionError) {
        let launch_kind = error.launch_kind();
        if error.is_fatal() {
            error!(error_kind = error.kind(), launch_kind, error = %error, "provisioning invariant violated");
        } else {
            warn!(error_kind = error.kind(), launch_kind, error = %error, "provisioning failed");
        }

        match worker {
            Some(worker) => {
                self.reaper
                    .reap(&worker, TeardownReason::ProvisionFailed)
                    .await;
            }
            None => {
                self.reaper.release_label(&req.label);
            }
        }

        if matches!(error, ProvisionError::Cancelled(CancelReason::ItemGone)) {
            debug!("queue item gone, nothing to release");
            return;
        }

        let reason = format!("provisioning failed ({}): {error}", error.kind());
        release_failed(
            self.queue.as_ref(),
            &self.cfg,
            req.item,
            req.requeues,
            !matches!(error, ProvisionError::Cancelled(CancelReason::Shutdown)),
            &reason,
        );
    }
}
