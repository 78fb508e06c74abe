//! Admission listener: the entry point called once per task that becomes buildable.
use std::sync::Arc;

use tracing::{debug, info, instrument, trace, warn};

use solo_model::{AffinityLabel, BuildableItem, LabelBinding, ProvisionConfig};

use crate::{
    affinity::AffinityRegistry,
    context::ProvisionContext,
    error::CoreError,
    orchestrator::{Orchestrator, ProvisionRequest},
    pool::ProvisionPool,
    queue::QueueHandle,
    retention::TeardownReason,
};

/// Why a buildable item was left alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The task requests no label.
    NoLabel,
    /// The task's label does not match the provision-on-demand set.
    NotOnDemand,
    /// The task already carries an affinity binding.
    AlreadyBound,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::NoLabel => "no_label",
            SkipReason::NotOnDemand => "not_on_demand",
            SkipReason::AlreadyBound => "already_bound",
        }
    }
}

/// Result of [`AdmissionListener::on_buildable`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    Skipped(SkipReason),
    /// Binding attached and provisioning submitted in the background.
    Provisioning { label: AffinityLabel },
}

#[derive(Clone)]
pub struct AdmissionListener {
    cfg: Arc<ProvisionConfig>,
    queue: QueueHandle,
    affinity: AffinityRegistry,
    pool: Arc<ProvisionPool>,
    orchestrator: Orchestrator,
    ctx: ProvisionContext,
}

impl AdmissionListener {
    pub fn new(
        cfg: Arc<ProvisionConfig>,
        queue: QueueHandle,
        affinity: AffinityRegistry,
        pool: Arc<ProvisionPool>,
        orchestrator: Orchestrator,
        ctx: ProvisionContext,
    ) -> Self {
        Self {
            cfg,
            queue,
            affinity,
            pool,
            orchestrator,
            ctx,
        }
    }

    fn skip_reason(&self, item: &BuildableItem) -> Option<SkipReason> {
        if item.binding.is_some() {
            return Some(SkipReason::AlreadyBound);
        }
        match &item.label {
            None => Some(SkipReason::NoLabel),
            Some(expr) if !expr.matches(&self.cfg.labels) => Some(SkipReason::NotOnDemand),
            Some(_) => None,
        }
    }

    /// Handle a task entering the buildable state.
    ///
    /// Never blocks on provisioning: the binding is attached before returning and the
    /// worker is provisioned on the pool.
    #[instrument(level = "debug", skip_all, fields(item = %item.id, task = %item.task))]
    pub fn on_buildable(&self, item: &BuildableItem) -> Result<Admission, CoreError> {
        let metrics = self.ctx.metrics();

        if let Some(reason) = self.skip_reason(item) {
            trace!(reason = reason.as_str(), "item skipped");
            metrics.record_admission("skipped");
            return Ok(Admission::Skipped(reason));
        }

        let label = match self.affinity.mint(&self.cfg.label_prefix) {
            Ok(label) => label,
            Err(e) => {
                metrics.record_admission("rejected");
                return Err(e);
            }
        };

        if let Err(e) = self.queue.bind(item.id, LabelBinding::new(label.clone())) {
            self.affinity.release(&label);
            metrics.record_admission("rejected");
            warn!(error = %e, "failed to bind affinity label");
            return Err(e.into());
        }

        let req = ProvisionRequest {
            label: label.clone(),
            item: item.id,
            requeues: item.requeues,
            cancel: self.pool.child_token(),
        };

        // visible to the matcher before admission returns; failures are handled by the unit
        let registered = self.orchestrator.register(&req);
        let worker = registered.as_ref().ok().cloned();

        let orchestrator = self.orchestrator.clone();
        let submitted = self.pool.submit(async move {
            // the unit already logged the failure and released the task
            if let Err(e) = orchestrator.run_registered(req, registered).await {
                debug!(error_kind = e.kind(), "provisioning unit finished without a worker");
            }
        });

        if let Err(e) = submitted {
            let reaper = self.orchestrator.reaper();
            match worker {
                Some(worker) => {
                    if let Err(e) = reaper.retire(&worker, TeardownReason::Shutdown) {
                        debug!(error = %e, "worker already retired");
                    }
                }
                None => {
                    reaper.release_label(&label);
                }
            }
            if let Err(qe) = self.queue.cancel(item.id, "provisioner is shutting down") {
                warn!(error = %qe, "failed to cancel item after rejected submission");
            }
            metrics.record_admission("rejected");
            return Err(e);
        }

        metrics.record_admission("provisioning");
        info!(label = %label, requeues = item.requeues, "provisioning ephemeral worker");
        Ok(Admission::Provisioning { label })
    }
}
