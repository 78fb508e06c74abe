//! Wiring of the provisioning loop behind one handle.
use std::{sync::Arc, time::Duration};

use tokio::runtime::Handle;
use tracing::info;

use solo_model::ProvisionConfig;

use crate::{
    affinity::AffinityRegistry,
    context::ProvisionContext,
    error::CoreError,
    inventory::{InventoryHandle, MemoryInventory},
    launch::LauncherHandle,
    listener::AdmissionListener,
    orchestrator::Orchestrator,
    pool::ProvisionPool,
    probe::ProbeHandle,
    queue::QueueHandle,
    retention::{Reaper, RetentionManager},
    supervisor::ConnectionSupervisor,
};

pub struct ProvisionerBuilder {
    cfg: ProvisionConfig,
    inventory: Option<InventoryHandle>,
    queue: Option<QueueHandle>,
    launcher: Option<LauncherHandle>,
    probe: Option<ProbeHandle>,
    ctx: ProvisionContext,
}

impl ProvisionerBuilder {
    /// Defaults to a fresh [`MemoryInventory`].
    pub fn with_inventory(mut self, inventory: InventoryHandle) -> Self {
        self.inventory = Some(inventory);
        self
    }

    pub fn with_queue(mut self, queue: QueueHandle) -> Self {
        self.queue = Some(queue);
        self
    }

    pub fn with_launcher(mut self, launcher: LauncherHandle) -> Self {
        self.launcher = Some(launcher);
        self
    }

    pub fn with_probe(mut self, probe: ProbeHandle) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn with_context(mut self, ctx: ProvisionContext) -> Self {
        self.ctx = ctx;
        self
    }

    /// Validate the config and wire the components; units run on `rt`.
    pub fn build(self, rt: Handle) -> Result<Provisioner, CoreError> {
        self.cfg.validate()?;

        let queue = self.queue.ok_or(CoreError::MissingComponent("queue"))?;
        let launcher = self
            .launcher
            .ok_or(CoreError::MissingComponent("launcher"))?;
        let inventory = self
            .inventory
            .unwrap_or_else(|| Arc::new(MemoryInventory::new()));

        let cfg = Arc::new(self.cfg);
        let ctx = self.ctx;
        let affinity = AffinityRegistry::new();
        let pool = Arc::new(ProvisionPool::new(rt));

        let reaper = Reaper::new(
            Arc::clone(&inventory),
            affinity.clone(),
            ctx.metrics().clone(),
        );
        let supervisor = Arc::new(ConnectionSupervisor::new(
            launcher,
            self.probe,
            Arc::clone(&inventory),
            ctx.clone(),
            cfg.controller_url.as_str(),
        ));
        let orchestrator = Orchestrator::new(
            Arc::clone(&cfg),
            Arc::clone(&inventory),
            Arc::clone(&queue),
            Arc::clone(&supervisor),
            reaper.clone(),
            ctx.clone(),
        );
        let retention = RetentionManager::new(
            Arc::clone(&cfg),
            Arc::clone(&inventory),
            Arc::clone(&queue),
            reaper,
        );
        let listener = AdmissionListener::new(
            Arc::clone(&cfg),
            queue,
            affinity.clone(),
            Arc::clone(&pool),
            orchestrator,
            ctx,
        );

        info!(
            labels = %cfg.labels,
            launcher = supervisor.launcher_name(),
            on_failure = ?cfg.on_failure,
            "provisioner ready"
        );
        Ok(Provisioner {
            cfg,
            listener,
            supervisor,
            retention,
            inventory,
            affinity,
            pool,
        })
    }
}

/// Admission-triggered provisioning of single-use workers.
pub struct Provisioner {
    cfg: Arc<ProvisionConfig>,
    listener: AdmissionListener,
    supervisor: Arc<ConnectionSupervisor>,
    retention: RetentionManager,
    inventory: InventoryHandle,
    affinity: AffinityRegistry,
    pool: Arc<ProvisionPool>,
}

impl Provisioner {
    pub fn builder(cfg: ProvisionConfig) -> ProvisionerBuilder {
        ProvisionerBuilder {
            cfg,
            inventory: None,
            queue: None,
            launcher: None,
            probe: None,
            ctx: ProvisionContext::default(),
        }
    }

    pub fn config(&self) -> &ProvisionConfig {
        &self.cfg
    }

    pub fn listener(&self) -> &AdmissionListener {
        &self.listener
    }

    pub fn supervisor(&self) -> &ConnectionSupervisor {
        &self.supervisor
    }

    pub fn retention(&self) -> &RetentionManager {
        &self.retention
    }

    pub fn inventory(&self) -> &InventoryHandle {
        &self.inventory
    }

    pub fn affinity(&self) -> &AffinityRegistry {
        &self.affinity
    }

    /// Provisioning units still running.
    pub fn in_flight(&self) -> usize {
        self.pool.in_flight()
    }

    /// Stop provisioning and tear down every worker.
    ///
    /// Workers are reaped even when the grace period is exceeded; the error is returned afterwards.
    pub async fn shutdown(&self, grace: Duration) -> Result<usize, CoreError> {
        let drained = self.pool.shutdown(grace).await;
        let reaped = self.retention.shutdown().await;
        info!(reaped, "provisioner stopped");
        drained.map(|()| reaped)
    }
}
