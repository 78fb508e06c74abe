//! Connection supervisor: starts a worker's backing process and owns the
//! `Pending -> Online` transition.
mod error;
pub use error::HandshakeError;

use tracing::{debug, info, instrument, warn};

use solo_model::ConnectionState;

use crate::{
    context::ProvisionContext,
    inventory::InventoryHandle,
    launch::{LaunchError, LaunchRequest, LauncherHandle},
    probe::ProbeHandle,
    worker::{WorkerHandle, WorkerRef},
};

pub struct ConnectionSupervisor {
    launcher: LauncherHandle,
    probe: Option<ProbeHandle>,
    inventory: InventoryHandle,
    ctx: ProvisionContext,
    controller_url: String,
}

impl ConnectionSupervisor {
    pub fn new(
        launcher: LauncherHandle,
        probe: Option<ProbeHandle>,
        inventory: InventoryHandle,
        ctx: ProvisionContext,
        controller_url: impl Into<String>,
    ) -> Self {
        Self {
            launcher,
            probe,
            inventory,
            ctx,
            controller_url: controller_url.into(),
        }
    }

    pub fn launcher_name(&self) -> &'static str {
        self.launcher.name()
    }

    /// Start the backing process for `worker`.
    ///
    /// Launch failures are returned to the caller; nothing is retried here.
    #[instrument(level = "debug", skip_all, fields(worker = %worker.name(), launcher = self.launcher.name()))]
    pub async fn start(&self, worker: &WorkerHandle) -> Result<(), LaunchError> {
        let req = LaunchRequest::for_worker(worker, &self.controller_url, self.ctx.env());
        let backing = self.launcher.launch(&req).await?;
        debug!(backing = backing.id(), "backing process started");
        worker.attach_backing(backing);
        Ok(())
    }

    /// Worker-facing entry point: the worker identifies itself and is marked online.
    #[instrument(level = "debug", skip(self, secret))]
    pub fn handshake(&self, name: &str, secret: &str) -> Result<WorkerRef, HandshakeError> {
        let worker = self
            .inventory
            .get(name)
            .ok_or_else(|| HandshakeError::UnknownWorker(name.to_string()))?;

        if worker.secret() != secret {
            warn!(worker = name, "handshake with bad secret");
            return Err(HandshakeError::BadSecret(name.to_string()));
        }

        worker
            .connection()
            .mark_online()
            .map_err(|e| HandshakeError::NotPending {
                worker: name.to_string(),
                state: e.from,
            })?;
        info!(worker = name, label = %worker.label(), "worker online");
        Ok(worker)
    }

    /// One liveness check while waiting for the worker to connect.
    ///
    /// Asks the probe (if any), then fails if the backing process already exited.
    pub async fn poll(&self, worker: &WorkerHandle) -> Result<ConnectionState, LaunchError> {
        let state = worker.state();
        if state != ConnectionState::Pending {
            return Ok(state);
        }

        if let Some(probe) = &self.probe {
            if probe.is_online(worker).await {
                return match worker.connection().mark_online() {
                    Ok(()) => {
                        info!(worker = worker.name(), label = %worker.label(), "worker online (probe)");
                        Ok(ConnectionState::Online)
                    }
                    Err(e) => Ok(e.from),
                };
            }
        }

        if worker.backing_running() == Some(false) {
            return Err(LaunchError::Exited {
                code: worker.backing_exit_code(),
            });
        }
        Ok(ConnectionState::Pending)
    }
}
