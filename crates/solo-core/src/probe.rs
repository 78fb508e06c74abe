use std::sync::Arc;

use async_trait::async_trait;

use crate::worker::WorkerHandle;

/// Asks the worker transport whether a worker is connected.
///
/// Only needed for transports that cannot call [`crate::ConnectionSupervisor::handshake`].
#[async_trait]
pub trait ConnectivityProbe: Send + Sync + 'static {
    async fn is_online(&self, worker: &WorkerHandle) -> bool;
}

pub type ProbeHandle = Arc<dyn ConnectivityProbe>;
