//! Background pool for provisioning units.
//!
//! ```text
//! submit(fut) ──► tracker.spawn_on(fut, runtime)
//!                 each unit holds root.child_token()
//! shutdown(grace)
//!   └─► root.cancel()      → every unit abandons its wait
//!   └─► tracker.close()    → no new units
//!   └─► timeout(grace, tracker.wait())
//! ```
use std::{future::Future, time::Duration};

use tokio::runtime::Handle;
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{debug, warn};

use crate::error::CoreError;

pub struct ProvisionPool {
    tracker: TaskTracker,
    root: CancellationToken,
    rt: Handle,
}

impl ProvisionPool {
    pub fn new(rt: Handle) -> Self {
        Self {
            tracker: TaskTracker::new(),
            root: CancellationToken::new(),
            rt,
        }
    }

    /// Pool bound to the runtime of the calling task.
    pub fn current() -> Result<Self, CoreError> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|e| CoreError::NoRuntime(e.to_string()))
    }

    /// Token cancelled when the pool shuts down.
    pub fn child_token(&self) -> CancellationToken {
        self.root.child_token()
    }

    /// Spawn a unit without waiting for it. Safe to call from non-async threads.
    pub fn submit<F>(&self, unit: F) -> Result<(), CoreError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.tracker.is_closed() || self.root.is_cancelled() {
            return Err(CoreError::PoolClosed);
        }
        self.tracker.spawn_on(unit, &self.rt);
        Ok(())
    }

    /// Units still running.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    pub fn is_closed(&self) -> bool {
        self.tracker.is_closed()
    }

    /// Cancel every unit and wait up to `grace` for them to finish their cleanup.
    pub async fn shutdown(&self, grace: Duration) -> Result<(), CoreError> {
        self.root.cancel();
        self.tracker.close();
        debug!(in_flight = self.tracker.len(), ?grace, "provision pool shutting down");

        match tokio::time::timeout(grace, self.tracker.wait()).await {
            Ok(()) => Ok(()),
            Err(_) => {
                let stuck = self.tracker.len();
                warn!(stuck, ?grace, "provision pool grace exceeded");
                Err(CoreError::GraceExceeded { grace, stuck })
            }
        }
    }
}
