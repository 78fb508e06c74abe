pub mod affinity;
pub mod context;
pub mod error;
pub mod inventory;
pub mod launch;
pub mod listener;
pub mod metrics;
pub mod orchestrator;
pub mod pool;
pub mod probe;
pub mod provisioner;
pub mod queue;
pub mod retention;
pub mod supervisor;
pub mod worker;

pub use affinity::AffinityRegistry;
pub use context::ProvisionContext;
pub use error::CoreError;
pub use listener::{Admission, AdmissionListener, SkipReason};
pub use metrics::{MetricsBackend, MetricsHandle, NoOpMetrics, ProvisionOutcome};
pub use provisioner::{Provisioner, ProvisionerBuilder};
pub use supervisor::{ConnectionSupervisor, HandshakeError};

pub mod prelude {
    pub use crate::error::CoreError;
    pub use crate::inventory::{InventoryError, InventoryHandle, MemoryInventory, NodeInventory};
    pub use crate::launch::{LaunchError, LaunchRequest, LaunchedWorker, Launcher, LauncherHandle};
    pub use crate::listener::{Admission, AdmissionListener, SkipReason};
    pub use crate::orchestrator::{CancelReason, Orchestrator, ProvisionError, ProvisionRequest};
    pub use crate::probe::{ConnectivityProbe, ProbeHandle};
    pub use crate::provisioner::Provisioner;
    pub use crate::queue::{AdmissionQueue, MemoryQueue, QueueError, QueueHandle};
    pub use crate::retention::{RetentionDecision, RetentionPolicy, TaskResult, TeardownReason};
    pub use crate::supervisor::{ConnectionSupervisor, HandshakeError};
    pub use crate::worker::{WorkerHandle, WorkerRef};
}
