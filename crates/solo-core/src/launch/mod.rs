//! Backing-runtime launch interface.
//!
//! A [`Launcher`] starts the process or container behind a worker and hands back a
//! [`LaunchedWorker`] the core keeps on the handle until teardown.
mod error;
pub use error::LaunchError;

mod request;
pub use request::LaunchRequest;

use std::sync::Arc;

use async_trait::async_trait;

#[async_trait]
pub trait Launcher: Send + Sync + 'static {
    /// Launcher name used in logs and metrics.
    fn name(&self) -> &'static str;

    /// Start the backing process. Must return once the process is started,
    /// not once the worker connects.
    async fn launch(&self, req: &LaunchRequest) -> Result<Box<dyn LaunchedWorker>, LaunchError>;
}

/// A started backing process or container.
#[async_trait]
pub trait LaunchedWorker: Send + Sync {
    /// Runtime identifier (pid, container name, ...).
    fn id(&self) -> &str;

    fn is_running(&self) -> bool;

    /// Exit code once the process has exited.
    fn exit_code(&self) -> Option<i32> {
        None
    }

    /// Stop the process and free its resources.
    async fn release(self: Box<Self>) -> Result<(), LaunchError>;
}

/// Shared handle to a launcher.
pub type LauncherHandle = Arc<dyn Launcher>;
