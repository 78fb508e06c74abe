//! Test doubles for the provisioning loop.
mod launcher;
pub use launcher::{FakeLauncher, Script};

mod probe;
pub use probe::StaticProbe;

mod inventory;
pub use inventory::ConflictingInventory;

mod metrics;
pub use metrics::RecordingMetrics;

mod connect;
pub use connect::auto_connect;
