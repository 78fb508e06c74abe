mod kv;
pub use kv::KeyValue;

mod env;
pub use env::Env;

mod constants;
pub use constants::{
    AFFINITY_SEPARATOR, CONTAINER_AFFINITY_LABEL, ENV_CONTROLLER_URL, ENV_REMOTE_FS,
    ENV_WORKER_LABEL, ENV_WORKER_NAME, ENV_WORKER_SECRET,
};

/// Timeout value in milliseconds.
///
/// Used in provisioning configuration where an explicit time limit is required.
pub type TimeoutMs = u64;
