//! Well-known keys shared between the controller and the workers it launches.
//!
//! Keeping them here avoids scattering magic strings across launchers and the daemon.

/// Separator between the affinity prefix and the random part (`docker_3f2a...`).
pub const AFFINITY_SEPARATOR: char = '_';

/// Container label key carrying the affinity label of a launched worker.
///
/// Lets operators find (and clean up) every container started for a given task.
pub const CONTAINER_AFFINITY_LABEL: &str = "solo.affinity";

/// Environment variable with the URL a worker uses to connect back.
pub const ENV_CONTROLLER_URL: &str = "SOLO_CONTROLLER_URL";

/// Environment variable with the worker identity registered in the inventory.
pub const ENV_WORKER_NAME: &str = "SOLO_WORKER_NAME";

/// Environment variable with the affinity label of the worker.
pub const ENV_WORKER_LABEL: &str = "SOLO_WORKER_LABEL";

/// Environment variable with the per-worker handshake secret.
pub const ENV_WORKER_SECRET: &str = "SOLO_WORKER_SECRET";

/// Environment variable with the worker root directory.
pub const ENV_REMOTE_FS: &str = "SOLO_REMOTE_FS";
