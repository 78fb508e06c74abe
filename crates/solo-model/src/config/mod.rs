mod failure;
pub use failure::FailureAction;

mod launcher;
pub use launcher::{DEFAULT_BOOTSTRAP_COMMAND, DEFAULT_DOCKER_BINARY, DEFAULT_IMAGE, LauncherSpec};

mod provision;
pub use provision::ProvisionConfig;
