//! Backing runtimes for ephemeral workers.
mod error;
pub use error::ExecError;

mod metrics;
pub use metrics::{LAUNCHER_TYPE_DOCKER, LAUNCHER_TYPE_SUBPROCESS};

#[cfg(feature = "subprocess")]
pub mod subprocess;

#[cfg(feature = "docker")]
pub mod docker;

use std::sync::Arc;

use solo_core::launch::LauncherHandle;
use solo_model::LauncherSpec;

/// Build the launcher described by `spec`.
pub fn launcher_from_spec(spec: &LauncherSpec) -> Result<LauncherHandle, ExecError> {
    spec.validate()
        .map_err(|e| ExecError::InvalidSpec(e.to_string()))?;

    match spec {
        #[cfg(feature = "subprocess")]
        LauncherSpec::Subprocess { command, args, env } => Ok(Arc::new(
            subprocess::SubprocessLauncher::new(command.clone(), args.clone()).with_env(env.clone()),
        )),
        #[cfg(feature = "docker")]
        LauncherSpec::Docker {
            image,
            binary,
            run_args,
            env,
            command,
        } => Ok(Arc::new(
            docker::DockerLauncher::new(image.clone())
                .with_binary(binary.clone())
                .with_run_args(run_args.clone())
                .with_env(env.clone())
                .with_command(command.clone()),
        )),
        #[allow(unreachable_patterns)]
        other => Err(ExecError::Unsupported(other.kind())),
    }
}
