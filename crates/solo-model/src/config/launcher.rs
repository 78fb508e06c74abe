use serde::{Deserialize, Serialize};

use crate::{
    Env,
    error::{ModelError, ModelResult},
};

pub const DEFAULT_DOCKER_BINARY: &str = "docker";
pub const DEFAULT_IMAGE: &str = "eclipse-temurin:21-jre";

/// Bootstrap run inside the container: fetch the agent from the controller and start it.
pub const DEFAULT_BOOTSTRAP_COMMAND: &str =
    "curl {controller}/agent.jar -o agent.jar; java -jar agent.jar";

/// Backing runtime used to start ephemeral workers.
///
/// `command`, `args` and `env` values are templates; the placeholders
/// `{controller}`, `{worker}`, `{label}`, `{secret}` and `{remote_fs}` are substituted at launch.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum LauncherSpec {
    /// Run a local process.
    Subprocess {
        command: String,

        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        args: Vec<String>,

        #[serde(default, skip_serializing_if = "Env::is_empty")]
        env: Env,
    },
    /// `docker run -i --rm` a short-lived container.
    #[serde(rename_all = "camelCase")]
    Docker {
        image: String,

        /// Docker CLI to invoke (e.g., "docker", "podman").
        #[serde(default = "default_docker_binary")]
        binary: String,

        /// Extra arguments placed before the image.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        run_args: Vec<String>,

        #[serde(default, skip_serializing_if = "Env::is_empty")]
        env: Env,

        /// Shell command run with `sh -c` inside the container.
        #[serde(default = "default_bootstrap_command")]
        command: String,
    },
}

fn default_docker_binary() -> String {
    DEFAULT_DOCKER_BINARY.to_string()
}

fn default_bootstrap_command() -> String {
    DEFAULT_BOOTSTRAP_COMMAND.to_string()
}

impl LauncherSpec {
    /// Returns the launcher type as a static string.
    pub fn kind(&self) -> &'static str {
        match self {
            LauncherSpec::Subprocess { .. } => "subprocess",
            LauncherSpec::Docker { .. } => "docker",
        }
    }

    pub fn validate(&self) -> ModelResult<()> {
        let blank = |s: &str| s.trim().is_empty();
        match self {
            LauncherSpec::Subprocess { command, .. } if blank(command) => Err(
                ModelError::InvalidConfig("subprocess launcher: empty command".into()),
            ),
            LauncherSpec::Docker { image, .. } if blank(image) => Err(ModelError::InvalidConfig(
                "docker launcher: empty image".into(),
            )),
            LauncherSpec::Docker { binary, .. } if blank(binary) => Err(
                ModelError::InvalidConfig("docker launcher: empty binary".into()),
            ),
            LauncherSpec::Docker { command, .. } if blank(command) => Err(
                ModelError::InvalidConfig("docker launcher: empty command".into()),
            ),
            _ => Ok(()),
        }
    }
}

impl Default for LauncherSpec {
    fn default() -> Self {
        LauncherSpec::Docker {
            image: DEFAULT_IMAGE.to_string(),
            binary: default_docker_binary(),
            run_args: Vec::new(),
            env: Env::default(),
            command: default_bootstrap_command(),
        }
    }
}
