//! `docker run` launcher.
//!
//! Each worker becomes one `docker run -i --rm` invocation. The CLI process is
//! the backing process; releasing kills it and force-removes the container.
use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, instrument};

use solo_core::launch::{LaunchError, LaunchRequest, LaunchedWorker, Launcher};
use solo_model::{CONTAINER_AFFINITY_LABEL, DEFAULT_BOOTSTRAP_COMMAND, DEFAULT_DOCKER_BINARY, Env};

use crate::metrics::LAUNCHER_TYPE_DOCKER;
use crate::subprocess::{LogConfig, ProcessConfig, ProcessWorker};

/// Container name derived from a worker name.
///
/// Docker accepts `[a-zA-Z0-9][a-zA-Z0-9_.-]*`; anything else becomes `-`.
pub fn container_name(worker: &str) -> String {
    let mut name: String = worker
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
                c
            } else {
                '-'
            }
        })
        .collect();
    if !name.starts_with(|c: char| c.is_ascii_alphanumeric()) {
        name.insert_str(0, "solo");
    }
    name
}

#[derive(Debug, Clone)]
pub struct DockerLauncher {
    binary: String,
    image: String,
    run_args: Vec<String>,
    env: Env,
    command: String,
    log: LogConfig,
}

impl DockerLauncher {
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            binary: DEFAULT_DOCKER_BINARY.to_string(),
            image: image.into(),
            run_args: Vec::new(),
            env: Env::new(),
            command: DEFAULT_BOOTSTRAP_COMMAND.to_string(),
            log: LogConfig::default(),
        }
    }

    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn with_run_args(mut self, args: Vec<String>) -> Self {
        self.run_args = args;
        self
    }

    pub fn with_env(mut self, env: Env) -> Self {
        self.env = env;
        self
    }

    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = command.into();
        self
    }

    pub fn with_log_config(mut self, log: LogConfig) -> Self {
        self.log = log;
        self
    }

    /// Build the CLI invocation for one request.
    ///
    /// Variables are passed as `-e KEY` and set on the CLI process itself,
    /// so values such as the worker secret never show up in the argument list.
    pub fn process_config(&self, req: &LaunchRequest) -> ProcessConfig {
        let env = req.rendered_env(&self.env);
        let resolved = env.resolved();

        let mut args = vec![
            "run".to_string(),
            "-i".to_string(),
            "--rm".to_string(),
            "--name".to_string(),
            container_name(&req.worker),
            "--label".to_string(),
            format!("{CONTAINER_AFFINITY_LABEL}={}", req.label),
        ];
        args.extend(self.run_args.iter().map(|a| req.render(a)));
        for kv in &resolved {
            args.push("-e".to_string());
            args.push(kv.key().to_string());
        }
        args.push(self.image.clone());
        args.push("sh".to_string());
        args.push("-c".to_string());
        args.push(req.render(&self.command));

        ProcessConfig {
            worker: req.worker.clone(),
            command: self.binary.clone(),
            args,
            env,
        }
    }
}

#[async_trait]
impl Launcher for DockerLauncher {
    fn name(&self) -> &'static str {
        LAUNCHER_TYPE_DOCKER
    }

    #[instrument(level = "debug", skip_all, fields(worker = %req.worker, image = %self.image))]
    async fn launch(&self, req: &LaunchRequest) -> Result<Box<dyn LaunchedWorker>, LaunchError> {
        let cfg = self.process_config(req);
        let process = ProcessWorker::spawn(&cfg, self.log)?;
        Ok(Box::new(DockerWorker {
            container: container_name(&req.worker),
            binary: self.binary.clone(),
            process,
        }))
    }
}

/// Container started by [`DockerLauncher`].
pub struct DockerWorker {
    container: String,
    binary: String,
    process: ProcessWorker,
}

#[async_trait]
impl LaunchedWorker for DockerWorker {
    fn id(&self) -> &str {
        &self.container
    }

    fn is_running(&self) -> bool {
        self.process.is_running()
    }

    fn exit_code(&self) -> Option<i32> {
        self.process.exit_code()
    }

    async fn release(self: Box<Self>) -> Result<(), LaunchError> {
        let DockerWorker {
            container,
            binary,
            process,
        } = *self;
        let released = Box::new(process).release().await;

        // `--rm` covers the normal path; this catches a container the killed CLI left behind.
        match Command::new(&binary)
            .args(["rm", "-f", container.as_str()])
            .kill_on_drop(true)
            .output()
            .await
        {
            Ok(out) if out.status.success() => debug!(container = %container, "container removed"),
            Ok(out) => debug!(
                container = %container,
                code = ?out.status.code(),
                "container removal reported failure"
            ),
            Err(e) => debug!(container = %container, error = %e, "container removal not run"),
        }
        released
    }
}
