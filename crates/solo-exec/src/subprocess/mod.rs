//! Local process launcher.
mod config;
pub use config::ProcessConfig;

mod logger;
pub use logger::LogConfig;

mod process;
pub use process::ProcessWorker;

use async_trait::async_trait;
use tracing::instrument;

use solo_core::launch::{LaunchError, LaunchRequest, LaunchedWorker, Launcher};
use solo_model::Env;

use crate::metrics::LAUNCHER_TYPE_SUBPROCESS;

/// Starts each worker as a local process.
///
/// `command`, `args` and `env` values are templates rendered per request.
/// The process also receives the bootstrap variables from [`LaunchRequest::env`].
#[derive(Debug, Clone)]
pub struct SubprocessLauncher {
    command: String,
    args: Vec<String>,
    env: Env,
    log: LogConfig,
}

impl SubprocessLauncher {
    pub fn new<I, S>(command: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            command: command.into(),
            args: args.into_iter().map(Into::into).collect(),
            env: Env::new(),
            log: LogConfig::default(),
        }
    }

    pub fn with_env(mut self, env: Env) -> Self {
        self.env = env;
        self
    }

    pub fn with_log_config(mut self, log: LogConfig) -> Self {
        self.log = log;
        self
    }

    /// Render the process configuration for one request.
    pub fn process_config(&self, req: &LaunchRequest) -> ProcessConfig {
        ProcessConfig {
            worker: req.worker.clone(),
            command: req.render(&self.command),
            args: self.args.iter().map(|a| req.render(a)).collect(),
            env: req.rendered_env(&self.env),
        }
    }
}

#[async_trait]
impl Launcher for SubprocessLauncher {
    fn name(&self) -> &'static str {
        LAUNCHER_TYPE_SUBPROCESS
    }

    #[instrument(level = "debug", skip_all, fields(worker = %req.worker))]
    async fn launch(&self, req: &LaunchRequest) -> Result<Box<dyn LaunchedWorker>, LaunchError> {
        let cfg = self.process_config(req);
        let worker = ProcessWorker::spawn(&cfg, self.log)?;
        Ok(Box::new(worker))
    }
}
