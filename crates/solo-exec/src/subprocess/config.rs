use std::fmt;

use tracing::trace;

use solo_model::Env;

use crate::ExecError;

/// Resolved command line of one backing process.
#[derive(Debug, Clone)]
pub struct ProcessConfig {
    /// Worker the process belongs to; used as log identifier.
    pub(crate) worker: String,
    /// Program to execute (e.g. `"docker"`, `"/usr/bin/agent"`).
    pub(crate) command: String,
    pub(crate) args: Vec<String>,
    /// Environment layered on top of the inherited one.
    pub(crate) env: Env,
}

impl ProcessConfig {
    /// Rules: `command` is not empty or whitespace-only.
    pub fn validate(&self) -> Result<(), ExecError> {
        if self.command.trim().is_empty() {
            return Err(ExecError::InvalidSpec("process command is empty".into()));
        }
        Ok(())
    }

    pub fn trace_state(&self) {
        trace!(
            worker = %self.worker,
            command = %self.command,
            args = self.args.len(),
            env_len = self.env.len(),
            "process config resolved"
        );
    }
}

impl fmt::Display for ProcessConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ProcessConfig(cmd='{}', args={}, env={})",
            self.command,
            self.args.len(),
            self.env.len(),
        )
    }
}
