use std::{net::SocketAddr, path::Path, time::Duration};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use solo_model::{Env, ProvisionConfig};
use solo_observe::LoggerConfig;

/// Daemon configuration, read from a JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AgentConfig {
    pub logger: LoggerConfig,
    pub provision: ProvisionConfig,
    /// HTTP listen address.
    pub listen: SocketAddr,
    /// How long shutdown waits for in-flight provisioning.
    pub grace_ms: u64,
    /// Base environment merged into every launch.
    pub env: Env,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            logger: LoggerConfig::default(),
            provision: ProvisionConfig::default(),
            listen: SocketAddr::from(([127, 0, 0, 1], 8686)),
            grace_ms: 10_000,
            env: Env::default(),
        }
    }
}

impl AgentConfig {
    /// Read `path`, or use defaults when no file is given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let cfg: Self = serde_json::from_str(&raw)
            .with_context(|| format!("parsing config {}", path.display()))?;
        cfg.provision
            .validate()
            .with_context(|| format!("validating config {}", path.display()))?;
        Ok(cfg)
    }

    pub fn grace(&self) -> Duration {
        Duration::from_millis(self.grace_ms)
    }
}
