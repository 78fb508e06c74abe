use std::fmt;

use solo_model::Env;

use crate::metrics::MetricsHandle;

/// Shared dependencies injected into the listener, orchestrator and launch path.
#[derive(Clone)]
pub struct ProvisionContext {
    env: Env,
    metrics: MetricsHandle,
}

impl ProvisionContext {
    pub fn new(env: Env, metrics: MetricsHandle) -> Self {
        Self { env, metrics }
    }

    /// Base environment merged under every launch request.
    pub fn env(&self) -> &Env {
        &self.env
    }

    pub fn metrics(&self) -> &MetricsHandle {
        &self.metrics
    }

    pub fn with_env(mut self, env: Env) -> Self {
        self.env = env;
        self
    }

    pub fn with_metrics(mut self, metrics: MetricsHandle) -> Self {
        self.metrics = metrics;
        self
    }
}

impl Default for ProvisionContext {
    fn default() -> Self {
        Self {
            env: Env::default(),
            metrics: crate::metrics::noop_metrics(),
        }
    }
}

impl fmt::Debug for ProvisionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProvisionContext")
            .field("env_len", &self.env.len())
            .field("metrics", &"<handle>")
            .finish()
    }
}
