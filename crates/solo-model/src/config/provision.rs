use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{
    FailureAction, LabelSet, LauncherSpec, TimeoutMs,
    error::{ModelError, ModelResult},
    label::is_valid_atom,
};

/// Provisioning settings shared by the listener and the orchestrator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProvisionConfig {
    /// Tasks whose label expression matches this set get an ephemeral worker.
    pub labels: LabelSet,

    /// Prefix of minted affinity labels.
    pub label_prefix: String,

    /// URL workers use to reach the controller.
    pub controller_url: String,

    /// Worker root directory.
    pub remote_fs: String,

    /// Upper bound on waiting for a worker to come online.
    pub ready_timeout_ms: TimeoutMs,

    /// Interval of probe and queue re-checks while waiting.
    pub poll_interval_ms: u64,

    /// Attempts to register a worker under a fresh name on conflict.
    pub registration_attempts: u32,

    pub on_failure: FailureAction,

    /// Requeue budget per task before falling back to cancel.
    pub max_requeues: u32,

    pub launcher: LauncherSpec,
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        Self {
            labels: LabelSet::single("docker").unwrap_or_default(),
            label_prefix: "docker".to_string(),
            controller_url: "http://127.0.0.1:8080".to_string(),
            remote_fs: "/home/solo".to_string(),
            ready_timeout_ms: 300_000,
            poll_interval_ms: 1_000,
            registration_attempts: 3,
            on_failure: FailureAction::default(),
            max_requeues: 1,
            launcher: LauncherSpec::default(),
        }
    }
}

impl ProvisionConfig {
    pub fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn validate(&self) -> ModelResult<()> {
        let invalid = |msg: String| Err(ModelError::InvalidConfig(msg));

        if self.labels.is_empty() {
            return invalid("labels must not be empty".into());
        }
        if !is_valid_atom(&self.label_prefix) {
            return invalid(format!("invalid labelPrefix {:?}", self.label_prefix));
        }
        if self.ready_timeout_ms == 0 {
            return invalid("readyTimeoutMs must be > 0".into());
        }
        if self.poll_interval_ms == 0 {
            return invalid("pollIntervalMs must be > 0".into());
        }
        if self.poll_interval_ms >= self.ready_timeout_ms {
            return invalid(format!(
                "pollIntervalMs ({}) must be below readyTimeoutMs ({})",
                self.poll_interval_ms, self.ready_timeout_ms
            ));
        }
        if self.registration_attempts == 0 {
            return invalid("registrationAttempts must be > 0".into());
        }
        self.launcher.validate()
    }
}
