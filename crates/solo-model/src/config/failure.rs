use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

/// What happens to the originating task when provisioning fails.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FailureAction {
    /// Fail the task explicitly.
    Cancel,
    /// Put the task back into admission (bounded by `maxRequeues`).
    Requeue,
}

impl Default for FailureAction {
    fn default() -> Self {
        FailureAction::Cancel
    }
}

impl FromStr for FailureAction {
    type Err = ModelError;
    fn from_str(s: &str) -> ModelResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cancel" | "fail" => Ok(FailureAction::Cancel),
            "requeue" | "retry" => Ok(FailureAction::Requeue),
            other => Err(ModelError::UnknownFailureAction(other.to_string())),
        }
    }
}
