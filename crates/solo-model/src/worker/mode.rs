use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

/// How the matcher may use a worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UsageMode {
    /// Only tasks whose binding names the worker's label may run on it.
    Exclusive,
    /// Any task whose expression matches the worker's labels.
    Normal,
}

impl UsageMode {
    pub fn as_str(self) -> &'static str {
        match self {
            UsageMode::Exclusive => "exclusive",
            UsageMode::Normal => "normal",
        }
    }
}

impl Default for UsageMode {
    fn default() -> Self {
        UsageMode::Exclusive
    }
}

impl FromStr for UsageMode {
    type Err = ModelError;
    fn from_str(s: &str) -> ModelResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exclusive" => Ok(UsageMode::Exclusive),
            "normal" => Ok(UsageMode::Normal),
            other => Err(ModelError::UnknownUsageMode(other.to_string())),
        }
    }
}
