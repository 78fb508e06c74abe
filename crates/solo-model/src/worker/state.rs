use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

/// Connection state of an ephemeral worker.
///
/// Allowed moves: `Pending -> Online`, `Pending -> Terminated`, `Online -> Terminated`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Pending,
    Online,
    Terminated,
}

impl ConnectionState {
    pub fn can_transition_to(self, next: ConnectionState) -> bool {
        matches!(
            (self, next),
            (ConnectionState::Pending, ConnectionState::Online)
                | (ConnectionState::Pending, ConnectionState::Terminated)
                | (ConnectionState::Online, ConnectionState::Terminated)
        )
    }

    pub fn is_terminal(self) -> bool {
        self == ConnectionState::Terminated
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionState::Pending => "pending",
            ConnectionState::Online => "online",
            ConnectionState::Terminated => "terminated",
        }
    }
}

impl Default for ConnectionState {
    fn default() -> Self {
        ConnectionState::Pending
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConnectionState {
    type Err = ModelError;
    fn from_str(s: &str) -> ModelResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(ConnectionState::Pending),
            "online" => Ok(ConnectionState::Online),
            "terminated" => Ok(ConnectionState::Terminated),
            other => Err(ModelError::UnknownConnectionState(other.to_string())),
        }
    }
}
