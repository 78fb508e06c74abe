use thiserror::Error;

use solo_core::launch::LaunchError;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("invalid specification: {0}")]
    InvalidSpec(String),

    #[error("launcher '{0}' is not compiled in")]
    Unsupported(&'static str),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ExecError> for LaunchError {
    fn from(e: ExecError) -> Self {
        match e {
            ExecError::InvalidSpec(msg) => LaunchError::InvalidSpec(msg),
            ExecError::Unsupported(kind) => LaunchError::Refused(format!("{kind} launcher unavailable")),
            ExecError::Io(e) => LaunchError::Io(e.to_string()),
        }
    }
}
