use thiserror::Error;

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("launcher refused: {0}")]
    Refused(String),

    #[error("failed to spawn backing process: {0}")]
    Spawn(String),

    #[error("backing process exited before connecting (code: {code:?})")]
    Exited { code: Option<i32> },

    #[error("failed to release backing process: {0}")]
    Release(String),

    #[error("invalid launcher spec: {0}")]
    InvalidSpec(String),

    #[error("io error: {0}")]
    Io(String),
}

impl LaunchError {
    pub fn kind(&self) -> &'static str {
        match self {
            LaunchError::Refused(_) => "refused",
            LaunchError::Spawn(_) => "spawn",
            LaunchError::Exited { .. } => "exited",
            LaunchError::Release(_) => "release",
            LaunchError::InvalidSpec(_) => "invalid_spec",
            LaunchError::Io(_) => "io",
        }
    }
}

impl From<std::io::Error> for LaunchError {
    fn from(e: std::io::Error) -> Self {
        LaunchError::Io(e.to_string())
    }
}
