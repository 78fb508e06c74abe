use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("invalid label expression '{expr}': {reason}")]
    InvalidLabelExpr { expr: String, reason: String },

    #[error("invalid label atom: '{0}'")]
    InvalidAtom(String),

    #[error("invalid affinity label: '{0}'")]
    InvalidAffinityLabel(String),

    #[error("unknown connection state: {0}")]
    UnknownConnectionState(String),

    #[error("unknown failure action: {0}")]
    UnknownFailureAction(String),

    #[error("unknown usage mode: {0}")]
    UnknownUsageMode(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

pub type ModelResult<T> = Result<T, ModelError>;
