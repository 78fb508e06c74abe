use thiserror::Error;

use solo_model::ConnectionState;

/// Rejections of a worker trying to connect back.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandshakeError {
    #[error("unknown worker: {0}")]
    UnknownWorker(String),

    #[error("bad secret for worker {0}")]
    BadSecret(String),

    #[error("worker {worker} is {state}, expected pending")]
    NotPending {
        worker: String,
        state: ConnectionState,
    },
}
