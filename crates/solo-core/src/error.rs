use std::time::Duration;

use thiserror::Error;

use solo_model::{AffinityLabel, ConnectionState, ModelError};

use crate::queue::QueueError;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("affinity label collision: '{0}' is already live")]
    LabelCollision(AffinityLabel),

    #[error("queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("model error: {0}")]
    Model(#[from] ModelError),

    #[error("provision pool is closed")]
    PoolClosed,

    #[error("shutdown grace {grace:?} exceeded: {stuck} provisioning units still running")]
    GraceExceeded { grace: Duration, stuck: usize },

    #[error("no runtime available: {0}")]
    NoRuntime(String),

    #[error("unknown worker: {0}")]
    UnknownWorker(String),

    #[error("worker '{worker}' is {state}, expected online")]
    WorkerNotOnline {
        worker: String,
        state: ConnectionState,
    },

    #[error("missing component: {0}")]
    MissingComponent(&'static str),
}

impl CoreError {
    /// Returns the error kind as a static string, for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            CoreError::LabelCollision(_) => "label_collision",
            CoreError::Queue(_) => "queue",
            CoreError::Model(_) => "model",
            CoreError::PoolClosed => "pool_closed",
            CoreError::GraceExceeded { .. } => "grace_exceeded",
            CoreError::NoRuntime(_) => "no_runtime",
            CoreError::UnknownWorker(_) => "unknown_worker",
            CoreError::WorkerNotOnline { .. } => "worker_not_online",
            CoreError::MissingComponent(_) => "missing_component",
        }
    }
}
