mod domain;
pub use domain::{
    AFFINITY_SEPARATOR, CONTAINER_AFFINITY_LABEL, ENV_CONTROLLER_URL, ENV_REMOTE_FS,
    ENV_WORKER_LABEL, ENV_WORKER_NAME, ENV_WORKER_SECRET,
};
pub use domain::{Env, KeyValue, TimeoutMs};

mod error;
pub use error::{ModelError, ModelResult};

mod label;
pub use label::{AffinityLabel, LabelBinding, LabelExpr, LabelSet, is_valid_atom};

mod queue;
pub use queue::{BuildableItem, QueueItemId};

mod worker;
pub use worker::{ConnectionState, UsageMode};

mod config;
pub use config::{
    DEFAULT_BOOTSTRAP_COMMAND, DEFAULT_DOCKER_BINARY, DEFAULT_IMAGE, FailureAction,
    LauncherSpec, ProvisionConfig,
};
