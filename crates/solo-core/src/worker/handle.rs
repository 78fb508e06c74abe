use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    },
};

use parking_lot::Mutex;
use tokio::{sync::watch, time::Instant};
use uuid::Uuid;

use solo_model::{
    AffinityLabel, BuildableItem, ConnectionState, LabelSet, QueueItemId, UsageMode,
};

use crate::{launch::LaunchedWorker, retention::RetentionPolicy, worker::ConnectionCell};

/// Shared reference to a worker handle.
pub type WorkerRef = Arc<WorkerHandle>;

/// One ephemeral, single-task worker.
///
/// Fixed at one executor, exclusive usage and [`RetentionPolicy::ONCE`].
pub struct WorkerHandle {
    name: String,
    label: AffinityLabel,
    item: QueueItemId,
    requeues: u32,
    secret: String,
    remote_fs: String,
    retention: RetentionPolicy,
    connection: ConnectionCell,
    backing: Mutex<Option<Box<dyn LaunchedWorker>>>,
    completed: AtomicU32,
    created_at: Instant,
}

impl WorkerHandle {
    /// Number of executors on every ephemeral worker.
    pub const EXECUTORS: usize = 1;

    pub fn new(
        name: impl Into<String>,
        label: AffinityLabel,
        item: QueueItemId,
        remote_fs: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            label,
            item,
            requeues: 0,
            secret: Uuid::new_v4().simple().to_string(),
            remote_fs: remote_fs.into(),
            retention: RetentionPolicy::ONCE,
            connection: ConnectionCell::new(),
            backing: Mutex::new(None),
            completed: AtomicU32::new(0),
            created_at: Instant::now(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn label(&self) -> &AffinityLabel {
        &self.label
    }

    /// Queue item this worker was provisioned for.
    pub fn item(&self) -> QueueItemId {
        self.item
    }

    /// Requeues the item had gone through when this worker was minted.
    pub fn with_requeues(mut self, requeues: u32) -> Self {
        self.requeues = requeues;
        self
    }

    pub fn requeues(&self) -> u32 {
        self.requeues
    }

    /// Token the worker presents when connecting back.
    pub fn secret(&self) -> &str {
        &self.secret
    }

    pub fn remote_fs(&self) -> &str {
        &self.remote_fs
    }

    pub fn executors(&self) -> usize {
        Self::EXECUTORS
    }

    pub fn mode(&self) -> UsageMode {
        UsageMode::Exclusive
    }

    pub fn retention(&self) -> RetentionPolicy {
        self.retention
    }

    /// Labels the matcher sees: only the affinity label.
    pub fn labels(&self) -> LabelSet {
        LabelSet::single(self.label.as_str()).unwrap_or_default()
    }

    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    pub fn is_online(&self) -> bool {
        self.state() == ConnectionState::Online
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.connection.subscribe()
    }

    pub(crate) fn connection(&self) -> &ConnectionCell {
        &self.connection
    }

    /// Whether the matcher may dispatch `item` here right now.
    ///
    /// Exclusive usage: only a task bound to this worker's label, and only while online.
    pub fn can_run(&self, item: &BuildableItem) -> bool {
        self.is_online()
            && item
                .binding
                .as_ref()
                .is_some_and(|b| b.permits(&self.labels()))
    }

    /// Tasks completed on this worker so far.
    pub fn completed(&self) -> u32 {
        self.completed.load(Ordering::Acquire)
    }

    pub(crate) fn record_completion(&self) -> u32 {
        self.completed.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub(crate) fn attach_backing(&self, backing: Box<dyn LaunchedWorker>) {
        *self.backing.lock() = Some(backing);
    }

    pub(crate) fn take_backing(&self) -> Option<Box<dyn LaunchedWorker>> {
        self.backing.lock().take()
    }

    /// `None` until a backing process is attached.
    pub fn backing_running(&self) -> Option<bool> {
        self.backing.lock().as_ref().map(|b| b.is_running())
    }

    /// Exit code of the backing process, if it already exited.
    pub fn backing_exit_code(&self) -> Option<i32> {
        self.backing.lock().as_ref().and_then(|b| b.exit_code())
    }

    pub fn backing_id(&self) -> Option<String> {
        self.backing.lock().as_ref().map(|b| b.id().to_string())
    }

    pub fn age(&self) -> std::time::Duration {
        self.created_at.elapsed()
    }
}

impl fmt::Debug for WorkerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerHandle")
            .field("name", &self.name)
            .field("label", &self.label)
            .field("item", &self.item)
            .field("state", &self.state())
            .field("completed", &self.completed())
            .finish_non_exhaustive()
    }
}
