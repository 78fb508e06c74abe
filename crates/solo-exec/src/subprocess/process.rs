use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::{process::Command, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use solo_core::launch::{LaunchError, LaunchedWorker};

use crate::subprocess::{
    config::ProcessConfig,
    logger::{LogConfig, Stream, forward_lines},
};

#[derive(Debug, Default)]
struct ProcessState {
    running: AtomicBool,
    exit_code: Mutex<Option<i32>>,
}

/// A running backing process owned by a worker.
///
/// A watcher task waits on the child; releasing cancels the watcher, which kills the child.
pub struct ProcessWorker {
    id: String,
    state: Arc<ProcessState>,
    cancel: CancellationToken,
    watcher: JoinHandle<()>,
}

impl ProcessWorker {
    /// Spawn the configured process and start watching it.
    pub(crate) fn spawn(cfg: &ProcessConfig, log: LogConfig) -> Result<Self, LaunchError> {
        cfg.validate()?;
        cfg.trace_state();

        let mut cmd = Command::new(&cfg.command);
        cmd.args(&cfg.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        for kv in cfg.env.resolved() {
            cmd.env(kv.key(), kv.value());
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| LaunchError::Spawn(format!("{}: {e}", cfg.command)))?;
        let id = child
            .id()
            .map(|pid| format!("pid:{pid}"))
            .unwrap_or_else(|| cfg.worker.clone());

        if let Some(out) = child.stdout.take() {
            tokio::spawn(forward_lines(out, Stream::Stdout, cfg.worker.clone(), log));
        }
        if let Some(err) = child.stderr.take() {
            tokio::spawn(forward_lines(err, Stream::Stderr, cfg.worker.clone(), log));
        }

        let state = Arc::new(ProcessState {
            running: AtomicBool::new(true),
            exit_code: Mutex::new(None),
        });
        let cancel = CancellationToken::new();

        let watcher = {
            let state = state.clone();
            let cancel = cancel.clone();
            let worker = cfg.worker.clone();
            tokio::spawn(async move {
                let exited = tokio::select! {
                    res = child.wait() => Some(res),
                    _ = cancel.cancelled() => None,
                };
                match exited {
                    Some(Ok(status)) => {
                        info!(worker = %worker, code = ?status.code(), "backing process exited");
                        *state.exit_code.lock() = status.code();
                    }
                    Some(Err(e)) => {
                        warn!(worker = %worker, error = %e, "failed to wait for backing process");
                    }
                    None => match child.kill().await {
                        Ok(()) => debug!(worker = %worker, "backing process killed"),
                        Err(e) => warn!(worker = %worker, error = %e, "failed to kill backing process"),
                    },
                }
                state.running.store(false, Ordering::Release);
            })
        };

        debug!(worker = %cfg.worker, id = %id, "backing process started");
        Ok(Self {
            id,
            state,
            cancel,
            watcher,
        })
    }
}

#[async_trait]
impl LaunchedWorker for ProcessWorker {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_running(&self) -> bool {
        self.state.running.load(Ordering::Acquire)
    }

    fn exit_code(&self) -> Option<i32> {
        *self.state.exit_code.lock()
    }

    async fn release(self: Box<Self>) -> Result<(), LaunchError> {
        self.cancel.cancel();
        self.watcher
            .await
            .map_err(|e| LaunchError::Release(format!("{}: {e}", self.id)))
    }
}
