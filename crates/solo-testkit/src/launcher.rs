use std::{
    collections::{HashMap, VecDeque},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use solo_core::launch::{LaunchError, LaunchRequest, LaunchedWorker, Launcher};

/// Outcome of one scripted launch.
#[derive(Debug, Clone)]
pub enum Script {
    /// Start a backing process that keeps running.
    Ok,
    /// Fail synchronously with [`LaunchError::Refused`].
    Refuse(String),
    /// Start, but the process is already gone.
    ExitEarly(Option<i32>),
}

struct Inner {
    script: Mutex<VecDeque<Script>>,
    fallback: Script,
    launched: Mutex<Vec<LaunchRequest>>,
    released: Mutex<Vec<String>>,
    running: Mutex<HashMap<String, Arc<AtomicBool>>>,
    tx: mpsc::UnboundedSender<LaunchRequest>,
    rx: Mutex<Option<mpsc::UnboundedReceiver<LaunchRequest>>>,
}

/// Launcher that records requests and follows a script.
#[derive(Clone)]
pub struct FakeLauncher {
    inner: Arc<Inner>,
}

impl FakeLauncher {
    /// Every launch succeeds.
    pub fn new() -> Self {
        Self::with_fallback(Script::Ok)
    }

    /// Every launch is refused.
    pub fn refusing(reason: impl Into<String>) -> Self {
        Self::with_fallback(Script::Refuse(reason.into()))
    }

    fn with_fallback(fallback: Script) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            inner: Arc::new(Inner {
                script: Mutex::new(VecDeque::new()),
                fallback,
                launched: Mutex::new(Vec::new()),
                released: Mutex::new(Vec::new()),
                running: Mutex::new(HashMap::new()),
                tx,
                rx: Mutex::new(Some(rx)),
            }),
        }
    }

    /// Queue per-launch outcomes, consumed in order before the fallback applies.
    pub fn script(self, steps: impl IntoIterator<Item = Script>) -> Self {
        self.inner.script.lock().extend(steps);
        self
    }

    /// Requests seen so far, including refused ones.
    pub fn launched(&self) -> Vec<LaunchRequest> {
        self.inner.launched.lock().clone()
    }

    /// Worker names whose backing was released.
    pub fn released(&self) -> Vec<String> {
        self.inner.released.lock().clone()
    }

    /// Stream of successfully started requests; can be taken once.
    pub fn take_receiver(&self) -> Option<mpsc::UnboundedReceiver<LaunchRequest>> {
        self.inner.rx.lock().take()
    }

    /// Make a running backing exit.
    pub fn kill(&self, worker: &str) {
        if let Some(flag) = self.inner.running.lock().get(worker) {
            flag.store(false, Ordering::SeqCst);
        }
    }

    fn next_step(&self) -> Script {
        self.inner
            .script
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.inner.fallback.clone())
    }
}

impl Default for FakeLauncher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Launcher for FakeLauncher {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn launch(&self, req: &LaunchRequest) -> Result<Box<dyn LaunchedWorker>, LaunchError> {
        self.inner.launched.lock().push(req.clone());

        let (running, exit_code) = match self.next_step() {
            Script::Refuse(reason) => return Err(LaunchError::Refused(reason)),
            Script::Ok => (true, None),
            Script::ExitEarly(code) => (false, code),
        };

        let flag = Arc::new(AtomicBool::new(running));
        self.inner
            .running
            .lock()
            .insert(req.worker.clone(), Arc::clone(&flag));
        if running {
            let _ = self.inner.tx.send(req.clone());
        }

        Ok(Box::new(FakeWorker {
            id: req.worker.clone(),
            running: flag,
            exit_code,
            launcher: Arc::clone(&self.inner),
        }))
    }
}

struct FakeWorker {
    id: String,
    running: Arc<AtomicBool>,
    exit_code: Option<i32>,
    launcher: Arc<Inner>,
}

#[async_trait]
impl LaunchedWorker for FakeWorker {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    async fn release(self: Box<Self>) -> Result<(), LaunchError> {
        self.running.store(false, Ordering::SeqCst);
        self.launcher.released.lock().push(self.id.clone());
        Ok(())
    }
}
