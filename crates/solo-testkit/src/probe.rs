use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;

use solo_core::{probe::ConnectivityProbe, worker::WorkerHandle};

/// Probe answering with a switchable flag for every worker.
#[derive(Clone, Default)]
pub struct StaticProbe {
    online: Arc<AtomicBool>,
}

impl StaticProbe {
    pub fn new(online: bool) -> Self {
        Self {
            online: Arc::new(AtomicBool::new(online)),
        }
    }

    pub fn set(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }
}

#[async_trait]
impl ConnectivityProbe for StaticProbe {
    async fn is_online(&self, _worker: &WorkerHandle) -> bool {
        self.online.load(Ordering::SeqCst)
    }
}
