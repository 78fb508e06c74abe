use std::{sync::Arc, time::Duration};

use tokio::task::JoinHandle;
use tracing::debug;

use solo_core::Provisioner;

use crate::FakeLauncher;

/// Simulate workers connecting back `delay` after their backing process starts.
pub fn auto_connect(
    provisioner: Arc<Provisioner>,
    launcher: &FakeLauncher,
    delay: Duration,
) -> JoinHandle<()> {
    let Some(mut rx) = launcher.take_receiver() else {
        return tokio::spawn(async {});
    };

    tokio::spawn(async move {
        while let Some(req) = rx.recv().await {
            let provisioner = Arc::clone(&provisioner);
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                let res = provisioner
                    .supervisor()
                    .handshake(&req.worker, &req.secret);
                debug!(worker = %req.worker, ok = res.is_ok(), "fake worker connected");
            });
        }
    })
}
