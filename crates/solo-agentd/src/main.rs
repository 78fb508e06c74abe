mod config;
mod error;
mod http;

use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use clap::Parser;
use tokio::{net::TcpListener, runtime::Handle};
use tracing::{debug, info, warn};

use solo_core::{ProvisionContext, Provisioner, queue::MemoryQueue};
use solo_exec::launcher_from_spec;
use solo_observe::init_logger;
use solo_prometheus::PrometheusMetrics;

use crate::{config::AgentConfig, http::AgentState};

/// Provisions a single-use worker for every admitted task.
#[derive(Debug, Parser)]
#[command(name = "solo-agentd", version)]
struct Args {
    /// JSON configuration file; defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured listen address.
    #[arg(long)]
    listen: Option<std::net::SocketAddr>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let mut cfg = AgentConfig::load(args.config.as_deref())?;
    if let Some(listen) = args.listen {
        cfg.listen = listen;
    }

    // local offset detection only works before the runtime threads exist
    init_logger(&cfg.logger)?;

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("solo-agentd")
        .build()
        .context("building runtime")?;
    rt.block_on(run(cfg))
}

async fn run(cfg: AgentConfig) -> anyhow::Result<()> {
    let metrics = PrometheusMetrics::new()?;
    let ctx = ProvisionContext::new(cfg.env.clone(), Arc::new(metrics.clone()));

    let (queue, mut requeued) = MemoryQueue::with_requeue_channel();
    let queue = Arc::new(queue);
    let launcher = launcher_from_spec(&cfg.provision.launcher)?;

    let provisioner = Arc::new(
        Provisioner::builder(cfg.provision.clone())
            .with_queue(queue.clone())
            .with_launcher(launcher)
            .with_context(ctx)
            .build(Handle::current())?,
    );

    let requeue_driver = tokio::spawn({
        let provisioner = provisioner.clone();
        async move {
            while let Some(item) = requeued.recv().await {
                match provisioner.listener().on_buildable(&item) {
                    Ok(admission) => debug!(item = %item.id, ?admission, "requeued item admitted"),
                    Err(e) => warn!(item = %item.id, error = %e, error_kind = e.kind(), "requeued item rejected"),
                }
            }
        }
    });

    let listener = TcpListener::bind(cfg.listen)
        .await
        .with_context(|| format!("binding {}", cfg.listen))?;
    info!(addr = %cfg.listen, "http api listening");

    let app = http::router(AgentState {
        provisioner: provisioner.clone(),
        queue,
        metrics,
    });
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving http api")?;

    requeue_driver.abort();
    match provisioner.shutdown(cfg.grace()).await {
        Ok(reaped) => info!(reaped, "shutdown complete"),
        Err(e) => warn!(error = %e, error_kind = e.kind(), "shutdown finished late"),
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
