//! Pod rightsizer - threshold-based request controller for one pod
//!
//! Samples the target pod's live usage every poll interval and nudges its
//! CPU and memory requests toward observed demand.

use anyhow::{Context, Result};
use rightsizer_lib::{
    cluster::KubeCluster,
    control::ControlLoopBuilder,
    health::HealthRegistry,
    observability::{ResizerMetrics, StructuredLogger},
};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;
mod kube_client;

const RIGHTSIZER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting pod-rightsizer");

    let config = config::AgentConfig::load()?;
    let controller = config.controller.clone();
    controller
        .validate()
        .context("Invalid controller configuration")?;
    info!(
        namespace = %controller.namespace,
        pod = %controller.pod_name,
        update_scope = ?controller.update_scope,
        "Rightsizer configured"
    );

    let health_registry = HealthRegistry::new();
    let metrics = ResizerMetrics::new();

    let logger = StructuredLogger::new(&controller.namespace, &controller.pod_name);
    logger.log_startup(RIGHTSIZER_VERSION, controller.poll_interval_secs);

    // Probes come up before the cluster connection so liveness is answered
    let app_state = Arc::new(api::AppState::new(health_registry.clone(), metrics));
    let api_handle = tokio::spawn(api::serve(config.api.port, app_state));

    let client = kube_client::init_kube_client(config.kube.kubeconfig.as_deref()).await?;
    let cluster = Arc::new(KubeCluster::new(client, controller.api_timeout()));

    let control_loop = ControlLoopBuilder::new(controller)
        .cluster(cluster)
        .health(health_registry)
        .build()?;

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let loop_handle = tokio::spawn(control_loop.run(shutdown_rx));

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for shutdown signal")?;
            logger.log_shutdown("SIGINT received");
        }
        result = api_handle => {
            match result {
                Ok(Ok(())) => logger.log_shutdown("API server stopped"),
                Ok(Err(e)) => error!(error = %e, "API server failed"),
                Err(e) => error!(error = %e, "API server task panicked"),
            }
        }
    }

    // Receiver may already be gone if the loop task died
    let _ = shutdown_tx.send(());
    if let Err(e) = loop_handle.await {
        error!(error = %e, "Control loop task failed");
    }

    info!("Shutdown complete");
    Ok(())
}
