//! Kubernetes client construction

use anyhow::{Context, Result};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use std::path::Path;
use tracing::info;

/// Build a client from an explicit kubeconfig, or fall back to in-cluster
/// and `KUBECONFIG` discovery
pub async fn init_kube_client(kubeconfig: Option<&Path>) -> Result<Client> {
    let client = match kubeconfig {
        Some(path) => {
            info!(kubeconfig = %path.display(), "Using kubeconfig file");
            let kubeconfig = Kubeconfig::read_from(path)
                .with_context(|| format!("Failed to read kubeconfig file: {}", path.display()))?;

            let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                .await
                .with_context(|| {
                    format!("Failed to create config from kubeconfig: {}", path.display())
                })?;

            Client::try_from(config)
                .context("Failed to create Kubernetes client from custom kubeconfig")?
        }
        None => Client::try_default()
            .await
            .context("Failed to create Kubernetes client")?,
    };
    Ok(client)
}
