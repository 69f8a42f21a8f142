//! Kubernetes API server backed cluster access
//!
//! Every call is bounded by the configured API timeout. Reads use `get_opt`
//! so that absence is a value, not an error; writes are strategic merge
//! patches keyed on container name.

use super::{MetricsSource, PodMetrics, PodSpecSource};
use crate::error::{ResizeError, Result};
use crate::models::{ContainerUsageSample, RequestPatch};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, Patch, PatchParams};
use kube::Client;
use serde_json::{json, Map, Value};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Field manager recorded on every patch
pub const FIELD_MANAGER: &str = "pod-rightsizer";

/// Cluster access through a shared `kube::Client`
#[derive(Clone)]
pub struct KubeCluster {
    client: Client,
    timeout: Duration,
}

impl KubeCluster {
    pub fn new(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    async fn bounded<T, F>(&self, operation: &'static str, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>> + Send,
    {
        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| ResizeError::Timeout {
                operation,
                timeout_secs: self.timeout.as_secs(),
            })?
    }
}

#[async_trait]
impl MetricsSource for KubeCluster {
    async fn pod_usage(
        &self,
        namespace: &str,
        pod_name: &str,
    ) -> Result<Option<Vec<ContainerUsageSample>>> {
        let api: Api<PodMetrics> = Api::namespaced(self.client.clone(), namespace);

        let metrics = self
            .bounded("get pod metrics", async {
                api.get_opt(pod_name)
                    .await
                    .map_err(|e| ResizeError::MetricsUnavailable {
                        namespace: namespace.to_string(),
                        pod: pod_name.to_string(),
                        message: e.to_string(),
                    })
            })
            .await?;

        Ok(metrics.map(PodMetrics::into_samples))
    }
}

#[async_trait]
impl PodSpecSource for KubeCluster {
    async fn get_pod(&self, namespace: &str, pod_name: &str) -> Result<Option<Pod>> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);

        self.bounded("get pod", async {
            api.get_opt(pod_name)
                .await
                .map_err(|e| ResizeError::SpecUnavailable {
                    namespace: namespace.to_string(),
                    pod: pod_name.to_string(),
                    message: e.to_string(),
                })
        })
        .await
    }

    async fn patch_requests(
        &self,
        namespace: &str,
        pod_name: &str,
        patch: &RequestPatch,
    ) -> Result<()> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let body = strategic_patch_body(patch);
        debug!(pod = %pod_name, patch = %body, "Submitting request patch");

        let params = PatchParams {
            field_manager: Some(FIELD_MANAGER.to_string()),
            ..PatchParams::default()
        };

        self.bounded("patch pod", async {
            api.patch(pod_name, &params, &Patch::Strategic(&body))
                .await
                .map(|_| ())
                .map_err(|e| patch_error(namespace, pod_name, e))
        })
        .await
    }
}

fn patch_error(namespace: &str, pod_name: &str, err: kube::Error) -> ResizeError {
    match err {
        kube::Error::Api(resp) if resp.code == 409 => ResizeError::Conflict {
            pod: pod_name.to_string(),
        },
        kube::Error::Api(resp) if resp.code == 404 => ResizeError::PodNotFound {
            namespace: namespace.to_string(),
            pod: pod_name.to_string(),
        },
        other => ResizeError::UpdateFailure {
            pod: pod_name.to_string(),
            message: other.to_string(),
        },
    }
}

/// Build the strategic merge patch for a set of request assignments
///
/// Containers are merged by name, so only the listed request keys change.
/// When a resourceVersion is present the API server rejects the patch with
/// 409 if the pod was modified after it was read.
pub fn strategic_patch_body(patch: &RequestPatch) -> Value {
    let mut containers: Vec<(String, Map<String, Value>)> = Vec::new();

    for assignment in &patch.assignments {
        let idx = match containers
            .iter()
            .position(|(name, _)| *name == assignment.container_name)
        {
            Some(idx) => idx,
            None => {
                containers.push((assignment.container_name.clone(), Map::new()));
                containers.len() - 1
            }
        };
        containers[idx].1.insert(
            assignment.kind.request_key().to_string(),
            Value::String(assignment.quantity.clone()),
        );
    }

    let containers: Vec<Value> = containers
        .into_iter()
        .map(|(name, requests)| {
            json!({
                "name": name,
                "resources": { "requests": requests },
            })
        })
        .collect();

    let mut body = json!({ "spec": { "containers": containers } });
    if let Some(version) = &patch.resource_version {
        body["metadata"] = json!({ "resourceVersion": version });
    }
    body
}
