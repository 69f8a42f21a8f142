//! Cluster API seams
//!
//! The control loop talks to the cluster through two traits: one for the
//! live metrics snapshot and one for reading and patching the pod spec.
//! `KubeCluster` implements both against a real API server.

mod kube_api;
mod pod_metrics;

#[cfg(test)]
pub(crate) mod fake;

pub use kube_api::{strategic_patch_body, KubeCluster};
pub use pod_metrics::{PodMetrics, PodMetricsContainer, PodMetricsUsage};

use crate::error::Result;
use crate::models::{ContainerUsageSample, RequestPatch};
use k8s_openapi::api::core::v1::Pod;

pub use async_trait::async_trait;

/// Source of live per-container usage
#[async_trait]
pub trait MetricsSource: Send + Sync {
    /// Usage of every container of the pod, or `None` when the pod is not in
    /// the current metrics snapshot yet
    async fn pod_usage(
        &self,
        namespace: &str,
        pod_name: &str,
    ) -> Result<Option<Vec<ContainerUsageSample>>>;
}

/// Readable and patchable pod spec
#[async_trait]
pub trait PodSpecSource: Send + Sync {
    /// Fetch the pod, `None` if it does not exist
    async fn get_pod(&self, namespace: &str, pod_name: &str) -> Result<Option<Pod>>;

    /// Apply request assignments as a partial update
    ///
    /// Must fail with `ResizeError::Conflict` when `patch.resource_version`
    /// no longer matches the live object.
    async fn patch_requests(
        &self,
        namespace: &str,
        pod_name: &str,
        patch: &RequestPatch,
    ) -> Result<()>;
}
