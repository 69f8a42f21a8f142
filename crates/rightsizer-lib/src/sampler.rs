//! Live usage sampling for the target pod

use crate::cluster::MetricsSource;
use crate::error::Result;
use crate::models::ContainerUsageSample;
use std::sync::Arc;
use tracing::debug;

/// Reads the current per-container usage of one pod from the metrics API
#[derive(Clone)]
pub struct UsageSampler {
    source: Arc<dyn MetricsSource>,
}

impl UsageSampler {
    pub fn new(source: Arc<dyn MetricsSource>) -> Self {
        Self { source }
    }

    /// Sample the pod's containers in the order the metrics API lists them
    ///
    /// A pod missing from the snapshot yields an empty list: metrics lag
    /// behind pod creation and restarts, so absence is not a failure.
    pub async fn sample(&self, namespace: &str, pod_name: &str) -> Result<Vec<ContainerUsageSample>> {
        match self.source.pod_usage(namespace, pod_name).await? {
            Some(samples) => Ok(samples),
            None => {
                debug!(namespace = %namespace, pod = %pod_name, "Pod not in metrics snapshot yet");
                Ok(Vec::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::fake::FakeCluster;
    use tokio_test::{assert_err, assert_ok};

    #[tokio::test]
    async fn test_sample_returns_containers_in_order() {
        let cluster = Arc::new(FakeCluster::default());
        cluster.set_usage(&[
            ("app", "800000000n", "174080Ki"),
            ("sidecar", "1000000n", "4096Ki"),
        ]);

        let sampler = UsageSampler::new(cluster);
        let samples = assert_ok!(sampler.sample("default", "web").await);

        let names: Vec<_> = samples.iter().map(|s| s.container_name.as_str()).collect();
        assert_eq!(names, ["app", "sidecar"]);
        assert_eq!(samples[0].cpu_usage, "800000000n");
    }

    #[tokio::test]
    async fn test_absent_pod_is_empty_not_error() {
        let cluster = Arc::new(FakeCluster::default());
        let sampler = UsageSampler::new(cluster);

        let samples = assert_ok!(sampler.sample("default", "web").await);
        assert!(samples.is_empty());
    }

    #[tokio::test]
    async fn test_metrics_failure_propagates() {
        let cluster = Arc::new(FakeCluster::default());
        cluster.fail_metrics(Some("service unavailable"));

        let sampler = UsageSampler::new(cluster);
        let err = assert_err!(sampler.sample("default", "web").await);
        assert_eq!(err.kind(), "metrics_unavailable");
    }
}
