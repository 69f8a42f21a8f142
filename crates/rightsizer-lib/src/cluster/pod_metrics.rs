//! `metrics.k8s.io/v1beta1` PodMetrics resource
//!
//! k8s-openapi does not ship the metrics API types, so the resource is
//! declared here with just enough of the schema for usage sampling.

use k8s_openapi::apimachinery::pkg::{api::resource::Quantity, apis::meta::v1::ObjectMeta};
use serde::{Deserialize, Serialize};

use crate::models::ContainerUsageSample;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PodMetricsUsage {
    pub cpu: Quantity,
    pub memory: Quantity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PodMetricsContainer {
    pub name: String,
    pub usage: PodMetricsUsage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PodMetrics {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub window: Option<String>,
    #[serde(default)]
    pub containers: Vec<PodMetricsContainer>,
}

impl PodMetrics {
    /// Container usage in the order the metrics API reported it
    pub fn into_samples(self) -> Vec<ContainerUsageSample> {
        self.containers
            .into_iter()
            .map(|c| ContainerUsageSample {
                container_name: c.name,
                cpu_usage: c.usage.cpu.0,
                memory_usage: c.usage.memory.0,
            })
            .collect()
    }
}

impl k8s_openapi::Resource for PodMetrics {
    type Scope = k8s_openapi::NamespaceResourceScope;

    const API_VERSION: &'static str = "metrics.k8s.io/v1beta1";
    const GROUP: &'static str = "metrics.k8s.io";
    const KIND: &'static str = "PodMetrics";
    const URL_PATH_SEGMENT: &'static str = "pods";
    const VERSION: &'static str = "v1beta1";
}

impl k8s_openapi::Metadata for PodMetrics {
    type Ty = ObjectMeta;

    fn metadata(&self) -> &Self::Ty {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut Self::Ty {
        &mut self.metadata
    }
}
