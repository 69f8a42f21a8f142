//! In-memory cluster for tests
//!
//! Holds a single pod and its metrics snapshot, applies request patches the
//! way the API server would (including resourceVersion conflicts), and lets
//! tests inject failures.

use super::{MetricsSource, PodSpecSource};
use crate::error::{ResizeError, Result};
use crate::models::{ContainerUsageSample, RequestPatch, ResourceKind};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Container, Pod, PodSpec, ResourceRequirements};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;
use std::sync::Mutex;

#[derive(Default)]
struct FakeState {
    pod: Option<Pod>,
    usage: Option<Vec<ContainerUsageSample>>,
    resource_version: u64,
    metrics_error: Option<String>,
    patch_error: Option<String>,
    pending_conflicts: u32,
    patches: Vec<RequestPatch>,
    metrics_calls: usize,
}

#[derive(Default)]
pub(crate) struct FakeCluster {
    state: Mutex<FakeState>,
}

/// (container, cpu request, memory request)
pub(crate) type ContainerRequests<'a> = (&'a str, &'a str, &'a str);

/// (container, cpu usage, memory usage)
pub(crate) type ContainerUsage<'a> = (&'a str, &'a str, &'a str);

impl FakeCluster {
    pub(crate) fn with_pod(namespace: &str, name: &str, containers: &[ContainerRequests<'_>]) -> Self {
        let cluster = Self::default();
        {
            let mut state = cluster.state.lock().unwrap();
            state.resource_version = 1;
            state.pod = Some(build_pod(namespace, name, containers));
        }
        cluster
    }

    pub(crate) fn set_usage(&self, usage: &[ContainerUsage<'_>]) {
        let samples = usage
            .iter()
            .map(|(name, cpu, memory)| ContainerUsageSample {
                container_name: name.to_string(),
                cpu_usage: cpu.to_string(),
                memory_usage: memory.to_string(),
            })
            .collect();
        self.state.lock().unwrap().usage = Some(samples);
    }

    pub(crate) fn clear_usage(&self) {
        self.state.lock().unwrap().usage = None;
    }

    pub(crate) fn remove_pod(&self) {
        self.state.lock().unwrap().pod = None;
    }

    pub(crate) fn fail_metrics(&self, message: Option<&str>) {
        self.state.lock().unwrap().metrics_error = message.map(str::to_string);
    }

    pub(crate) fn reject_patches(&self, message: Option<&str>) {
        self.state.lock().unwrap().patch_error = message.map(str::to_string);
    }

    /// The next `count` patches lose a race against a concurrent writer
    pub(crate) fn inject_conflicts(&self, count: u32) {
        self.state.lock().unwrap().pending_conflicts = count;
    }

    pub(crate) fn patches(&self) -> Vec<RequestPatch> {
        self.state.lock().unwrap().patches.clone()
    }

    pub(crate) fn metrics_calls(&self) -> usize {
        self.state.lock().unwrap().metrics_calls
    }

    /// Current request string of a container
    pub(crate) fn request(&self, container: &str, kind: ResourceKind) -> Option<String> {
        let state = self.state.lock().unwrap();
        let pod = state.pod.as_ref()?;
        pod.spec
            .as_ref()?
            .containers
            .iter()
            .find(|c| c.name == container)?
            .resources
            .as_ref()?
            .requests
            .as_ref()?
            .get(kind.request_key())
            .map(|q| q.0.clone())
    }
}

#[async_trait]
impl MetricsSource for FakeCluster {
    async fn pod_usage(
        &self,
        namespace: &str,
        pod_name: &str,
    ) -> Result<Option<Vec<ContainerUsageSample>>> {
        let mut state = self.state.lock().unwrap();
        state.metrics_calls += 1;

        if let Some(message) = &state.metrics_error {
            return Err(ResizeError::MetricsUnavailable {
                namespace: namespace.to_string(),
                pod: pod_name.to_string(),
                message: message.clone(),
            });
        }
        Ok(state.usage.clone())
    }
}

#[async_trait]
impl PodSpecSource for FakeCluster {
    async fn get_pod(&self, _namespace: &str, _pod_name: &str) -> Result<Option<Pod>> {
        let state = self.state.lock().unwrap();
        Ok(state.pod.clone().map(|mut pod| {
            pod.metadata.resource_version = Some(state.resource_version.to_string());
            pod
        }))
    }

    async fn patch_requests(
        &self,
        namespace: &str,
        pod_name: &str,
        patch: &RequestPatch,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();

        if let Some(message) = &state.patch_error {
            return Err(ResizeError::UpdateFailure {
                pod: pod_name.to_string(),
                message: message.clone(),
            });
        }

        if state.pending_conflicts > 0 {
            state.pending_conflicts -= 1;
            state.resource_version += 1;
            return Err(ResizeError::Conflict {
                pod: pod_name.to_string(),
            });
        }

        let current_version = state.resource_version.to_string();
        if patch
            .resource_version
            .as_ref()
            .is_some_and(|v| *v != current_version)
        {
            return Err(ResizeError::Conflict {
                pod: pod_name.to_string(),
            });
        }

        let pod = state.pod.as_mut().ok_or_else(|| ResizeError::PodNotFound {
            namespace: namespace.to_string(),
            pod: pod_name.to_string(),
        })?;
        let containers = &mut pod.spec.get_or_insert_with(PodSpec::default).containers;

        for assignment in &patch.assignments {
            let container = containers
                .iter_mut()
                .find(|c| c.name == assignment.container_name)
                .ok_or_else(|| ResizeError::UpdateFailure {
                    pod: pod_name.to_string(),
                    message: format!("no container {}", assignment.container_name),
                })?;
            container
                .resources
                .get_or_insert_with(ResourceRequirements::default)
                .requests
                .get_or_insert_with(BTreeMap::new)
                .insert(
                    assignment.kind.request_key().to_string(),
                    Quantity(assignment.quantity.clone()),
                );
        }

        state.resource_version += 1;
        state.patches.push(patch.clone());
        Ok(())
    }
}

pub(crate) fn build_pod(namespace: &str, name: &str, containers: &[ContainerRequests<'_>]) -> Pod {
    let containers = containers
        .iter()
        .map(|(container, cpu, memory)| {
            let mut requests = BTreeMap::new();
            if !cpu.is_empty() {
                requests.insert("cpu".to_string(), Quantity(cpu.to_string()));
            }
            if !memory.is_empty() {
                requests.insert("memory".to_string(), Quantity(memory.to_string()));
            }
            Container {
                name: container.to_string(),
                resources: Some(ResourceRequirements {
                    requests: Some(requests),
                    ..ResourceRequirements::default()
                }),
                ..Container::default()
            }
        })
        .collect();

    Pod {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..ObjectMeta::default()
        },
        spec: Some(PodSpec {
            containers,
            ..PodSpec::default()
        }),
        ..Pod::default()
    }
}
