//! Declared container requests, read from the live pod spec

use crate::cluster::PodSpecSource;
use crate::error::{ResizeError, Result};
use crate::models::{ContainerResourceSpec, ResourceKind};
use crate::quantity;
use k8s_openapi::api::core::v1::{Container, Pod};
use std::sync::Arc;

/// Reads one container's requests fresh on every call
#[derive(Clone)]
pub struct SpecReader {
    source: Arc<dyn PodSpecSource>,
}

impl SpecReader {
    pub fn new(source: Arc<dyn PodSpecSource>) -> Self {
        Self { source }
    }

    pub async fn read(
        &self,
        namespace: &str,
        pod_name: &str,
        container_name: &str,
    ) -> Result<ContainerResourceSpec> {
        let pod = self
            .source
            .get_pod(namespace, pod_name)
            .await?
            .ok_or_else(|| ResizeError::PodNotFound {
                namespace: namespace.to_string(),
                pod: pod_name.to_string(),
            })?;

        let container = find_container(&pod, container_name).ok_or_else(|| {
            ResizeError::ContainerNotFound {
                pod: pod_name.to_string(),
                container: container_name.to_string(),
            }
        })?;

        container_spec(container)
    }
}

pub(crate) fn find_container<'a>(pod: &'a Pod, container_name: &str) -> Option<&'a Container> {
    pod.spec
        .as_ref()?
        .containers
        .iter()
        .find(|c| c.name == container_name)
}

/// Raw request string of one resource, if declared
pub(crate) fn raw_request(container: &Container, kind: ResourceKind) -> Option<&str> {
    container
        .resources
        .as_ref()?
        .requests
        .as_ref()?
        .get(kind.request_key())
        .map(|q| q.0.as_str())
}

fn container_spec(container: &Container) -> Result<ContainerResourceSpec> {
    let raw = |kind: ResourceKind| {
        raw_request(container, kind).ok_or_else(|| {
            ResizeError::invalid_spec(&container.name, format!("no {kind} request declared"))
        })
    };

    let raw_cpu = raw(ResourceKind::Cpu)?;
    let raw_memory = raw(ResourceKind::Memory)?;

    Ok(ContainerResourceSpec {
        container_name: container.name.clone(),
        cpu_request: quantity::normalize_cpu(raw_cpu)?,
        memory_request: quantity::normalize_memory(raw_memory)?,
        raw_cpu_request: raw_cpu.to_string(),
        raw_memory_request: raw_memory.to_string(),
    })
}
