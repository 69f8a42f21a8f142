//! Writing resize decisions back to the live pod spec
//!
//! Each update re-reads the pod, builds a request patch guarded by the
//! observed resourceVersion and submits it. A conflict means someone else
//! wrote the pod in between; the read-modify-write is then repeated with the
//! fresh version, up to the configured number of retries.

use crate::cluster::PodSpecSource;
use crate::config::UpdateScope;
use crate::error::{ResizeError, Result};
use crate::models::{RequestAssignment, RequestPatch, ResizeDecision};
use crate::quantity;
use crate::spec_reader::find_container;
use k8s_openapi::api::core::v1::Pod;
use std::sync::Arc;
use tracing::{debug, warn};

/// What an applied update changed
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedUpdate {
    /// Encoded quantity written, e.g. "1100m"
    pub quantity: String,
    /// Containers whose request was rewritten
    pub containers: Vec<String>,
    /// Conflicts retried before the write went through
    pub conflicts: u32,
}

/// Applies one decision per call to the pod spec
#[derive(Clone)]
pub struct ResourceUpdater {
    source: Arc<dyn PodSpecSource>,
    scope: UpdateScope,
    max_conflict_retries: u32,
}

impl ResourceUpdater {
    pub fn new(source: Arc<dyn PodSpecSource>, scope: UpdateScope, max_conflict_retries: u32) -> Self {
        Self {
            source,
            scope,
            max_conflict_retries,
        }
    }

    /// Write `decision.new_value` to the pod
    ///
    /// With `UpdateScope::Pod` every container of the pod receives the value,
    /// with `UpdateScope::Container` only `trigger_container` does.
    pub async fn apply(
        &self,
        namespace: &str,
        pod_name: &str,
        trigger_container: &str,
        decision: &ResizeDecision,
    ) -> Result<AppliedUpdate> {
        let quantity = quantity::encode(decision.kind, decision.new_value);
        let mut conflicts = 0;

        loop {
            let pod = self
                .source
                .get_pod(namespace, pod_name)
                .await?
                .ok_or_else(|| ResizeError::PodNotFound {
                    namespace: namespace.to_string(),
                    pod: pod_name.to_string(),
                })?;

            let containers = self.target_containers(&pod, pod_name, trigger_container)?;
            let patch = RequestPatch {
                resource_version: pod.metadata.resource_version.clone(),
                assignments: containers
                    .iter()
                    .map(|name| RequestAssignment {
                        container_name: name.clone(),
                        kind: decision.kind,
                        quantity: quantity.clone(),
                    })
                    .collect(),
            };

            match self.source.patch_requests(namespace, pod_name, &patch).await {
                Ok(()) => {
                    return Ok(AppliedUpdate {
                        quantity,
                        containers,
                        conflicts,
                    })
                }
                Err(ResizeError::Conflict { .. }) if conflicts < self.max_conflict_retries => {
                    conflicts += 1;
                    debug!(
                        pod = %pod_name,
                        attempt = conflicts,
                        "Pod modified concurrently, re-reading before retry"
                    );
                }
                Err(ResizeError::Conflict { .. }) => {
                    warn!(pod = %pod_name, conflicts = conflicts, "Giving up after repeated write conflicts");
                    return Err(ResizeError::UpdateFailure {
                        pod: pod_name.to_string(),
                        message: format!(
                            "resourceVersion conflict persisted after {} retries",
                            self.max_conflict_retries
                        ),
                    });
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn target_containers(
        &self,
        pod: &Pod,
        pod_name: &str,
        trigger_container: &str,
    ) -> Result<Vec<String>> {
        match self.scope {
            UpdateScope::Pod => {
                let names: Vec<String> = pod
                    .spec
                    .iter()
                    .flat_map(|spec| spec.containers.iter().map(|c| c.name.clone()))
                    .collect();
                if names.is_empty() {
                    return Err(ResizeError::UpdateFailure {
                        pod: pod_name.to_string(),
                        message: "pod spec has no containers".to_string(),
                    });
                }
                Ok(names)
            }
            UpdateScope::Container => find_container(pod, trigger_container)
                .map(|c| vec![c.name.clone()])
                .ok_or_else(|| ResizeError::ContainerNotFound {
                    pod: pod_name.to_string(),
                    container: trigger_container.to_string(),
                }),
        }
    }
}
