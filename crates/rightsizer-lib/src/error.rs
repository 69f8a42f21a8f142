//! Error taxonomy for a control tick
//!
//! Every failure inside a tick maps to one `ResizeError` variant. The control
//! loop catches them at tick granularity, so none of them is fatal to the
//! process.

use thiserror::Error;

/// Failure of one stage of a control tick
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ResizeError {
    /// The metrics API call itself failed
    #[error("metrics unavailable for {namespace}/{pod}: {message}")]
    MetricsUnavailable {
        namespace: String,
        pod: String,
        message: String,
    },

    /// Reading the pod spec failed for a reason other than absence
    #[error("pod spec unavailable for {namespace}/{pod}: {message}")]
    SpecUnavailable {
        namespace: String,
        pod: String,
        message: String,
    },

    #[error("pod {namespace}/{pod} not found")]
    PodNotFound { namespace: String, pod: String },

    #[error("container {container} not found in pod {pod}")]
    ContainerNotFound { pod: String, container: String },

    /// A quantity string used an unsupported suffix or a malformed number
    #[error("cannot parse quantity {raw:?}: {reason}")]
    ParseError { raw: String, reason: String },

    /// The declared spec cannot be used for utilization (missing or zero request)
    #[error("invalid spec for container {container}: {reason}")]
    InvalidSpec { container: String, reason: String },

    /// The patch was rejected or the write call errored
    #[error("update of pod {pod} failed: {message}")]
    UpdateFailure { pod: String, message: String },

    /// The pod changed between read and write (HTTP 409)
    #[error("pod {pod} was modified concurrently")]
    Conflict { pod: String },

    #[error("{operation} timed out after {timeout_secs}s")]
    Timeout {
        operation: &'static str,
        timeout_secs: u64,
    },
}

impl ResizeError {
    /// Stable label used in metrics and failure streak tracking
    pub fn kind(&self) -> &'static str {
        match self {
            ResizeError::MetricsUnavailable { .. } => "metrics_unavailable",
            ResizeError::SpecUnavailable { .. } => "spec_unavailable",
            ResizeError::PodNotFound { .. } => "pod_not_found",
            ResizeError::ContainerNotFound { .. } => "container_not_found",
            ResizeError::ParseError { .. } => "parse_error",
            ResizeError::InvalidSpec { .. } => "invalid_spec",
            ResizeError::UpdateFailure { .. } => "update_failure",
            ResizeError::Conflict { .. } => "conflict",
            ResizeError::Timeout { .. } => "timeout",
        }
    }

    /// Whether the same call may succeed if simply attempted again
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ResizeError::MetricsUnavailable { .. }
                | ResizeError::SpecUnavailable { .. }
                | ResizeError::Conflict { .. }
                | ResizeError::Timeout { .. }
        )
    }

    /// Whether the failure originated in a cluster API call rather than in local data
    pub fn is_cluster_api(&self) -> bool {
        matches!(
            self,
            ResizeError::MetricsUnavailable { .. }
                | ResizeError::SpecUnavailable { .. }
                | ResizeError::UpdateFailure { .. }
                | ResizeError::Conflict { .. }
                | ResizeError::Timeout { .. }
        )
    }

    pub(crate) fn parse(raw: &str, reason: impl Into<String>) -> Self {
        ResizeError::ParseError {
            raw: raw.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_spec(container: &str, reason: impl Into<String>) -> Self {
        ResizeError::InvalidSpec {
            container: container.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T, E = ResizeError> = std::result::Result<T, E>;
