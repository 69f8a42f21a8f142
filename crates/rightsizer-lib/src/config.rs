//! Controller configuration
//!
//! Target identity, cadence, thresholds and update behaviour. The binary
//! layers file and environment sources over `ResizerConfig::default()`.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Default sleep between ticks
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

/// Default bound on any single cluster API call
pub const DEFAULT_API_TIMEOUT_SECS: u64 = 10;

pub const DEFAULT_MAX_CONFLICT_RETRIES: u32 = 3;

pub const DEFAULT_FAILURE_ESCALATION_THRESHOLD: u32 = 5;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("pod_name must be set")]
    MissingPodName,

    #[error("namespace must not be empty")]
    EmptyNamespace,

    #[error("{field} must be greater than zero")]
    ZeroDuration { field: &'static str },

    #[error("invalid {resource} policy: {reason}")]
    InvalidPolicy {
        resource: &'static str,
        reason: String,
    },
}

/// Hysteresis thresholds and scale factors for one resource
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdPolicy {
    /// Scale up when utilization is strictly above this percentage
    pub scale_up_above: f64,
    /// Scale down when utilization is strictly below this percentage
    pub scale_down_below: f64,
    pub up_factor: f64,
    pub down_factor: f64,
}

impl ThresholdPolicy {
    pub fn cpu_default() -> Self {
        Self {
            scale_up_above: 70.0,
            scale_down_below: 60.0,
            up_factor: 1.10,
            down_factor: 0.90,
        }
    }

    pub fn memory_default() -> Self {
        Self {
            scale_up_above: 98.0,
            scale_down_below: 80.0,
            up_factor: 1.20,
            down_factor: 0.80,
        }
    }

    fn validate(&self, resource: &'static str) -> Result<(), ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidPolicy { resource, reason };

        for (name, value) in [
            ("scale_up_above", self.scale_up_above),
            ("scale_down_below", self.scale_down_below),
            ("up_factor", self.up_factor),
            ("down_factor", self.down_factor),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(format!("{name} must be a non-negative number")));
            }
        }
        if self.scale_down_below > self.scale_up_above {
            return Err(invalid(format!(
                "scale_down_below ({}) exceeds scale_up_above ({})",
                self.scale_down_below, self.scale_up_above
            )));
        }
        if self.up_factor < 1.0 {
            return Err(invalid(format!("up_factor {} shrinks the request", self.up_factor)));
        }
        if self.down_factor <= 0.0 || self.down_factor > 1.0 {
            return Err(invalid(format!(
                "down_factor {} must be in (0, 1]",
                self.down_factor
            )));
        }
        Ok(())
    }
}

/// Which containers a resize is written to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateScope {
    /// Every container in the pod spec receives the new request
    #[default]
    Pod,
    /// Only the container whose utilization triggered the decision
    Container,
}

/// Configuration of one controller instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResizerConfig {
    pub namespace: String,
    pub pod_name: String,
    pub poll_interval_secs: u64,
    pub api_timeout_secs: u64,
    pub cpu: ThresholdPolicy,
    pub memory: ThresholdPolicy,
    pub update_scope: UpdateScope,
    /// Re-read and retry attempts after a write conflict
    pub max_conflict_retries: u32,
    /// Identical consecutive tick failures before they are escalated
    pub failure_escalation_threshold: u32,
}

impl Default for ResizerConfig {
    fn default() -> Self {
        Self {
            namespace: "default".to_string(),
            pod_name: String::new(),
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            api_timeout_secs: DEFAULT_API_TIMEOUT_SECS,
            cpu: ThresholdPolicy::cpu_default(),
            memory: ThresholdPolicy::memory_default(),
            update_scope: UpdateScope::default(),
            max_conflict_retries: DEFAULT_MAX_CONFLICT_RETRIES,
            failure_escalation_threshold: DEFAULT_FAILURE_ESCALATION_THRESHOLD,
        }
    }
}

impl ResizerConfig {
    /// Configuration targeting one pod with every other field defaulted
    pub fn for_pod(namespace: impl Into<String>, pod_name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            pod_name: pod_name.into(),
            ..Self::default()
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pod_name.trim().is_empty() {
            return Err(ConfigError::MissingPodName);
        }
        if self.namespace.trim().is_empty() {
            return Err(ConfigError::EmptyNamespace);
        }
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::ZeroDuration {
                field: "poll_interval_secs",
            });
        }
        if self.api_timeout_secs == 0 {
            return Err(ConfigError::ZeroDuration {
                field: "api_timeout_secs",
            });
        }
        self.cpu.validate("cpu")?;
        self.memory.validate("memory")?;
        Ok(())
    }
}
