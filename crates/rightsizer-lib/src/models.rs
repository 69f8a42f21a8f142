//! Core data models for the rightsizer
//!
//! All of these are cycle-scoped values: they are produced during one control
//! tick and dropped at its end.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Resource dimension the controller manages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Cpu,
    Memory,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 2] = [ResourceKind::Cpu, ResourceKind::Memory];

    /// Key of this resource in a container's `resources.requests` map
    pub fn request_key(&self) -> &'static str {
        match self {
            ResourceKind::Cpu => "cpu",
            ResourceKind::Memory => "memory",
        }
    }

    /// Canonical unit used internally
    pub fn canonical_unit(&self) -> &'static str {
        match self {
            ResourceKind::Cpu => "millicores",
            ResourceKind::Memory => "MiB",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.request_key())
    }
}

/// Raw usage of one container, as reported by the metrics API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerUsageSample {
    pub container_name: String,
    pub cpu_usage: String,
    pub memory_usage: String,
}

/// Declared requests of one container, normalized to canonical units
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerResourceSpec {
    pub container_name: String,
    /// Millicores
    pub cpu_request: f64,
    /// MiB
    pub memory_request: f64,
    /// Request strings as declared, kept for reporting
    pub raw_cpu_request: String,
    pub raw_memory_request: String,
}

impl ContainerResourceSpec {
    pub fn request(&self, kind: ResourceKind) -> f64 {
        match kind {
            ResourceKind::Cpu => self.cpu_request,
            ResourceKind::Memory => self.memory_request,
        }
    }
}

/// Usage as a percentage of request, per resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UtilizationReport {
    pub container_name: String,
    pub cpu_pct: f64,
    pub mem_pct: f64,
}

impl UtilizationReport {
    pub fn pct(&self, kind: ResourceKind) -> f64 {
        match kind {
            ResourceKind::Cpu => self.cpu_pct,
            ResourceKind::Memory => self.mem_pct,
        }
    }
}

/// Why a decision was taken
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizeReason {
    ScaleUp,
    ScaleDown,
    NoChange,
}

impl ResizeReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResizeReason::ScaleUp => "scale_up",
            ResizeReason::ScaleDown => "scale_down",
            ResizeReason::NoChange => "no_change",
        }
    }
}

/// Outcome of the decision engine for one resource of one container
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResizeDecision {
    pub kind: ResourceKind,
    /// New request in canonical units (equal to the current one on `NoChange`)
    pub new_value: f64,
    pub reason: ResizeReason,
}

impl ResizeDecision {
    pub fn is_change(&self) -> bool {
        self.reason != ResizeReason::NoChange
    }
}

/// One request assignment inside a patch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestAssignment {
    pub container_name: String,
    pub kind: ResourceKind,
    /// Encoded quantity, e.g. "1100m" or "240Mi"
    pub quantity: String,
}

/// Partial update of container requests, guarded by the observed resourceVersion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestPatch {
    pub resource_version: Option<String>,
    pub assignments: Vec<RequestAssignment>,
}
