//! Hysteresis-banded resize decisions
//!
//! Each resource has a scale-up threshold and a lower scale-down threshold.
//! Utilization strictly above the first multiplies the request by the up
//! factor, strictly below the second multiplies it by the down factor, and
//! anything in between (boundaries included) leaves it alone.
//! A change that would be written as the quantity already declared is
//! reported as no change.
//!
//! Decisions look at the current sample only. There is no smoothing and no
//! cooldown, so a workload hovering around a threshold is resized every tick.

use crate::config::ThresholdPolicy;
use crate::models::{
    ContainerResourceSpec, ResizeDecision, ResizeReason, ResourceKind, UtilizationReport,
};
use crate::quantity;

/// Smallest request the engine will ever propose, in canonical units
pub const MIN_CANONICAL_REQUEST: f64 = 1.0;

/// Applies per-resource threshold policies to utilization
#[derive(Debug, Clone)]
pub struct ResizeDecisionEngine {
    cpu: ThresholdPolicy,
    memory: ThresholdPolicy,
}

impl Default for ResizeDecisionEngine {
    fn default() -> Self {
        Self::new(ThresholdPolicy::cpu_default(), ThresholdPolicy::memory_default())
    }
}

impl ResizeDecisionEngine {
    pub fn new(cpu: ThresholdPolicy, memory: ThresholdPolicy) -> Self {
        Self { cpu, memory }
    }

    pub fn policy(&self, kind: ResourceKind) -> &ThresholdPolicy {
        match kind {
            ResourceKind::Cpu => &self.cpu,
            ResourceKind::Memory => &self.memory,
        }
    }

    /// Decide the new request for one resource
    pub fn decide(&self, kind: ResourceKind, utilization_pct: f64, current: f64) -> ResizeDecision {
        let policy = self.policy(kind);

        let (reason, factor) = if utilization_pct > policy.scale_up_above {
            (ResizeReason::ScaleUp, policy.up_factor)
        } else if utilization_pct < policy.scale_down_below {
            (ResizeReason::ScaleDown, policy.down_factor)
        } else {
            return ResizeDecision {
                kind,
                new_value: current,
                reason: ResizeReason::NoChange,
            };
        };

        let scaled = current * factor;
        let scaled = match kind {
            ResourceKind::Cpu => scaled,
            ResourceKind::Memory => scaled.round(),
        };
        // rounding and the floor must never move a request against its direction
        let new_value = match reason {
            ResizeReason::ScaleDown => scaled.max(MIN_CANONICAL_REQUEST).min(current),
            _ => scaled.max(MIN_CANONICAL_REQUEST).max(current),
        };

        // a change that encodes to the request already declared is no change
        if quantity::encode(kind, new_value) == quantity::encode(kind, current) {
            return ResizeDecision {
                kind,
                new_value: current,
                reason: ResizeReason::NoChange,
            };
        }

        ResizeDecision {
            kind,
            new_value,
            reason,
        }
    }

    /// Decide both resources of a container, CPU first
    pub fn decide_all(
        &self,
        report: &UtilizationReport,
        spec: &ContainerResourceSpec,
    ) -> Vec<ResizeDecision> {
        ResourceKind::ALL
            .iter()
            .map(|&kind| self.decide(kind, report.pct(kind), spec.request(kind)))
            .collect()
    }
}
