//! Core library for the pod rightsizer
//!
//! This crate provides the core functionality for:
//! - Sampling live container usage from the metrics API
//! - Reading and normalizing declared resource requests
//! - Threshold-based resize decisions
//! - Patching requests back onto the pod
//! - Health checks and observability

pub mod cluster;
pub mod config;
pub mod control;
pub mod decision;
pub mod error;
pub mod health;
pub mod models;
pub mod observability;
pub mod quantity;
pub mod sampler;
pub mod spec_reader;
pub mod updater;
pub mod utilization;

pub use config::{ConfigError, ResizerConfig, ThresholdPolicy, UpdateScope};
pub use control::{ControlLoop, ControlLoopBuilder, LoopState, TickOutcome};
pub use error::{ResizeError, Result};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{ResizerMetrics, StructuredLogger};
