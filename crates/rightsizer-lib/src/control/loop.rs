//! Control loop driver
//!
//! States cycle `Idle → Sampling → Deciding → Updating → Sleeping → Idle`
//! with no terminal state; only the shutdown signal ends `run`.

use super::FailureStreak;
use crate::cluster::{MetricsSource, PodSpecSource};
use crate::config::ResizerConfig;
use crate::decision::ResizeDecisionEngine;
use crate::error::{ResizeError, Result};
use crate::health::{component_for, components, HealthRegistry};
use crate::models::ContainerUsageSample;
use crate::observability::{ResizerMetrics, StructuredLogger};
use crate::quantity;
use crate::sampler::UsageSampler;
use crate::spec_reader::SpecReader;
use crate::updater::ResourceUpdater;
use crate::utilization;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{debug, info};

/// Streak label for ticks that found no metrics for the pod
const POD_ABSENT_KIND: &str = "pod_absent_from_metrics";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Sampling,
    Deciding,
    Updating,
    Sleeping,
}

/// Result of a tick that ran to completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// The pod is not in the metrics snapshot yet; nothing was evaluated
    PodAbsent,
    Evaluated { containers: usize, resizes: usize },
}

/// Drives the right-sizing of one pod
pub struct ControlLoop {
    config: ResizerConfig,
    sampler: UsageSampler,
    spec_reader: SpecReader,
    engine: ResizeDecisionEngine,
    updater: ResourceUpdater,
    health: HealthRegistry,
    metrics: ResizerMetrics,
    logger: StructuredLogger,
    streak: FailureStreak,
    state: LoopState,
}

impl ControlLoop {
    pub fn new(
        config: ResizerConfig,
        metrics_source: Arc<dyn MetricsSource>,
        spec_source: Arc<dyn PodSpecSource>,
        health: HealthRegistry,
    ) -> Self {
        Self {
            sampler: UsageSampler::new(metrics_source),
            spec_reader: SpecReader::new(spec_source.clone()),
            engine: ResizeDecisionEngine::new(config.cpu, config.memory),
            updater: ResourceUpdater::new(
                spec_source,
                config.update_scope,
                config.max_conflict_retries,
            ),
            health,
            metrics: ResizerMetrics::new(),
            logger: StructuredLogger::new(&config.namespace, &config.pod_name),
            streak: FailureStreak::new(config.failure_escalation_threshold),
            state: LoopState::Idle,
            config,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn config(&self) -> &ResizerConfig {
        &self.config
    }

    /// Run ticks on the fixed cadence until shutdown is signalled
    ///
    /// Shutdown is observed between ticks; a tick in progress always finishes.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        info!(
            namespace = %self.config.namespace,
            pod = %self.config.pod_name,
            interval_secs = self.config.poll_interval_secs,
            "Starting control loop"
        );
        self.health.register(components::CONTROL_LOOP).await;
        self.health.register(components::CLUSTER_API).await;
        self.health.set_ready(true).await;

        loop {
            self.run_once().await;

            tokio::select! {
                _ = tokio::time::sleep(self.config.poll_interval()) => {
                    self.state = LoopState::Idle;
                }
                _ = shutdown.recv() => {
                    info!("Shutting down control loop");
                    break;
                }
            }
        }
    }

    /// One tick with reporting; failures are absorbed here
    pub async fn run_once(&mut self) -> Option<TickOutcome> {
        self.metrics.inc_ticks();
        let start = Instant::now();
        let result = self.tick().await;
        self.metrics
            .observe_tick_duration(start.elapsed().as_secs_f64());
        self.state = LoopState::Sleeping;

        match result {
            Ok(TickOutcome::PodAbsent) => {
                if self.streak.record(POD_ABSENT_KIND) {
                    self.logger.log_failure_escalated(
                        POD_ABSENT_KIND,
                        self.streak.count(),
                        "pod never appeared in the metrics snapshot",
                    );
                }
                Some(TickOutcome::PodAbsent)
            }
            Ok(outcome) => {
                self.streak.reset();
                self.health.record_success().await;
                debug!(outcome = ?outcome, "Control tick complete");
                Some(outcome)
            }
            Err(e) => {
                self.report_failure(&e).await;
                None
            }
        }
    }

    /// Sample, decide and update once, stopping at the first failure
    pub async fn tick(&mut self) -> Result<TickOutcome> {
        let namespace = self.config.namespace.clone();
        let pod_name = self.config.pod_name.clone();

        self.state = LoopState::Sampling;
        let samples = self.sampler.sample(&namespace, &pod_name).await?;
        if samples.is_empty() {
            return Ok(TickOutcome::PodAbsent);
        }

        let mut resizes = 0;
        for sample in &samples {
            resizes += self
                .evaluate_container(&namespace, &pod_name, sample)
                .await?;
        }

        Ok(TickOutcome::Evaluated {
            containers: samples.len(),
            resizes,
        })
    }

    /// Returns the number of updates applied for this container
    async fn evaluate_container(
        &mut self,
        namespace: &str,
        pod_name: &str,
        sample: &ContainerUsageSample,
    ) -> Result<usize> {
        self.state = LoopState::Deciding;
        let spec = self
            .spec_reader
            .read(namespace, pod_name, &sample.container_name)
            .await?;

        let cpu_usage = quantity::normalize_cpu(&sample.cpu_usage)?;
        let memory_usage = quantity::normalize_memory(&sample.memory_usage)?;
        let report = utilization::compute_report(&spec, cpu_usage, memory_usage)?;

        self.logger.log_utilization(&report, &spec);
        self.metrics.set_container_state(&report, &spec);

        let mut applied = 0;
        for decision in self.engine.decide_all(&report, &spec) {
            if !decision.is_change() {
                continue;
            }

            self.state = LoopState::Updating;
            let update = self
                .updater
                .apply(namespace, pod_name, &sample.container_name, &decision)
                .await?;

            self.logger.log_resize(
                &sample.container_name,
                &decision,
                spec.request(decision.kind),
                &update.quantity,
                &update.containers,
            );
            self.metrics.inc_resize(&decision);
            applied += 1;
        }

        Ok(applied)
    }

    async fn report_failure(&mut self, error: &ResizeError) {
        let kind = error.kind();
        self.metrics.inc_tick_failure(kind);
        self.logger
            .log_tick_failure(kind, error.is_retryable(), &error.to_string());
        self.health.record_failure(error).await;

        if self.streak.record(kind) {
            self.logger
                .log_failure_escalated(kind, self.streak.count(), &error.to_string());
        }
        if self.streak.is_escalated() {
            self.health
                .set_degraded(
                    component_for(error),
                    format!("{} consecutive {kind} failures: {error}", self.streak.count()),
                )
                .await;
        }
    }
}

/// Builder for creating the control loop
pub struct ControlLoopBuilder {
    config: ResizerConfig,
    metrics_source: Option<Arc<dyn MetricsSource>>,
    spec_source: Option<Arc<dyn PodSpecSource>>,
    health: Option<HealthRegistry>,
}

impl ControlLoopBuilder {
    pub fn new(config: ResizerConfig) -> Self {
        Self {
            config,
            metrics_source: None,
            spec_source: None,
            health: None,
        }
    }

    pub fn metrics_source(mut self, source: Arc<dyn MetricsSource>) -> Self {
        self.metrics_source = Some(source);
        self
    }

    pub fn spec_source(mut self, source: Arc<dyn PodSpecSource>) -> Self {
        self.spec_source = Some(source);
        self
    }

    /// Use one object for both metrics and pod spec access
    pub fn cluster<C>(self, cluster: Arc<C>) -> Self
    where
        C: MetricsSource + PodSpecSource + 'static,
    {
        self.metrics_source(cluster.clone()).spec_source(cluster)
    }

    pub fn health(mut self, health: HealthRegistry) -> Self {
        self.health = Some(health);
        self
    }

    /// Validate the configuration and build the loop
    pub fn build(self) -> anyhow::Result<ControlLoop> {
        self.config.validate()?;

        let metrics_source = self
            .metrics_source
            .ok_or_else(|| anyhow::anyhow!("Metrics source is required"))?;
        let spec_source = self
            .spec_source
            .ok_or_else(|| anyhow::anyhow!("Pod spec source is required"))?;

        Ok(ControlLoop::new(
            self.config,
            metrics_source,
            spec_source,
            self.health.unwrap_or_default(),
        ))
    }
}
