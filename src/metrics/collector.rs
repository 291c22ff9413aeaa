//! Tracker Metrics
//!
//! Prometheus counters for outcome writes, health evaluations and disable
//! decisions. Registered on a private registry so several trackers (and
//! tests) can coexist in one process.

use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

use crate::domain::ports::OutcomeKind;
use crate::error::{Error, Result};

/// Result label of a health evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluationResult {
    Healthy,
    Broken,
    /// The log could not be read; treated as healthy.
    Unknown,
}

impl EvaluationResult {
    fn as_str(&self) -> &'static str {
        match self {
            EvaluationResult::Healthy => "healthy",
            EvaluationResult::Broken => "broken",
            EvaluationResult::Unknown => "unknown",
        }
    }
}

/// Result label of a disable decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisableResult {
    Triggered,
    AlreadyDisabled,
    Suppressed,
    Failed,
}

impl DisableResult {
    fn as_str(&self) -> &'static str {
        match self {
            DisableResult::Triggered => "triggered",
            DisableResult::AlreadyDisabled => "already_disabled",
            DisableResult::Suppressed => "suppressed",
            DisableResult::Failed => "failed",
        }
    }
}

/// Counters exported by the tracker
pub struct TrackerMetrics {
    registry: Registry,
    outcomes_recorded: IntCounterVec,
    outcomes_dropped: IntCounterVec,
    evaluations: IntCounterVec,
    disables: IntCounterVec,
}

impl TrackerMetrics {
    /// Create the counters on a fresh registry.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let outcomes_recorded = IntCounterVec::new(
            Opts::new(
                "integration_health_outcomes_recorded_total",
                "Request outcomes written to the counter store",
            ),
            &["kind"],
        )?;
        let outcomes_dropped = IntCounterVec::new(
            Opts::new(
                "integration_health_outcomes_dropped_total",
                "Request outcomes dropped because the store write failed",
            ),
            &["kind"],
        )?;
        let evaluations = IntCounterVec::new(
            Opts::new(
                "integration_health_evaluations_total",
                "Broken-state evaluations by result",
            ),
            &["result"],
        )?;
        let disables = IntCounterVec::new(
            Opts::new(
                "integration_health_disables_total",
                "Auto-disable decisions for broken integrations",
            ),
            &["result"],
        )?;

        registry.register(Box::new(outcomes_recorded.clone()))?;
        registry.register(Box::new(outcomes_dropped.clone()))?;
        registry.register(Box::new(evaluations.clone()))?;
        registry.register(Box::new(disables.clone()))?;

        Ok(Self {
            registry,
            outcomes_recorded,
            outcomes_dropped,
            evaluations,
            disables,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn outcome_recorded(&self, kind: OutcomeKind) {
        self.outcomes_recorded
            .with_label_values(&[kind.as_str()])
            .inc();
    }

    pub fn outcome_dropped(&self, kind: OutcomeKind) {
        self.outcomes_dropped.with_label_values(&[kind.as_str()]).inc();
    }

    pub fn evaluation(&self, result: EvaluationResult) {
        self.evaluations.with_label_values(&[result.as_str()]).inc();
    }

    pub fn disable(&self, result: DisableResult) {
        self.disables.with_label_values(&[result.as_str()]).inc();
    }

    pub fn recorded_count(&self, kind: OutcomeKind) -> u64 {
        self.outcomes_recorded
            .with_label_values(&[kind.as_str()])
            .get()
    }

    pub fn dropped_count(&self, kind: OutcomeKind) -> u64 {
        self.outcomes_dropped.with_label_values(&[kind.as_str()]).get()
    }

    pub fn evaluation_count(&self, result: EvaluationResult) -> u64 {
        self.evaluations.with_label_values(&[result.as_str()]).get()
    }

    pub fn disable_count(&self, result: DisableResult) -> u64 {
        self.disables.with_label_values(&[result.as_str()]).get()
    }

    /// Render all counters in the Prometheus text exposition format.
    pub fn export_text(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| Error::Internal(format!("metrics not UTF-8: {}", e)))
    }
}

impl std::fmt::Debug for TrackerMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackerMetrics").finish_non_exhaustive()
    }
}
