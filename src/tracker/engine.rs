//! Integration Health Tracker
//!
//! Records request outcomes per integration into day buckets, evaluates the
//! broken-state policy and, when a [`DisablePolicy`] allows it, asks the
//! lifecycle manager to disable broken integrations.
//!
//! Recording and evaluation are best-effort: store failures are logged and
//! counted but never surface to the caller's request path. Only the disable
//! call, a real action, reports failure.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use futures::future::join_all;
use tracing::{debug, error, info, instrument, warn};

use super::bucket::{self, IntegrationRequestLog};
use super::classify::ResponseClassifier;
use super::config::TrackerConfig;
use super::policy::{BrokenState, DisablePolicy};
use crate::adapters::{InMemoryCounterStore, InMemoryLifecycleManager, LoggingEventPublisher, SystemClock};
use crate::domain::events::DomainEvent;
use crate::domain::ports::{
    Clock, CounterStore, EventPublisher, IntegrationKey, LifecycleManager, OutcomeKind,
};
use crate::error::Result;
use crate::metrics::{DisableResult, EvaluationResult, TrackerMetrics};

/// Result of evaluating one integration for auto-disable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisableDecision {
    /// Health at evaluation time.
    pub state: BrokenState,
    /// Whether the lifecycle manager was asked to disable the integration.
    pub triggered: bool,
}

/// Per-integration request health tracker
pub struct IntegrationHealthTracker {
    config: TrackerConfig,
    store: Arc<dyn CounterStore>,
    lifecycle: Arc<dyn LifecycleManager>,
    events: Arc<dyn EventPublisher>,
    clock: Arc<dyn Clock>,
    metrics: Arc<TrackerMetrics>,
}

impl IntegrationHealthTracker {
    /// Create a tracker over the given store and lifecycle manager.
    pub fn new(
        config: TrackerConfig,
        store: Arc<dyn CounterStore>,
        lifecycle: Arc<dyn LifecycleManager>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            store,
            lifecycle,
            events: Arc::new(LoggingEventPublisher::debug_level()),
            clock: Arc::new(SystemClock),
            metrics: Arc::new(TrackerMetrics::new()?),
        })
    }

    /// Tracker backed entirely by in-process adapters.
    pub fn in_memory() -> Result<Self> {
        Self::new(
            TrackerConfig::default(),
            Arc::new(InMemoryCounterStore::new()),
            Arc::new(InMemoryLifecycleManager::new()),
        )
    }

    /// Use `clock` for day bucketing.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Publish domain events to `events`.
    pub fn with_event_publisher(mut self, events: Arc<dyn EventPublisher>) -> Self {
        self.events = events;
        self
    }

    /// Share an existing metrics set.
    pub fn with_metrics(mut self, metrics: Arc<TrackerMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<TrackerMetrics> {
        &self.metrics
    }

    pub fn store(&self) -> &Arc<dyn CounterStore> {
        &self.store
    }

    fn today(&self) -> NaiveDate {
        self.clock.now().date_naive()
    }

    // =========================================================================
    // Recording
    // =========================================================================

    pub async fn record_success(&self, key: &IntegrationKey) {
        self.record(key, OutcomeKind::Success).await
    }

    pub async fn record_error(&self, key: &IntegrationKey) {
        self.record(key, OutcomeKind::Error).await
    }

    pub async fn record_fatal(&self, key: &IntegrationKey) {
        self.record(key, OutcomeKind::Fatal).await
    }

    /// Add one outcome of `kind` to today's bucket and evict aged-out days.
    ///
    /// Never fails: a store error drops the outcome.
    #[instrument(skip_all, fields(integration = %key, kind = %kind))]
    pub async fn record(&self, key: &IntegrationKey, kind: OutcomeKind) {
        let now = self.clock.now();
        let today = now.date_naive();
        let field = bucket::field_name(today, kind);

        match self.store.increment(key.as_str(), &field, 1).await {
            Ok(count) => {
                self.metrics.outcome_recorded(kind);
                debug!(count, "Recorded integration outcome");
            }
            Err(e) => {
                self.metrics.outcome_dropped(kind);
                warn!(error = %e, "Dropping integration outcome");
                self.emit(DomainEvent::outcome_dropped(key, kind, e.to_string(), now))
                    .await;
                return;
            }
        }

        if let Err(e) = self.housekeep(key, today).await {
            warn!(error = %e, "Failed to refresh TTL or evict expired buckets");
        }
    }

    /// Classify a vendor response, record it and return its kind.
    pub async fn record_response(
        &self,
        key: &IntegrationKey,
        classifier: &ResponseClassifier,
        status: u16,
        error_code: Option<&str>,
    ) -> OutcomeKind {
        let kind = classifier.classify(status, error_code);
        self.record(key, kind).await;
        kind
    }

    /// Refresh the key TTL and drop fields of days outside the window.
    async fn housekeep(&self, key: &IntegrationKey, today: NaiveDate) -> Result<()> {
        self.store.expire(key.as_str(), self.config.key_ttl()).await?;

        let fields = self.store.fields(key.as_str()).await?;
        let expired = bucket::expired_fields(&fields, today, self.config.buffer_days);
        if !expired.is_empty() {
            let removed = self.store.remove_fields(key.as_str(), &expired).await?;
            debug!(removed, "Evicted expired day buckets");
        }
        Ok(())
    }

    // =========================================================================
    // Evaluation
    // =========================================================================

    /// All retained buckets for `key`, newest first.
    pub async fn request_log(&self, key: &IntegrationKey) -> Result<IntegrationRequestLog> {
        self.request_log_on(key, self.today()).await
    }

    async fn request_log_on(
        &self,
        key: &IntegrationKey,
        today: NaiveDate,
    ) -> Result<IntegrationRequestLog> {
        let fields = self.store.fields(key.as_str()).await?;
        Ok(IntegrationRequestLog::from_fields(
            key.clone(),
            &fields,
            today,
            self.config.buffer_days,
        ))
    }

    /// Evaluate the broken-state policy. A read failure counts as healthy.
    #[instrument(skip_all, fields(integration = %key))]
    pub async fn broken_state(&self, key: &IntegrationKey) -> BrokenState {
        let today = self.today();
        match self.request_log_on(key, today).await {
            Ok(log) => {
                let state = self.config.policy.evaluate(log.buckets(), today);
                if state.is_broken() {
                    self.metrics.evaluation(EvaluationResult::Broken);
                } else {
                    self.metrics.evaluation(EvaluationResult::Healthy);
                }
                state
            }
            Err(e) => {
                self.metrics.evaluation(EvaluationResult::Unknown);
                warn!(error = %e, "Failed to read request log, assuming healthy");
                BrokenState::healthy()
            }
        }
    }

    pub async fn is_broken(&self, key: &IntegrationKey) -> bool {
        self.broken_state(key).await.is_broken()
    }

    /// Evaluate several integrations concurrently.
    pub async fn broken_states(&self, keys: &[IntegrationKey]) -> Vec<(IntegrationKey, BrokenState)> {
        join_all(keys.iter().map(|key| async move {
            let state = self.broken_state(key).await;
            (key.clone(), state)
        }))
        .await
    }

    // =========================================================================
    // Disable
    // =========================================================================

    /// Disable `key` if it is broken and `policy` allows it.
    ///
    /// Returns whether the lifecycle manager was asked to disable it.
    pub async fn maybe_disable(&self, key: &IntegrationKey, policy: &DisablePolicy) -> Result<bool> {
        Ok(self.evaluate(key, policy).await?.triggered)
    }

    /// Like [`maybe_disable`](Self::maybe_disable), also returning the state.
    #[instrument(skip_all, fields(integration = %key))]
    pub async fn evaluate(&self, key: &IntegrationKey, policy: &DisablePolicy) -> Result<DisableDecision> {
        let state = self.broken_state(key).await;
        let Some(reason) = state.reason else {
            return Ok(DisableDecision {
                state,
                triggered: false,
            });
        };

        let now = self.clock.now();
        self.emit(DomainEvent::integration_broken(key, reason.to_string(), now))
            .await;

        if !policy.auto_disable {
            info!(reason = %reason, "Integration is broken, auto-disable is off");
            self.metrics.disable(DisableResult::Suppressed);
            self.emit(DomainEvent::disable_suppressed(key, now)).await;
            return Ok(DisableDecision {
                state,
                triggered: false,
            });
        }

        match self.lifecycle.disable(key).await {
            Ok(outcome) if outcome.is_transition() => {
                info!(reason = %reason, "Disabled broken integration");
                self.metrics.disable(DisableResult::Triggered);
                self.emit(DomainEvent::integration_disabled(key, now)).await;
            }
            Ok(_) => {
                debug!("Integration already disabled");
                self.metrics.disable(DisableResult::AlreadyDisabled);
            }
            Err(e) => {
                error!(error = %e, "Failed to disable broken integration");
                self.metrics.disable(DisableResult::Failed);
                return Err(e);
            }
        }

        Ok(DisableDecision {
            state,
            triggered: true,
        })
    }

    async fn emit(&self, event: DomainEvent) {
        if let Err(e) = self.events.publish(event).await {
            debug!(error = %e, "Failed to publish domain event");
        }
    }

    /// Current time according to the tracker's clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

impl std::fmt::Debug for IntegrationHealthTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntegrationHealthTracker")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Tests
// =============================================================================
