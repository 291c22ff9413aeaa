//! Health Checks
//!
//! Liveness and readiness probes. Readiness pings the counter store.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::ports::CounterStore;

/// Store pings slower than this report `Degraded`.
const SLOW_PING: Duration = Duration::from_millis(250);

/// Health status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    /// Service is healthy
    Healthy,
    /// Service is degraded but operational
    Degraded,
    /// Service is unhealthy
    Unhealthy,
}

impl HealthStatus {
    /// Check if status is healthy or degraded (operational)
    pub fn is_operational(&self) -> bool {
        matches!(self, HealthStatus::Healthy | HealthStatus::Degraded)
    }

    pub fn is_healthy(&self) -> bool {
        *self == HealthStatus::Healthy
    }

    fn severity(&self) -> u8 {
        match self {
            HealthStatus::Healthy => 0,
            HealthStatus::Degraded => 1,
            HealthStatus::Unhealthy => 2,
        }
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "Healthy"),
            HealthStatus::Degraded => write!(f, "Degraded"),
            HealthStatus::Unhealthy => write!(f, "Unhealthy"),
        }
    }
}

/// Result of a single probe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub name: String,
    pub status: HealthStatus,
    pub message: Option<String>,
    pub duration_ms: u64,
}

impl HealthCheckResult {
    pub fn healthy(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: HealthStatus::Healthy,
            message: None,
            duration_ms: 0,
        }
    }

    pub fn degraded(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: HealthStatus::Degraded,
            message: Some(message.into()),
            duration_ms: 0,
        }
    }

    pub fn unhealthy(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: HealthStatus::Unhealthy,
            message: Some(message.into()),
            duration_ms: 0,
        }
    }

    /// Set duration
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration_ms = duration.as_millis() as u64;
        self
    }
}

/// Overall health response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Worst status among the checks
    pub status: HealthStatus,
    pub checks: Vec<HealthCheckResult>,
    pub version: String,
    pub uptime_seconds: u64,
}

impl HealthResponse {
    pub fn new(checks: Vec<HealthCheckResult>, uptime: Duration) -> Self {
        let status = checks
            .iter()
            .map(|c| c.status)
            .max_by_key(HealthStatus::severity)
            .unwrap_or(HealthStatus::Healthy);

        Self {
            status,
            checks,
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: uptime.as_secs(),
        }
    }
}

/// Health check manager
pub struct HealthCheck {
    start_time: Instant,
    live: AtomicBool,
    store: Arc<dyn CounterStore>,
}

impl HealthCheck {
    /// Create a manager whose readiness depends on `store`.
    pub fn new(store: Arc<dyn CounterStore>) -> Self {
        Self {
            start_time: Instant::now(),
            live: AtomicBool::new(true),
            store,
        }
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::Relaxed)
    }

    /// Mark the process as live or not, e.g. during shutdown.
    pub fn set_live(&self, live: bool) {
        self.live.store(live, Ordering::Relaxed);
    }

    pub fn liveness_check(&self) -> HealthCheckResult {
        if self.is_live() {
            HealthCheckResult::healthy("liveness")
        } else {
            HealthCheckResult::unhealthy("liveness", "Shutting down")
        }
    }

    /// Ping the counter store.
    pub async fn readiness_check(&self) -> HealthCheckResult {
        let start = Instant::now();
        let result = self.store.ping().await;
        let elapsed = start.elapsed();

        let check = match result {
            Ok(()) if elapsed > SLOW_PING => HealthCheckResult::degraded(
                "counter_store",
                format!("Ping took {}ms", elapsed.as_millis()),
            ),
            Ok(()) => HealthCheckResult::healthy("counter_store"),
            Err(e) => {
                warn!(error = %e, "Counter store readiness check failed");
                HealthCheckResult::unhealthy("counter_store", e.to_string())
            }
        };
        check.with_duration(elapsed)
    }

    /// Run all health checks
    pub async fn check_all(&self) -> HealthResponse {
        let checks = vec![self.liveness_check(), self.readiness_check().await];
        HealthResponse::new(checks, self.uptime())
    }
}

impl std::fmt::Debug for HealthCheck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthCheck")
            .field("live", &self.is_live())
            .field("uptime", &self.uptime())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryCounterStore;

    fn store() -> Arc<InMemoryCounterStore> {
        Arc::new(InMemoryCounterStore::new())
    }

    #[test]
    fn test_health_status() {
        assert!(HealthStatus::Healthy.is_healthy());
        assert!(HealthStatus::Healthy.is_operational());
        assert!(!HealthStatus::Degraded.is_healthy());
        assert!(HealthStatus::Degraded.is_operational());
        assert!(!HealthStatus::Unhealthy.is_operational());
    }

    #[test]
    fn test_health_response_takes_worst_status() {
        let checks = vec![
            HealthCheckResult::healthy("check1"),
            HealthCheckResult::degraded("check2", "slow"),
        ];

        let response = HealthResponse::new(checks, Duration::from_secs(60));
        assert_eq!(response.status, HealthStatus::Degraded);
        assert_eq!(response.uptime_seconds, 60);
    }

    #[tokio::test]
    async fn test_readiness_follows_store() {
        let store = store();
        let health = HealthCheck::new(store.clone());

        assert_eq!(health.readiness_check().await.status, HealthStatus::Healthy);

        store.set_available(false);
        let check = health.readiness_check().await;
        assert_eq!(check.status, HealthStatus::Unhealthy);
        assert!(check.message.is_some());
    }

    #[tokio::test]
    async fn test_liveness_toggle() {
        let health = HealthCheck::new(store());
        assert!(health.liveness_check().status.is_healthy());

        health.set_live(false);
        assert_eq!(health.liveness_check().status, HealthStatus::Unhealthy);
    }

    #[tokio::test]
    async fn test_check_all() {
        let health = HealthCheck::new(store());
        let response = health.check_all().await;

        assert_eq!(response.status, HealthStatus::Healthy);
        assert_eq!(response.checks.len(), 2);

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("counter_store"));
    }
}
