//! Service Health
//!
//! Liveness and readiness probes for the sidecar's ops listener.

mod health;

pub use health::{HealthCheck, HealthCheckResult, HealthResponse, HealthStatus};
