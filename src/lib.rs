//! Integration Health - Broken Integration Detection
//!
//! Tracks request outcomes of outbound third-party integrations (chat,
//! paging and ticketing providers) and decides when an integration is
//! broken. Outcomes are counted in day buckets over a sliding window; a
//! fatal outcome or a sustained run of error-only days marks the integration
//! broken, and a feature-flag-gated policy may then disable it.
//!
//! # Architecture
//!
//! ```text
//! Senders ──record_*──▶ Tracker ──▶ CounterStore (day buckets, TTL)
//!                          │
//!                          └──maybe_disable──▶ BrokenPolicy ──▶ LifecycleManager
//! ```
//!
//! # Modules
//!
//! - [`adapters`] - Infrastructure adapters implementing domain ports
//! - [`api`] - HTTP routing for the sidecar binary
//! - [`domain`] - Domain layer with ports and events (DDD)
//! - [`error`] - Error types
//! - [`metrics`] - Prometheus metrics
//! - [`monitoring`] - Liveness and readiness probes
//! - [`tracker`] - Day buckets, broken policy and the tracker itself

pub mod adapters;
pub mod api;
pub mod domain;
pub mod error;
pub mod metrics;
pub mod monitoring;
pub mod tracker;

// Re-export commonly used types
pub use domain::{IntegrationKey, OutcomeKind};
pub use error::{Error, Result};
pub use metrics::TrackerMetrics;
pub use tracker::{
    BrokenPolicy, BrokenReason, BrokenState, DisablePolicy, IntegrationHealthTracker,
    TrackerConfig,
};
