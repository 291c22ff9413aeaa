//! Metrics module
//!
//! Prometheus counters describing tracker activity.

mod collector;

pub use collector::{DisableResult, EvaluationResult, TrackerMetrics};
