//! Integration Health Tracking
//!
//! Decides, per external integration, whether recent request outcomes show
//! it is broken and should be disabled.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     IntegrationHealthTracker                             │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                          │
//! │  record_* ──▶ CounterStore ("YYYY-MM-DD:kind" fields, TTL, eviction)    │
//! │                      │                                                   │
//! │                      ▼                                                   │
//! │            IntegrationRequestLog (day buckets, newest first)             │
//! │                      │                                                   │
//! │                      ▼                                                   │
//! │   BrokenPolicy: fatal trip  OR  sustained error trip                     │
//! │                      │                                                   │
//! │                      ▼                                                   │
//! │   maybe_disable ──▶ DisablePolicy ──▶ LifecycleManager::disable          │
//! │                                                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - **Buckets** (`bucket.rs`): field encoding, day buckets and retention.
//! - **Policy** (`policy.rs`): the two trips, broken state and disable policy.
//! - **Classification** (`classify.rs`): vendor response to outcome kind.
//! - **Engine** (`engine.rs`): the tracker tying store, policy and lifecycle.
//!
//! # Usage
//!
//! ```rust,ignore
//! let tracker = IntegrationHealthTracker::in_memory()?;
//! let key = IntegrationKey::for_integration("slack", 42);
//!
//! tracker.record_fatal(&key).await;
//! assert!(tracker.is_broken(&key).await);
//! tracker.maybe_disable(&key, &DisablePolicy::enabled()).await?;
//! ```

pub mod bucket;
pub mod classify;
pub mod config;
pub mod engine;
pub mod policy;

#[cfg(test)]
mod proptest;

pub use bucket::{DayBucket, IntegrationRequestLog};
pub use classify::ResponseClassifier;
pub use config::TrackerConfig;
pub use engine::{DisableDecision, IntegrationHealthTracker};
pub use policy::{BrokenPolicy, BrokenReason, BrokenState, DisablePolicy};
