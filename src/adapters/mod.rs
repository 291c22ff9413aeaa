//! Infrastructure Adapters
//!
//! This module contains adapter implementations for the domain ports,
//! following the Port/Adapter (Hexagonal) architecture pattern.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Domain Layer                              │
//! │  ┌────────────────────────────────────────────────────────────┐ │
//! │  │                    Ports (Traits)                           │ │
//! │  │  CounterStore │ LifecycleManager │ FeatureFlags │ Clock    │ │
//! │  └────────────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Adapters (This Module)                       │
//! │  ┌────────────────────────────────────────────────────────────┐ │
//! │  │ InMemoryCounterStore │ HttpLifecycleManager                 │ │
//! │  │ InMemoryLifecycleManager │ StaticFeatureFlags               │ │
//! │  │ SystemClock │ ManualClock │ LoggingEventPublisher           │ │
//! │  └────────────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use integration_health::adapters::{InMemoryCounterStore, InMemoryLifecycleManager};
//! use integration_health::tracker::{IntegrationHealthTracker, TrackerConfig};
//!
//! let tracker = IntegrationHealthTracker::new(
//!     TrackerConfig::default(),
//!     Arc::new(InMemoryCounterStore::new()),
//!     Arc::new(InMemoryLifecycleManager::new()),
//! )?;
//! ```

mod clock;
mod event_publisher;
mod feature_flags;
mod lifecycle;
mod memory_store;

pub use clock::{ManualClock, SystemClock};
pub use event_publisher::{InMemoryEventCollector, LoggingEventPublisher};
pub use feature_flags::StaticFeatureFlags;
pub use lifecycle::{HttpLifecycleManager, InMemoryLifecycleManager, IntegrationStatus};
pub use memory_store::{CounterStoreStats, InMemoryCounterStore};
