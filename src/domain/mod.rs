//! Domain Layer
//!
//! Value objects, ports and events shared by the tracker and its adapters.
//!
//! # Architecture
//!
//! - **Ports** (`ports.rs`) - Trait abstractions for external collaborators
//! - **Events** (`events.rs`) - Domain events for audit and decoupling
//!
//! # Usage
//!
//! ```ignore
//! use integration_health::domain::ports::{CounterStore, IntegrationKey, OutcomeKind};
//!
//! async fn bump<S: CounterStore>(store: &S, key: &IntegrationKey) -> Result<u64> {
//!     store.increment(key.as_str(), "2024-03-01:error", 1).await
//! }
//! ```

pub mod events;
pub mod ports;

pub use events::DomainEvent;
pub use ports::{
    // Port traits
    Clock,
    CounterStore,
    // Value objects
    DisableOutcome,
    EventPublisher,
    FeatureFlags,
    IntegrationKey,
    LifecycleManager,
    OutcomeKind,
};
