//! Domain Ports (DDD Port/Adapter Pattern)
//!
//! This module defines the core abstractions (ports) that the tracker
//! depends on. Infrastructure adapters implement these traits to provide
//! concrete implementations.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Domain Layer                            │
//! │  ┌─────────────────────────────────────────────────────┐    │
//! │  │                    Ports (Traits)                    │    │
//! │  │  CounterStore │ LifecycleManager │ FeatureFlags     │    │
//! │  │  EventPublisher │ Clock                             │    │
//! │  └─────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Infrastructure Layer                       │
//! │  ┌─────────────────────────────────────────────────────┐    │
//! │  │                  Adapters (Impls)                    │    │
//! │  │  InMemoryCounterStore │ HttpLifecycleManager        │    │
//! │  │  StaticFeatureFlags │ LoggingEventPublisher          │    │
//! │  └─────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::events::DomainEvent;
use crate::error::{Error, Result};

/// Prefix used for canonical integration keys.
pub const KEY_PREFIX: &str = "integration-health";

// =============================================================================
// Value Objects
// =============================================================================

/// Opaque identifier of one integration's request log.
///
/// Used as the counter store partition key. Callers normally build it with
/// [`IntegrationKey::for_integration`] so every worker derives the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IntegrationKey(String);

impl IntegrationKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Canonical key for an integration of the given provider.
    pub fn for_integration(provider: &str, integration_id: u64) -> Self {
        Self(format!(
            "{}:{}:{}",
            KEY_PREFIX,
            provider.to_lowercase(),
            integration_id
        ))
    }

    /// Validate a caller-supplied key.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidKey("key is empty".into()));
        }
        if trimmed.contains('/') || trimmed.chars().any(char::is_whitespace) {
            return Err(Error::InvalidKey(format!(
                "key '{}' contains '/' or whitespace",
                trimmed
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for IntegrationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for IntegrationKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for IntegrationKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Outcome of a single outbound request to an integration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeKind {
    /// The request succeeded.
    Success,
    /// The request failed, possibly transiently.
    Error,
    /// The response says the installation is permanently invalid.
    Fatal,
}

impl OutcomeKind {
    /// Every outcome kind, in storage order.
    pub const ALL: [OutcomeKind; 3] = [OutcomeKind::Success, OutcomeKind::Error, OutcomeKind::Fatal];

    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeKind::Success => "success",
            OutcomeKind::Error => "error",
            OutcomeKind::Fatal => "fatal",
        }
    }
}

impl std::fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OutcomeKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "success" => Ok(OutcomeKind::Success),
            "error" => Ok(OutcomeKind::Error),
            "fatal" => Ok(OutcomeKind::Fatal),
            other => Err(Error::InvalidOutcomeKind(other.to_string())),
        }
    }
}

/// Result of asking the lifecycle manager to disable an integration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisableOutcome {
    /// The integration transitioned from active to disabled.
    Disabled,
    /// The integration was already disabled; nothing changed.
    AlreadyDisabled,
}

impl DisableOutcome {
    /// Whether the call changed persisted state.
    pub fn is_transition(&self) -> bool {
        matches!(self, DisableOutcome::Disabled)
    }
}

// =============================================================================
// Counter Store Port
// =============================================================================

/// Port for a keyed hash of atomic counters with per-key expiry.
///
/// Mirrors the subset of a Redis-style hash the tracker needs: field-level
/// atomic increment, bulk read of all fields of a key, field removal and
/// key TTL.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Atomically add `delta` to `field` of `key`, creating both if absent.
    /// Returns the new value.
    async fn increment(&self, key: &str, field: &str, delta: u64) -> Result<u64>;

    /// Read every field of `key`. A missing key yields an empty map.
    async fn fields(&self, key: &str) -> Result<HashMap<String, u64>>;

    /// Remove the given fields from `key`. Returns how many existed.
    async fn remove_fields(&self, key: &str, fields: &[String]) -> Result<usize>;

    /// Set the time-to-live of `key`.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<()>;

    /// Check that the store is reachable.
    async fn ping(&self) -> Result<()>;
}

// =============================================================================
// Lifecycle Port
// =============================================================================

/// Port for the integration lifecycle manager.
///
/// Implementations must be idempotent: disabling an already disabled
/// integration returns [`DisableOutcome::AlreadyDisabled`].
#[async_trait]
pub trait LifecycleManager: Send + Sync {
    /// Transition the integration to the disabled state.
    async fn disable(&self, integration: &IntegrationKey) -> Result<DisableOutcome>;
}

// =============================================================================
// Feature Flag Port
// =============================================================================

/// Port for feature flag lookups.
#[async_trait]
pub trait FeatureFlags: Send + Sync {
    /// Whether `flag` is enabled for `scope` (e.g. an organization slug).
    async fn is_enabled(&self, flag: &str, scope: &str) -> Result<bool>;
}

// =============================================================================
// Clock Port
// =============================================================================

/// Source of the current time. Day buckets are derived from it.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

// =============================================================================
// Event Publisher Port
// =============================================================================

/// Port for publishing domain events.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish a domain event.
    async fn publish(&self, event: DomainEvent) -> Result<()>;

    /// Publish multiple events.
    async fn publish_all(&self, events: Vec<DomainEvent>) -> Result<()>;
}

// =============================================================================
// Tests
// =============================================================================
