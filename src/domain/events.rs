//! Domain Events
//!
//! Immutable records of things the tracker observed or did. The tracker
//! publishes them through the [`EventPublisher`](super::ports::EventPublisher)
//! port so audit logs and notification fan-out stay decoupled from the
//! health decision itself.
//!
//! # Example
//!
//! ```ignore
//! let event = DomainEvent::integration_disabled(&key, clock.now());
//! event_publisher.publish(event).await?;
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ports::{IntegrationKey, OutcomeKind};

/// Domain event representing a significant occurrence in the tracker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DomainEvent {
    /// The integration's request log failed the health policy.
    IntegrationBroken {
        integration: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// The lifecycle manager disabled the integration.
    IntegrationDisabled {
        integration: String,
        timestamp: DateTime<Utc>,
    },

    /// The integration is broken but auto-disable is switched off.
    DisableSuppressed {
        integration: String,
        timestamp: DateTime<Utc>,
    },

    /// An outcome could not be written and was dropped.
    OutcomeDropped {
        integration: String,
        kind: OutcomeKind,
        reason: String,
        timestamp: DateTime<Utc>,
    },
}

impl DomainEvent {
    /// Get the timestamp of the event.
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            DomainEvent::IntegrationBroken { timestamp, .. } => *timestamp,
            DomainEvent::IntegrationDisabled { timestamp, .. } => *timestamp,
            DomainEvent::DisableSuppressed { timestamp, .. } => *timestamp,
            DomainEvent::OutcomeDropped { timestamp, .. } => *timestamp,
        }
    }

    /// Get the event type name.
    pub fn event_type(&self) -> &'static str {
        match self {
            DomainEvent::IntegrationBroken { .. } => "IntegrationBroken",
            DomainEvent::IntegrationDisabled { .. } => "IntegrationDisabled",
            DomainEvent::DisableSuppressed { .. } => "DisableSuppressed",
            DomainEvent::OutcomeDropped { .. } => "OutcomeDropped",
        }
    }

    /// Get the integration key the event refers to.
    pub fn integration(&self) -> &str {
        match self {
            DomainEvent::IntegrationBroken { integration, .. }
            | DomainEvent::IntegrationDisabled { integration, .. }
            | DomainEvent::DisableSuppressed { integration, .. }
            | DomainEvent::OutcomeDropped { integration, .. } => integration,
        }
    }
}

// =============================================================================
// Event Builders
// =============================================================================

impl DomainEvent {
    /// Create an IntegrationBroken event.
    pub fn integration_broken(
        integration: &IntegrationKey,
        reason: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        DomainEvent::IntegrationBroken {
            integration: integration.to_string(),
            reason: reason.into(),
            timestamp,
        }
    }

    /// Create an IntegrationDisabled event.
    pub fn integration_disabled(integration: &IntegrationKey, timestamp: DateTime<Utc>) -> Self {
        DomainEvent::IntegrationDisabled {
            integration: integration.to_string(),
            timestamp,
        }
    }

    /// Create a DisableSuppressed event.
    pub fn disable_suppressed(integration: &IntegrationKey, timestamp: DateTime<Utc>) -> Self {
        DomainEvent::DisableSuppressed {
            integration: integration.to_string(),
            timestamp,
        }
    }

    /// Create an OutcomeDropped event.
    pub fn outcome_dropped(
        integration: &IntegrationKey,
        kind: OutcomeKind,
        reason: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        DomainEvent::OutcomeDropped {
            integration: integration.to_string(),
            kind,
            reason: reason.into(),
            timestamp,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
