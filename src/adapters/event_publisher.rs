//! Event Publisher Adapter
//!
//! Implements the `EventPublisher` port: tracing output and an in-memory
//! collector.

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::domain::events::DomainEvent;
use crate::domain::ports::{EventPublisher, IntegrationKey};
use crate::error::Result;

/// Logging-based event publisher.
///
/// Publishes domain events to the tracing system. Disable transitions and
/// dropped outcomes stand out at `warn`; everything else goes to the
/// configured level.
#[derive(Debug, Clone, Default)]
pub struct LoggingEventPublisher {
    info_level: bool,
}

impl LoggingEventPublisher {
    /// Create a publisher that logs at info level.
    pub fn info_level() -> Self {
        Self { info_level: true }
    }

    /// Create a publisher that logs at debug level.
    pub fn debug_level() -> Self {
        Self { info_level: false }
    }
}

#[async_trait]
impl EventPublisher for LoggingEventPublisher {
    async fn publish(&self, event: DomainEvent) -> Result<()> {
        let event_type = event.event_type();
        let integration = event.integration().to_string();
        let json = serde_json::to_string(&event)?;

        match event {
            DomainEvent::IntegrationDisabled { .. } | DomainEvent::OutcomeDropped { .. } => {
                warn!(event_type = %event_type, integration = %integration, event = %json, "Domain event");
            }
            _ if self.info_level => {
                info!(event_type = %event_type, integration = %integration, event = %json, "Domain event");
            }
            _ => {
                debug!(event_type = %event_type, integration = %integration, event = %json, "Domain event");
            }
        }

        Ok(())
    }

    async fn publish_all(&self, events: Vec<DomainEvent>) -> Result<()> {
        for event in events {
            self.publish(event).await?;
        }
        Ok(())
    }
}

/// Keeps published events in memory, in publish order.
///
/// Used by tests and by embedders that inspect decisions after the fact.
#[derive(Debug, Default)]
pub struct InMemoryEventCollector {
    events: parking_lot::Mutex<Vec<DomainEvent>>,
}

impl InMemoryEventCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything published so far.
    pub fn events(&self) -> Vec<DomainEvent> {
        self.events.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }

    /// Events whose `event_type()` is `event_type`.
    pub fn events_of_type(&self, event_type: &str) -> Vec<DomainEvent> {
        self.filtered(|e| e.event_type() == event_type)
    }

    /// Events concerning one integration.
    pub fn events_for(&self, integration: &IntegrationKey) -> Vec<DomainEvent> {
        self.filtered(|e| e.integration() == integration.as_str())
    }

    fn filtered(&self, keep: impl Fn(&DomainEvent) -> bool) -> Vec<DomainEvent> {
        self.events.lock().iter().filter(|e| keep(e)).cloned().collect()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventCollector {
    async fn publish(&self, event: DomainEvent) -> Result<()> {
        self.events.lock().push(event);
        Ok(())
    }

    async fn publish_all(&self, events: Vec<DomainEvent>) -> Result<()> {
        self.events.lock().extend(events);
        Ok(())
    }
}
