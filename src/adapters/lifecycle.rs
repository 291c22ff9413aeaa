//! Lifecycle Manager Adapters
//!
//! Implements the `LifecycleManager` port. The HTTP adapter talks to the
//! service that owns integration status; the in-memory adapter keeps status
//! in-process for single-node deployments and tests.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::domain::ports::{DisableOutcome, IntegrationKey, LifecycleManager};
use crate::error::{Error, Result};

/// Persisted status of an integration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntegrationStatus {
    #[default]
    Active,
    Disabled,
}

impl std::fmt::Display for IntegrationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IntegrationStatus::Active => write!(f, "active"),
            IntegrationStatus::Disabled => write!(f, "disabled"),
        }
    }
}

// =============================================================================
// In-Memory Lifecycle Manager
// =============================================================================

/// In-process integration status table.
#[derive(Debug, Default)]
pub struct InMemoryLifecycleManager {
    statuses: DashMap<IntegrationKey, IntegrationStatus>,
    calls: AtomicU64,
    transitions: AtomicU64,
    failing: AtomicBool,
}

impl InMemoryLifecycleManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current status; integrations never seen are active.
    pub fn status(&self, integration: &IntegrationKey) -> IntegrationStatus {
        self.statuses
            .get(integration)
            .map(|status| *status)
            .unwrap_or_default()
    }

    /// Re-enable an integration, e.g. after the user reinstalls it.
    pub fn enable(&self, integration: &IntegrationKey) {
        self.statuses
            .insert(integration.clone(), IntegrationStatus::Active);
    }

    /// Number of `disable` calls received.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    /// Number of active → disabled transitions performed.
    pub fn transitions(&self) -> u64 {
        self.transitions.load(Ordering::Relaxed)
    }

    /// Make every `disable` call fail, simulating an unreachable manager.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl LifecycleManager for InMemoryLifecycleManager {
    async fn disable(&self, integration: &IntegrationKey) -> Result<DisableOutcome> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::lifecycle(
                integration.as_str(),
                "lifecycle manager unreachable",
            ));
        }

        let mut status = self.statuses.entry(integration.clone()).or_default();
        if *status == IntegrationStatus::Disabled {
            return Ok(DisableOutcome::AlreadyDisabled);
        }
        *status = IntegrationStatus::Disabled;
        self.transitions.fetch_add(1, Ordering::Relaxed);
        Ok(DisableOutcome::Disabled)
    }
}

// =============================================================================
// HTTP Lifecycle Manager
// =============================================================================

/// Lifecycle manager reached over HTTP.
///
/// Calls `POST {base_url}/integrations/{key}/disable`. A 2xx answer means the
/// integration was disabled, 409 means it already was.
pub struct HttpLifecycleManager {
    base_url: String,
    client: Client,
}

impl HttpLifecycleManager {
    /// Create a manager for `base_url` with a per-request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    /// URL of the disable endpoint for `integration`.
    pub fn disable_url(&self, integration: &IntegrationKey) -> String {
        format!(
            "{}/integrations/{}/disable",
            self.base_url,
            urlencoding::encode(integration.as_str())
        )
    }
}

impl std::fmt::Debug for HttpLifecycleManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpLifecycleManager")
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[async_trait]
impl LifecycleManager for HttpLifecycleManager {
    #[instrument(skip_all, fields(integration = %integration))]
    async fn disable(&self, integration: &IntegrationKey) -> Result<DisableOutcome> {
        let url = self.disable_url(integration);
        debug!("Requesting disable: {}", url);

        let response = self
            .client
            .post(&url)
            .send()
            .await
            .map_err(Error::LifecycleConnection)?;

        let status = response.status();
        if status.is_success() {
            info!("Lifecycle manager disabled integration");
            Ok(DisableOutcome::Disabled)
        } else if status == StatusCode::CONFLICT {
            debug!("Integration already disabled");
            Ok(DisableOutcome::AlreadyDisabled)
        } else {
            Err(Error::lifecycle(
                integration.as_str(),
                format!("unexpected status {}", status),
            ))
        }
    }
}
