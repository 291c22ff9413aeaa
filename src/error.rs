//! Error types for the integration health tracker

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while tracking integration health
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // =========================================================================
    // Counter Store Errors
    // =========================================================================
    /// Counter store operation failed
    #[error("Counter store error for key {key}: {reason}")]
    Store { key: String, reason: String },

    /// Counter store is unreachable
    #[error("Counter store unavailable: {0}")]
    StoreUnavailable(String),

    // =========================================================================
    // Lifecycle Errors
    // =========================================================================
    /// Lifecycle manager rejected or failed the disable transition
    #[error("Failed to disable integration {integration}: {reason}")]
    Lifecycle { integration: String, reason: String },

    /// Lifecycle manager connection error
    #[error("Lifecycle manager connection error: {0}")]
    LifecycleConnection(#[source] reqwest::Error),

    /// Feature flag lookup failed
    #[error("Feature flag lookup for {flag} failed: {reason}")]
    FeatureFlag { flag: String, reason: String },

    // =========================================================================
    // Input Errors
    // =========================================================================
    /// Outcome kind is not one of success, error, fatal
    #[error("Invalid outcome kind: {0}")]
    InvalidOutcomeKind(String),

    /// Integration key is empty or malformed
    #[error("Invalid integration key: {0}")]
    InvalidKey(String),

    // =========================================================================
    // Configuration / Plumbing Errors
    // =========================================================================
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// YAML configuration parse error
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Prometheus registry error
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Build a store error for the given key.
    pub fn store(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Store {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Build a lifecycle error for the given integration.
    pub fn lifecycle(integration: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Lifecycle {
            integration: integration.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::store("integration-health:slack:1", "connection reset");
        assert_eq!(
            err.to_string(),
            "Counter store error for key integration-health:slack:1: connection reset"
        );

        let err = Error::lifecycle("integration-health:slack:1", "timeout");
        assert_eq!(
            err.to_string(),
            "Failed to disable integration integration-health:slack:1: timeout"
        );

        let err = Error::InvalidOutcomeKind("warning".into());
        assert_eq!(err.to_string(), "Invalid outcome kind: warning");
    }
}
