//! Static Feature Flags
//!
//! Implements the `FeatureFlags` port from a default plus per-scope
//! overrides, set at start-up or by tests.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::domain::ports::FeatureFlags;
use crate::error::Result;

/// Feature flags held in memory
#[derive(Debug, Default)]
pub struct StaticFeatureFlags {
    default: bool,
    overrides: DashMap<(String, String), bool>,
}

impl StaticFeatureFlags {
    /// Every flag resolves to `default` unless overridden.
    pub fn new(default: bool) -> Self {
        Self {
            default,
            overrides: DashMap::new(),
        }
    }

    /// Builder-style override of `flag` for `scope`.
    pub fn with_override(self, flag: impl Into<String>, scope: impl Into<String>, enabled: bool) -> Self {
        self.set(flag, scope, enabled);
        self
    }

    pub fn set(&self, flag: impl Into<String>, scope: impl Into<String>, enabled: bool) {
        self.overrides.insert((flag.into(), scope.into()), enabled);
    }
}

#[async_trait]
impl FeatureFlags for StaticFeatureFlags {
    async fn is_enabled(&self, flag: &str, scope: &str) -> Result<bool> {
        let enabled = self
            .overrides
            .get(&(flag.to_string(), scope.to_string()))
            .map(|enabled| *enabled)
            .unwrap_or(self.default);
        Ok(enabled)
    }
}
