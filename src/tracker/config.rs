//! Tracker configuration

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::policy::BrokenPolicy;
use crate::error::{Error, Result};

/// Default number of day buckets retained per integration.
pub const DEFAULT_BUFFER_DAYS: usize = 30;

/// Default feature flag gating auto-disable.
pub const DEFAULT_AUTO_DISABLE_FLAG: &str = "organizations:slack-disable-on-broken";

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Configuration for the integration health tracker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Day buckets retained per integration
    pub buffer_days: usize,

    /// Store TTL applied to an integration's key on every write, in seconds
    pub key_ttl_secs: u64,

    /// Broken-state thresholds
    pub policy: BrokenPolicy,

    /// Feature flag consulted when resolving the disable policy
    pub auto_disable_flag: String,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            buffer_days: DEFAULT_BUFFER_DAYS,
            key_ttl_secs: DEFAULT_BUFFER_DAYS as u64 * SECONDS_PER_DAY,
            policy: BrokenPolicy::default(),
            auto_disable_flag: DEFAULT_AUTO_DISABLE_FLAG.to_string(),
        }
    }
}

impl TrackerConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: TrackerConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    pub fn key_ttl(&self) -> Duration {
        Duration::from_secs(self.key_ttl_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.buffer_days == 0 {
            return Err(Error::Config("buffer_days must be positive".into()));
        }
        if self.key_ttl_secs < SECONDS_PER_DAY {
            return Err(Error::Config(format!(
                "key_ttl_secs must cover at least one day, got {}",
                self.key_ttl_secs
            )));
        }
        if self.auto_disable_flag.trim().is_empty() {
            return Err(Error::Config("auto_disable_flag must not be empty".into()));
        }
        self.policy.validate(self.buffer_days)
    }
}
