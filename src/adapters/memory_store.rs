//! In-Memory Counter Store
//!
//! Implements the `CounterStore` port for single-node deployments and tests.
//!
//! # Design
//!
//! - One DashMap entry per key, holding that key's fields and expiry
//! - Increments happen under the entry's shard lock, so concurrent writers
//!   never lose updates
//! - Expired keys are dropped lazily on access, or in bulk by
//!   [`InMemoryCounterStore::purge_expired`]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use super::clock::SystemClock;
use crate::domain::ports::{Clock, CounterStore};
use crate::error::{Error, Result};

/// Fields and expiry of one key.
#[derive(Debug, Default)]
struct StoredHash {
    fields: HashMap<String, u64>,
    expires_at: Option<DateTime<Utc>>,
}

impl StoredHash {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Counter store statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CounterStoreStats {
    /// Keys currently held (including not yet purged expired keys)
    pub key_count: u64,
    /// Increment operations
    pub increments: u64,
    /// Bulk reads
    pub reads: u64,
    /// Keys dropped because their TTL passed
    pub expirations: u64,
}

/// In-memory `CounterStore`
pub struct InMemoryCounterStore {
    entries: DashMap<String, StoredHash>,
    clock: Arc<dyn Clock>,
    available: AtomicBool,
    increments: AtomicU64,
    reads: AtomicU64,
    expirations: AtomicU64,
}

impl Default for InMemoryCounterStore {
    fn default() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }
}

impl InMemoryCounterStore {
    /// Create a store using the system clock for expiry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that evaluates TTLs against `clock`
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
            available: AtomicBool::new(true),
            increments: AtomicU64::new(0),
            reads: AtomicU64::new(0),
            expirations: AtomicU64::new(0),
        }
    }

    /// Simulate an outage: while unavailable every operation fails.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(Error::StoreUnavailable("in-memory store marked unavailable".into()))
        }
    }

    /// Remaining time-to-live of `key`, if it has one.
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let now = self.clock.now();
        let entry = self.entries.get(key)?;
        let expires_at = entry.expires_at?;
        (expires_at - now).to_std().ok()
    }

    /// Drop every expired key. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries.retain(|_, hash| !hash.is_expired(now));
        let removed = before.saturating_sub(self.entries.len());
        self.expirations
            .fetch_add(removed as u64, Ordering::Relaxed);
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CounterStoreStats {
        CounterStoreStats {
            key_count: self.entries.len() as u64,
            increments: self.increments.load(Ordering::Relaxed),
            reads: self.reads.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
        }
    }

    fn drop_if_expired(&self, key: &str, now: DateTime<Utc>) {
        if self
            .entries
            .remove_if(key, |_, hash| hash.is_expired(now))
            .is_some()
        {
            self.expirations.fetch_add(1, Ordering::Relaxed);
        }
    }
}

#[async_trait]
impl CounterStore for InMemoryCounterStore {
    async fn increment(&self, key: &str, field: &str, delta: u64) -> Result<u64> {
        self.check_available()?;
        self.increments.fetch_add(1, Ordering::Relaxed);

        let now = self.clock.now();
        let mut hash = self.entries.entry(key.to_string()).or_default();
        if hash.is_expired(now) {
            *hash = StoredHash::default();
            self.expirations.fetch_add(1, Ordering::Relaxed);
        }

        let counter = hash.fields.entry(field.to_string()).or_insert(0);
        *counter = counter.saturating_add(delta);
        Ok(*counter)
    }

    async fn fields(&self, key: &str) -> Result<HashMap<String, u64>> {
        self.check_available()?;
        self.reads.fetch_add(1, Ordering::Relaxed);

        let now = self.clock.now();
        match self.entries.get(key) {
            Some(hash) if !hash.is_expired(now) => return Ok(hash.fields.clone()),
            Some(_) => {}
            None => return Ok(HashMap::new()),
        }

        self.drop_if_expired(key, now);
        Ok(HashMap::new())
    }

    async fn remove_fields(&self, key: &str, fields: &[String]) -> Result<usize> {
        self.check_available()?;

        let removed = match self.entries.get_mut(key) {
            Some(mut hash) => fields
                .iter()
                .filter(|field| hash.fields.remove(field.as_str()).is_some())
                .count(),
            None => return Ok(0),
        };

        self.entries.remove_if(key, |_, hash| hash.fields.is_empty());
        Ok(removed)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<()> {
        self.check_available()?;

        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| Error::store(key, format!("invalid TTL: {}", e)))?;
        let now = self.clock.now();
        if let Some(mut hash) = self.entries.get_mut(key) {
            hash.expires_at = Some(now + ttl);
        }
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        self.check_available()
    }
}

impl std::fmt::Debug for InMemoryCounterStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryCounterStore")
            .field("keys", &self.entries.len())
            .field("available", &self.available.load(Ordering::Relaxed))
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
