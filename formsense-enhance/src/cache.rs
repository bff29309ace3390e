//! Enhancement Cache
//!
//! Bounded, time-expiring map from field fingerprint to enhancement result.
//!
//! # Eviction
//! - **Expiry:** checked lazily on `get`; expired entries are dropped when read.
//! - **Capacity:** inserting a new key at capacity evicts the oldest *inserted*
//!   entry. Reads do not refresh position (insertion order, not LRU).
//!
//! The cache itself is not synchronized; `FieldEnhancementService` wraps it in a
//! mutex so each read-check-evict and write-evict sequence is atomic.

use crate::types::{EnhancementResult, FieldContext};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Delimiter between fingerprint components
const FINGERPRINT_DELIMITER: char = '|';

/// Cache key for a field
///
/// Derived from `{type, name, label, placeholder}` only, case-folded. Two
/// different fields sharing these four strings get the same fingerprint and
/// share a cached classification.
pub fn fingerprint(ctx: &FieldContext) -> String {
    let e = &ctx.element;
    [&e.input_type, &e.name, &e.label, &e.placeholder]
        .iter()
        .map(|part| part.as_deref().unwrap_or("").to_lowercase())
        .collect::<Vec<_>>()
        .join(&FINGERPRINT_DELIMITER.to_string())
}

#[derive(Debug, Clone)]
struct CacheEntry {
    result: EnhancementResult,
    expires_at: Instant,
    stored_at: DateTime<Utc>,
}

/// Snapshot of cache occupancy
#[derive(Debug, Clone, PartialEq)]
pub struct CacheStats {
    pub entries: usize,
    pub max_size: usize,
    pub default_ttl: Duration,
    /// Wall-clock time the oldest resident entry was written
    pub oldest_stored_at: Option<DateTime<Utc>>,
}

/// Bounded TTL cache with insertion-order eviction
#[derive(Debug)]
pub struct EnhancementCache {
    entries: HashMap<String, CacheEntry>,
    /// Keys in insertion order, oldest first
    order: VecDeque<String>,
    max_size: usize,
    default_ttl: Duration,
}

impl EnhancementCache {
    /// Create a cache holding at most `max_size` entries (minimum 1)
    pub fn new(max_size: usize, default_ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            max_size: max_size.max(1),
            default_ttl,
        }
    }

    /// Live entry for `fingerprint`, dropping it if expired
    pub fn get(&mut self, fingerprint: &str) -> Option<EnhancementResult> {
        let expired = match self.entries.get(fingerprint) {
            None => return None,
            Some(entry) => Instant::now() >= entry.expires_at,
        };

        if expired {
            debug!(fingerprint = %fingerprint, "Cache entry expired");
            self.remove(fingerprint);
            return None;
        }

        self.entries.get(fingerprint).map(|entry| entry.result.clone())
    }

    /// Store `result` with `ttl` or the default TTL
    ///
    /// Overwriting an existing key keeps its insertion position.
    pub fn set(&mut self, fingerprint: &str, result: EnhancementResult, ttl: Option<Duration>) {
        let entry = CacheEntry {
            result,
            expires_at: Instant::now() + ttl.unwrap_or(self.default_ttl),
            stored_at: Utc::now(),
        };

        if let Some(existing) = self.entries.get_mut(fingerprint) {
            *existing = entry;
            return;
        }

        if self.entries.len() >= self.max_size {
            self.evict_oldest();
        }

        self.order.push_back(fingerprint.to_string());
        self.entries.insert(fingerprint.to_string(), entry);
    }

    /// Drop all entries
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    /// Eagerly drop every expired entry; returns how many were removed
    pub fn purge_expired(&mut self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| now < entry.expires_at);
        let entries = &self.entries;
        self.order.retain(|key| entries.contains_key(key));
        before - self.entries.len()
    }

    /// Change limits, evicting oldest entries until within the new size
    pub fn reconfigure(&mut self, max_size: usize, default_ttl: Duration) {
        self.max_size = max_size.max(1);
        self.default_ttl = default_ttl;
        while self.entries.len() > self.max_size {
            self.evict_oldest();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            max_size: self.max_size,
            default_ttl: self.default_ttl,
            oldest_stored_at: self
                .order
                .front()
                .and_then(|key| self.entries.get(key))
                .map(|entry| entry.stored_at),
        }
    }

    fn evict_oldest(&mut self) {
        if let Some(oldest) = self.order.pop_front() {
            debug!(fingerprint = %oldest, "Evicting oldest cache entry (capacity)");
            self.entries.remove(&oldest);
        }
    }

    fn remove(&mut self, fingerprint: &str) {
        self.entries.remove(fingerprint);
        self.order.retain(|key| key != fingerprint);
    }
}
