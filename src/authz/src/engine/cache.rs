//! Decision cache keyed by snapshot generation

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::decision::Decision;
use crate::types::{ResourceId, SubjectId};

/// Cache configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of entries in the cache
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { capacity: 10_000 }
    }
}

/// Entries of an older generation can never be returned for a newer one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CacheKey {
    generation: u64,
    subject: SubjectId,
    resource: ResourceId,
}

/// Concurrent cache of per-resource decisions
///
/// A snapshot never changes, so entries need no expiry; the engine drops
/// them wholesale after a rebuild.
pub struct DecisionCache {
    entries: Arc<DashMap<CacheKey, Decision>>,

    config: CacheConfig,

    stats: Arc<DashMap<&'static str, usize>>,
}

impl DecisionCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            entries: Arc::new(DashMap::with_capacity(config.capacity.min(1_024))),
            config,
            stats: Arc::new(DashMap::new()),
        }
    }

    /// Get a cached decision
    pub fn get(
        &self,
        generation: u64,
        subject: SubjectId,
        resource: ResourceId,
    ) -> Option<Decision> {
        let key = CacheKey {
            generation,
            subject,
            resource,
        };

        if let Some(entry) = self.entries.get(&key) {
            self.increment_stat("hits");
            return Some(entry.value().clone());
        }

        self.increment_stat("misses");
        None
    }

    /// Store a decision under the generation it was computed against
    pub fn put(&self, decision: &Decision) {
        if self.config.capacity == 0 {
            return;
        }
        if self.entries.len() >= self.config.capacity {
            self.evict();
        }

        let key = CacheKey {
            generation: decision.generation,
            subject: decision.subject,
            resource: decision.resource,
        };
        self.entries.insert(key, decision.clone());
    }

    /// Drop every entry not computed against `generation`
    pub fn retain_generation(&self, generation: u64) {
        let before = self.entries.len();
        self.entries.retain(|key, _| key.generation == generation);
        let dropped = before.saturating_sub(self.entries.len());
        if dropped > 0 {
            self.add_stat("invalidations", dropped);
        }
    }

    /// Clear the entire cache and its statistics
    pub fn clear(&self) {
        self.entries.clear();
        self.stats.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.get_stat("hits"),
            misses: self.get_stat("misses"),
            evictions: self.get_stat("evictions"),
            invalidations: self.get_stat("invalidations"),
            entries: self.entries.len(),
            max_entries: self.config.capacity,
        }
    }

    /// Remove about a tenth of the entries, in map order
    fn evict(&self) {
        let to_remove = (self.config.capacity / 10).max(1);
        let mut removed = 0;

        self.entries.retain(|_, _| {
            if removed < to_remove {
                removed += 1;
                false
            } else {
                true
            }
        });
        self.add_stat("evictions", removed);
    }

    fn increment_stat(&self, key: &'static str) {
        self.add_stat(key, 1);
    }

    fn add_stat(&self, key: &'static str, amount: usize) {
        self.stats
            .entry(key)
            .and_modify(|count| *count += amount)
            .or_insert(amount);
    }

    fn get_stat(&self, key: &'static str) -> usize {
        self.stats.get(key).map(|v| *v).unwrap_or(0)
    }
}

/// Cache statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub evictions: usize,
    pub invalidations: usize,
    pub entries: usize,
    pub max_entries: usize,
}

impl CacheStats {
    /// Calculate cache hit rate
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
