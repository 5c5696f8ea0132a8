//! Access engine facade
//!
//! Owns the published snapshot, rebuilds it from an [`AccessSource`] and
//! answers queries with optional caching and metrics.
//!
//! # Architecture
//!
//! ```text
//! AccessSource ──fetch_rows──> Snapshot::build ──swap──> Arc<Snapshot>
//!                                                          │
//! check(subject, resource) ──> [Cache] ──miss──> Snapshot::decide ──> Decision
//!                                 ↓                                      ↓
//!                             [Metrics] <────────────────────────────────┘
//! ```
//!
//! Readers clone the published `Arc` and never wait on a rebuild; a rebuild
//! builds off to the side and replaces the pointer in one step.

pub mod cache;
pub mod decision;
pub mod explain;
pub mod metrics;
pub mod snapshot;

pub use cache::{CacheConfig, CacheStats, DecisionCache};
pub use decision::{Decision, DecisionReason};
pub use explain::{AccessMatrixRow, Explanation, GroupEntry, ResourceEntry, RuleEntry};
pub use metrics::{EngineMetrics, MetricsCollector};
pub use snapshot::{Snapshot, SnapshotStats};

use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::source::AccessSource;
use crate::types::{DanglingPolicy, ResourceGroupId, ResourceId, SubjectId};

/// Access engine configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Enable the decision cache
    pub enable_cache: bool,

    pub cache_config: CacheConfig,

    /// Enable metrics collection
    pub enable_metrics: bool,

    /// Handling of rows that reference unknown ids
    pub dangling_policy: DanglingPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            enable_cache: true,
            cache_config: CacheConfig::default(),
            enable_metrics: true,
            dangling_policy: DanglingPolicy::Skip,
        }
    }
}

impl EngineConfig {
    /// Read configuration from `ACCESS_*` environment variables
    ///
    /// Absent or unparsable values fall back to the defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let parse_bool = |key: &str, default: bool| {
            lookup(key)
                .and_then(|v| v.trim().to_ascii_lowercase().parse::<bool>().ok())
                .unwrap_or(default)
        };

        Self {
            enable_cache: parse_bool("ACCESS_CACHE_ENABLED", defaults.enable_cache),
            cache_config: CacheConfig {
                capacity: lookup("ACCESS_CACHE_SIZE")
                    .and_then(|v| v.trim().parse().ok())
                    .unwrap_or(defaults.cache_config.capacity),
            },
            enable_metrics: parse_bool("ACCESS_METRICS_ENABLED", defaults.enable_metrics),
            dangling_policy: lookup("ACCESS_DANGLING_POLICY")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.dangling_policy),
        }
    }
}

/// Access engine over a pull-based data source
pub struct AccessEngine {
    source: Arc<dyn AccessSource>,

    /// Currently published snapshot
    snapshot: RwLock<Arc<Snapshot>>,

    /// Serializes rebuilds; readers never take it
    rebuild_lock: Mutex<()>,

    /// Last generation handed out, published or not
    generation: AtomicU64,

    cache: Option<Arc<DecisionCache>>,

    metrics: Option<Arc<MetricsCollector>>,

    config: EngineConfig,
}

impl AccessEngine {
    /// Create an engine and publish its first snapshot
    ///
    /// # Errors
    ///
    /// Any source or build error; there is no prior snapshot to fall back to.
    pub async fn new(config: EngineConfig, source: Arc<dyn AccessSource>) -> Result<Self> {
        let rows = source.fetch_rows().await?;
        let snapshot = Snapshot::build(&rows, 1, config.dangling_policy)?;

        let cache = config
            .enable_cache
            .then(|| Arc::new(DecisionCache::new(config.cache_config.clone())));
        let metrics = config
            .enable_metrics
            .then(|| Arc::new(MetricsCollector::new()));

        info!(
            "AccessEngine initialized with cache={}, metrics={}, dangling_policy={:?}",
            config.enable_cache, config.enable_metrics, config.dangling_policy
        );

        Ok(Self {
            source,
            snapshot: RwLock::new(Arc::new(snapshot)),
            rebuild_lock: Mutex::new(()),
            generation: AtomicU64::new(1),
            cache,
            metrics,
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Currently published snapshot
    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.snapshot.read())
    }

    pub fn generation(&self) -> u64 {
        self.snapshot.read().generation()
    }

    /// Re-read the source and publish a new snapshot
    ///
    /// Returns the published generation. On failure the previous snapshot
    /// stays active and the error is returned.
    pub async fn rebuild(&self) -> Result<u64> {
        let _guard = self.rebuild_lock.lock().await;
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let built = match self.source.fetch_rows().await {
            Ok(rows) => Snapshot::build(&rows, generation, self.config.dangling_policy),
            Err(e) => Err(e),
        };

        let snapshot = match built {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(
                    "Rebuild of generation {} failed, keeping generation {}: {}",
                    generation,
                    self.generation(),
                    e
                );
                if let Some(metrics) = &self.metrics {
                    metrics.record_rebuild(false);
                }
                return Err(e);
            }
        };

        *self.snapshot.write() = Arc::new(snapshot);

        if let Some(cache) = &self.cache {
            cache.retain_generation(generation);
        }
        if let Some(metrics) = &self.metrics {
            metrics.record_rebuild(true);
        }

        info!("Published snapshot generation {}", generation);
        Ok(generation)
    }

    /// Decide whether `subject` may access `resource`
    pub fn check(&self, subject: SubjectId, resource: ResourceId) -> Result<Decision> {
        let start = Instant::now();
        let snapshot = self.snapshot();

        if let Some(cache) = &self.cache {
            if let Some(cached) = cache.get(snapshot.generation(), subject, resource) {
                if let Some(metrics) = &self.metrics {
                    metrics.record_cache_hit();
                    metrics.record_decision(cached.allowed());
                    metrics.record_latency(start.elapsed());
                }

                debug!("Cache hit for subject={} resource={}", subject, resource);
                return Ok(cached);
            }

            if let Some(metrics) = &self.metrics {
                metrics.record_cache_miss();
            }
        }

        let decision = match snapshot.decide(subject, resource) {
            Ok(decision) => decision,
            Err(e) => {
                if let Some(metrics) = &self.metrics {
                    metrics.record_error();
                }
                return Err(e);
            }
        };

        if let Some(metrics) = &self.metrics {
            metrics.record_decision(decision.allowed());
            metrics.record_latency(start.elapsed());
        }
        self.remember(&decision);

        Ok(decision)
    }

    /// Cache `decision` unless a newer snapshot was published meanwhile
    fn remember(&self, decision: &Decision) {
        if let Some(cache) = &self.cache {
            // That publish has already pruned the decision's generation
            if decision.generation == self.generation() {
                cache.put(decision);
            }
        }
    }

    /// Resources `subject` may access
    pub fn accessible(&self, subject: SubjectId) -> Result<BTreeSet<ResourceId>> {
        self.snapshot().accessible(subject)
    }

    /// Resource-groups `subject` may access
    pub fn accessible_resource_groups(
        &self,
        subject: SubjectId,
    ) -> Result<BTreeSet<ResourceGroupId>> {
        self.snapshot().accessible_resource_groups(subject)
    }

    pub fn explain(&self, subject: SubjectId) -> Result<Explanation> {
        self.snapshot().explain(subject)
    }

    pub fn access_matrix(&self) -> Result<Vec<AccessMatrixRow>> {
        self.snapshot().access_matrix()
    }

    pub fn stats(&self) -> SnapshotStats {
        self.snapshot().stats()
    }

    /// Get engine metrics
    pub fn get_metrics(&self) -> Option<EngineMetrics> {
        self.metrics.as_ref().map(|m| m.get_metrics())
    }

    /// Metrics in Prometheus text format
    pub fn export_prometheus(&self) -> Option<String> {
        self.metrics.as_ref().map(|m| m.export_prometheus())
    }

    /// Get cache statistics
    pub fn get_cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(|c| c.stats())
    }

    pub fn invalidate_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.clear();
            info!("Decision cache invalidated");
        }
    }
}
