//! Cache tiers of the scope orchestrator
//!
//! Tier 1 is keyed by names-provider instance and holds one built
//! [`SearchMap`] per registered root. Tier 2 is keyed by query-context
//! instance and holds one materialized [`Symbol`] per contribution. Neither
//! tier observes its input mutating; both are gated on externally-owned
//! modification counters and evicted wholesale, never patched incrementally.
//!
//! # Invalidation
//!
//! Validation is double-checked: an unsynchronized counter read first, a
//! mutex-guarded re-check-and-clear only when a change is suspected. Readers
//! never lock during traversal because a published `SearchMap` is immutable;
//! a rebuild publishes a fresh instance through the concurrent map's atomic
//! get-or-insert (first writer wins, duplicate work at most once).
//!
//! # Memory bound
//!
//! The outer tiers self-clear entirely once their own miss counter exceeds
//! [`CACHE_MISS_LIMIT`], bounding how many stale provider/context entries are
//! retained. This approximates least-recently-used eviction without
//! per-entry bookkeeping; the limit is a tunable constant.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use rustc_hash::FxBuildHasher;
use tracing::debug;

use crate::contribution::{ContributionHandle, ContributionId, ContributionRoot, RootId};
use crate::model::Symbol;
use crate::query::{NamesProvider, QueryContext};
use crate::search_map::SearchMap;

/// Outer-tier miss budget before a wholesale self-clear
pub const CACHE_MISS_LIMIT: usize = 100;

/// Counters behind [`CacheStats`], updated with relaxed atomics
#[derive(Debug, Default)]
pub(crate) struct ScopeCacheMetrics {
    pub(crate) map_hits: AtomicU64,
    pub(crate) map_builds: AtomicU64,
    pub(crate) map_clears: AtomicU64,
    pub(crate) symbol_hits: AtomicU64,
    pub(crate) symbol_misses: AtomicU64,
    pub(crate) symbol_clears: AtomicU64,
}

impl ScopeCacheMetrics {
    pub(crate) fn snapshot(&self) -> CacheStats {
        CacheStats {
            map_hits: self.map_hits.load(Ordering::Relaxed),
            map_builds: self.map_builds.load(Ordering::Relaxed),
            map_clears: self.map_clears.load(Ordering::Relaxed),
            symbol_hits: self.symbol_hits.load(Ordering::Relaxed),
            symbol_misses: self.symbol_misses.load(Ordering::Relaxed),
            symbol_clears: self.symbol_clears.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of cache behavior for monitoring and tests
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Map lookups answered from tier 1
    pub map_hits: u64,
    /// `SearchMap` constructions
    pub map_builds: u64,
    /// Wholesale clears of tier 1 (counter change or miss pressure)
    pub map_clears: u64,
    /// Symbol lookups answered from tier 2
    pub symbol_hits: u64,
    /// Symbol materializations
    pub symbol_misses: u64,
    /// Wholesale clears of tier 2
    pub symbol_clears: u64,
}

impl CacheStats {
    pub fn map_hit_rate(&self) -> f64 {
        let total = self.map_hits + self.map_builds;
        if total == 0 {
            0.0
        } else {
            self.map_hits as f64 / total as f64
        }
    }

    pub fn symbol_hit_rate(&self) -> f64 {
        let total = self.symbol_hits + self.symbol_misses;
        if total == 0 {
            0.0
        } else {
            self.symbol_hits as f64 / total as f64
        }
    }
}

/// Tier 1: built maps for one names-provider instance
///
/// Valid while both the provider's modification counter and the registry
/// counter stay where they were at the last validation.
#[derive(Debug)]
pub(crate) struct NamesProviderCache {
    provider: Arc<dyn NamesProvider>,
    tracked_provider: AtomicU64,
    tracked_registry: AtomicU64,
    maps: DashMap<RootId, Arc<SearchMap<ContributionHandle>>, FxBuildHasher>,
    clear_lock: Mutex<()>,
}

impl NamesProviderCache {
    pub(crate) fn new(provider: Arc<dyn NamesProvider>, registry_count: u64) -> Self {
        let tracked_provider = AtomicU64::new(provider.modification_count());
        Self {
            provider,
            tracked_provider,
            tracked_registry: AtomicU64::new(registry_count),
            maps: DashMap::default(),
            clear_lock: Mutex::new(()),
        }
    }

    /// Double-checked invalidation against the provider and registry counters
    pub(crate) fn validate(&self, registry_count: u64, metrics: &ScopeCacheMetrics) {
        let provider_count = self.provider.modification_count();
        if self.tracked_provider.load(Ordering::Acquire) == provider_count
            && self.tracked_registry.load(Ordering::Acquire) == registry_count
        {
            return;
        }
        let _guard = self.clear_lock.lock();
        if self.tracked_provider.load(Ordering::Acquire) == provider_count
            && self.tracked_registry.load(Ordering::Acquire) == registry_count
        {
            return;
        }
        debug!(provider_count, registry_count, "names-provider cache invalidated, clearing maps");
        self.maps.clear();
        self.tracked_provider.store(provider_count, Ordering::Release);
        self.tracked_registry.store(registry_count, Ordering::Release);
        metrics.map_clears.fetch_add(1, Ordering::Relaxed);
    }

    /// Atomic get-or-insert of the root's map; first writer wins
    pub(crate) fn get_or_build(
        &self,
        root: &Arc<ContributionRoot>,
        metrics: &ScopeCacheMetrics,
    ) -> Arc<SearchMap<ContributionHandle>> {
        if let Some(map) = self.maps.get(&root.id()) {
            metrics.map_hits.fetch_add(1, Ordering::Relaxed);
            return map.clone();
        }
        self.maps
            .entry(root.id())
            .or_insert_with(|| {
                metrics.map_builds.fetch_add(1, Ordering::Relaxed);
                debug!(root = ?root.id(), contributions = root.contributions().len(), "building search map");
                Arc::new(build_map(&self.provider, root))
            })
            .clone()
    }
}

fn build_map(
    provider: &Arc<dyn NamesProvider>,
    root: &ContributionRoot,
) -> SearchMap<ContributionHandle> {
    let mut map = SearchMap::new(provider.clone());
    for contribution in root.contributions() {
        let qualified_name = contribution.qualified_name();
        let pattern = contribution.pattern();
        map.add(&qualified_name, pattern.as_ref(), contribution.clone());
    }
    map
}

/// Tier 2: materialized symbols for one query-context instance
#[derive(Debug)]
pub(crate) struct QueryContextCache {
    context: Arc<dyn QueryContext>,
    tracked_context: AtomicU64,
    symbols: DashMap<ContributionId, Symbol, FxBuildHasher>,
    clear_lock: Mutex<()>,
}

impl QueryContextCache {
    pub(crate) fn new(context: Arc<dyn QueryContext>) -> Self {
        let tracked_context = AtomicU64::new(context.modification_count());
        Self {
            context,
            tracked_context,
            symbols: DashMap::default(),
            clear_lock: Mutex::new(()),
        }
    }

    /// Double-checked invalidation against the context counter
    pub(crate) fn validate(&self, metrics: &ScopeCacheMetrics) {
        let context_count = self.context.modification_count();
        if self.tracked_context.load(Ordering::Acquire) == context_count {
            return;
        }
        let _guard = self.clear_lock.lock();
        if self.tracked_context.load(Ordering::Acquire) == context_count {
            return;
        }
        debug!(context_count, "query-context cache invalidated, clearing symbols");
        self.symbols.clear();
        self.tracked_context.store(context_count, Ordering::Release);
        metrics.symbol_clears.fetch_add(1, Ordering::Relaxed);
    }

    /// Materialize a contribution through the cache
    pub(crate) fn materialize(
        &self,
        contribution: &ContributionHandle,
        metrics: &ScopeCacheMetrics,
    ) -> Symbol {
        let id = ContributionId::of(contribution);
        if let Some(symbol) = self.symbols.get(&id) {
            metrics.symbol_hits.fetch_add(1, Ordering::Relaxed);
            return symbol.clone();
        }
        metrics.symbol_misses.fetch_add(1, Ordering::Relaxed);
        self.symbols
            .entry(id)
            .or_insert_with(|| contribution.materialize(&*self.context))
            .clone()
    }
}
