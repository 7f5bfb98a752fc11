//! Scope orchestrator: root registry, lazy map construction, and the
//! two-level query cache
//!
//! A [`SymbolScope`] owns the registry of contribution roots and serves every
//! query through two cache tiers:
//!
//! 1. per names-provider instance, one built [`SearchMap`] per root, and
//! 2. per query-context instance, one materialized [`Symbol`] per
//!    contribution.
//!
//! Root registration and removal are explicit and bump a registry-wide
//! modification counter; tier 1 consults that counter in addition to the
//! names provider's own, so either change rebuilds maps from scratch. There
//! is no event machinery here: the index is pure state recomputed from
//! immutable snapshots whenever an invalidation signal fires.
//!
//! Queries are lock-free apart from the narrow mutex guarding a suspected
//! cache invalidation; see [`cache`] for the concurrency discipline.

pub mod cache;

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use rustc_hash::{FxBuildHasher, FxHashSet};
use tracing::debug;

use crate::contribution::{ContributionHandle, ContributionRoot, RootId, TypeSupport};
use crate::model::{CodeCompletionItem, QualifiedKind, QualifiedName, Symbol, SymbolOrigin};
use crate::query::{NamesProvider, QueryContext, QueryParams, QueryStack};
use crate::search_map::{SearchMap, SymbolResolver};
use crate::selection::{select_best_matches, sort_symbols_by_priority};

use self::cache::{
    CacheStats, NamesProviderCache, QueryContextCache, ScopeCacheMetrics, CACHE_MISS_LIMIT,
};

/// Identity key for a collaborator instance: the `Arc`'s pointer
fn instance_key<T: ?Sized>(instance: &Arc<T>) -> usize {
    Arc::as_ptr(instance) as *const () as usize
}

/// The root registry plus both cache tiers
///
/// All public query operations are pure functions of (query, context) given
/// the current contribution set. Multiple threads may query concurrently;
/// registration may race with queries under standard concurrent-map
/// semantics.
#[derive(Debug, Default)]
pub struct SymbolScope {
    roots: RwLock<Vec<Arc<ContributionRoot>>>,
    next_root_id: AtomicU64,
    registry_modifications: AtomicU64,
    names_caches: DashMap<usize, Arc<NamesProviderCache>, FxBuildHasher>,
    names_cache_misses: AtomicUsize,
    context_caches: DashMap<usize, Arc<QueryContextCache>, FxBuildHasher>,
    context_cache_misses: AtomicUsize,
    metrics: Arc<ScopeCacheMetrics>,
}

impl SymbolScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a declaration-source root; bumps the registry counter
    pub fn register_root(
        &self,
        origin: SymbolOrigin,
        contributions: Vec<ContributionHandle>,
    ) -> RootId {
        self.register_root_with_type_support(origin, None, contributions)
    }

    pub fn register_root_with_type_support(
        &self,
        origin: SymbolOrigin,
        type_support: Option<Arc<dyn TypeSupport>>,
        contributions: Vec<ContributionHandle>,
    ) -> RootId {
        let id = RootId(self.next_root_id.fetch_add(1, Ordering::Relaxed));
        let root = Arc::new(ContributionRoot::new(id, origin, type_support, contributions));
        self.roots.write().push(root);
        self.registry_modifications.fetch_add(1, Ordering::Release);
        debug!(root = ?id, "registered contribution root");
        id
    }

    /// Remove a previously registered root; bumps the registry counter when
    /// the root existed
    pub fn remove_root(&self, id: RootId) -> bool {
        let removed = {
            let mut roots = self.roots.write();
            let before = roots.len();
            roots.retain(|root| root.id() != id);
            roots.len() != before
        };
        if removed {
            self.registry_modifications.fetch_add(1, Ordering::Release);
            debug!(root = ?id, "removed contribution root");
        }
        removed
    }

    /// Registry-wide modification counter, for downstream caches
    pub fn modification_count(&self) -> u64 {
        self.registry_modifications.load(Ordering::Acquire)
    }

    /// Snapshot of cache behavior across both tiers
    pub fn cache_stats(&self) -> CacheStats {
        self.metrics.snapshot()
    }

    /// Resolve a concrete queried name across every context-matching root
    ///
    /// Raw index results pass through best-match selection before leaving the
    /// subsystem; extension symbols are always retained.
    pub fn get_matching_symbols(
        &self,
        qualified_name: &QualifiedName,
        params: &QueryParams,
        stack: &mut QueryStack,
    ) -> Vec<Symbol> {
        let context_cache = self.context_cache_for(&params.context);
        context_cache.validate(&self.metrics);
        let resolver = CachedResolver {
            cache: &context_cache,
            metrics: &self.metrics,
        };
        let mut symbols = Vec::new();
        for map in self.get_maps(params) {
            symbols.extend(map.get_matching_symbols(qualified_name, params, stack, &resolver));
        }
        select_best_matches(symbols)
    }

    /// Every context-matching symbol of a kind, ordered for presentation
    pub fn get_symbols(&self, kind: &QualifiedKind, params: &QueryParams) -> Vec<Symbol> {
        let context_cache = self.context_cache_for(&params.context);
        context_cache.validate(&self.metrics);
        let resolver = CachedResolver {
            cache: &context_cache,
            metrics: &self.metrics,
        };
        let mut symbols = Vec::new();
        for map in self.get_maps(params) {
            symbols.extend(map.get_symbols(kind, params, &resolver));
        }
        sort_symbols_by_priority(&mut symbols);
        symbols
    }

    /// Completion items for a partially typed name, deduplicated across roots
    pub fn get_code_completions(
        &self,
        qualified_name: &QualifiedName,
        params: &QueryParams,
    ) -> Vec<CodeCompletionItem> {
        let mut seen = FxHashSet::default();
        let mut items = Vec::new();
        for map in self.get_maps(params) {
            for item in map.get_code_completions(qualified_name, params) {
                if seen.insert((item.name.clone(), item.offset)) {
                    items.push(item);
                }
            }
        }
        items
    }

    /// Validated maps of every root matching the query context
    ///
    /// Roots are filtered by the origin/context-match predicate before any
    /// map is built or touched, so a context mismatch costs only the
    /// predicate check.
    fn get_maps(&self, params: &QueryParams) -> Vec<Arc<SearchMap<ContributionHandle>>> {
        let registry_count = self.registry_modifications.load(Ordering::Acquire);
        let cache = self.names_cache_for(&params.names_provider, registry_count);
        cache.validate(registry_count, &self.metrics);
        let roots = self.roots.read();
        roots
            .iter()
            .filter(|root| root.matches_context(&*params.context))
            .map(|root| cache.get_or_build(root, &self.metrics))
            .collect()
    }

    fn names_cache_for(
        &self,
        provider: &Arc<dyn NamesProvider>,
        registry_count: u64,
    ) -> Arc<NamesProviderCache> {
        let key = instance_key(provider);
        if let Some(cache) = self.names_caches.get(&key) {
            return cache.clone();
        }
        let misses = self.names_cache_misses.fetch_add(1, Ordering::Relaxed) + 1;
        if misses > CACHE_MISS_LIMIT {
            debug!(misses, "names-provider cache miss pressure, clearing tier");
            self.names_caches.clear();
            self.names_cache_misses.store(0, Ordering::Relaxed);
            self.metrics.map_clears.fetch_add(1, Ordering::Relaxed);
        }
        self.names_caches
            .entry(key)
            .or_insert_with(|| Arc::new(NamesProviderCache::new(provider.clone(), registry_count)))
            .clone()
    }

    fn context_cache_for(&self, context: &Arc<dyn QueryContext>) -> Arc<QueryContextCache> {
        let key = instance_key(context);
        if let Some(cache) = self.context_caches.get(&key) {
            return cache.clone();
        }
        let misses = self.context_cache_misses.fetch_add(1, Ordering::Relaxed) + 1;
        if misses > CACHE_MISS_LIMIT {
            debug!(misses, "query-context cache miss pressure, clearing tier");
            self.context_caches.clear();
            self.context_cache_misses.store(0, Ordering::Relaxed);
            self.metrics.symbol_clears.fetch_add(1, Ordering::Relaxed);
        }
        self.context_caches
            .entry(key)
            .or_insert_with(|| Arc::new(QueryContextCache::new(context.clone())))
            .clone()
    }
}

/// Routes map materializations through the per-context symbol cache
struct CachedResolver<'a> {
    cache: &'a QueryContextCache,
    metrics: &'a ScopeCacheMetrics,
}

impl SymbolResolver<ContributionHandle> for CachedResolver<'_> {
    fn materialize(&self, item: &ContributionHandle, _params: &QueryParams) -> Symbol {
        self.cache.materialize(item, self.metrics)
    }
}
