//! Ordered two-part index over literal names and pattern prefixes
//!
//! A `SearchMap` holds every contribution of one root, split across two
//! ordered sub-indexes:
//!
//! - the *static* map, keyed by (qualified kind, exact name variant), for
//!   literal declarations, and
//! - the *pattern* map, keyed by (qualified kind, static prefix), for
//!   pattern-described name families.
//!
//! Lookups run in two stages: cheap prefix-bound elimination over the ordered
//! pattern map first, full pattern evaluation only for the survivors. Without
//! that bound every registered pattern would need evaluation on every query,
//! which dominates completion latency in large registries.
//!
//! A built map is an immutable snapshot: once published to readers it is
//! never mutated in place. Invalidation replaces the whole instance (see
//! [`crate::scope`]), so readers traverse without locks.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;

use rustc_hash::FxHashSet;
use tracing::trace;

use crate::contribution::{ContributionHandle, ContributionId};
use crate::model::{CodeCompletionItem, QualifiedKind, QualifiedName, Symbol};
use crate::pattern::PatternHandle;
use crate::query::{NamesProvider, NamesPurpose, QueryParams, QueryStack};

/// Ordering key of both sub-indexes: (namespace, kind, exclusivity, name)
///
/// The exclusivity bit exists solely to construct half-open range bounds: an
/// exclusive entry sorts strictly after every non-exclusive entry with the
/// same kind regardless of name, so `[lower_bound(kind), upper_bound(kind))`
/// brackets exactly the entries of that kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchMapEntry {
    namespace: Arc<str>,
    kind: Arc<str>,
    kind_exclusive: bool,
    name: String,
}

impl SearchMapEntry {
    pub fn new(kind: &QualifiedKind, name: impl Into<String>) -> Self {
        Self {
            namespace: kind.namespace.clone(),
            kind: kind.kind.clone(),
            kind_exclusive: false,
            name: name.into(),
        }
    }

    /// Smallest possible entry of the given kind
    pub fn kind_lower_bound(kind: &QualifiedKind) -> Self {
        Self::new(kind, "")
    }

    /// Entry sorting strictly after every real entry of the given kind
    pub fn kind_upper_bound(kind: &QualifiedKind) -> Self {
        Self {
            namespace: kind.namespace.clone(),
            kind: kind.kind.clone(),
            kind_exclusive: true,
            name: String::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn same_kind(&self, kind: &QualifiedKind) -> bool {
        self.namespace == kind.namespace && self.kind == kind.kind
    }
}

impl Ord for SearchMapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.namespace
            .cmp(&other.namespace)
            .then_with(|| self.kind.cmp(&other.kind))
            .then_with(|| self.kind_exclusive.cmp(&other.kind_exclusive))
            .then_with(|| self.name.cmp(&other.name))
    }
}

impl PartialOrd for SearchMapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Capabilities the index needs from an indexed item
///
/// Implemented for [`ContributionHandle`]; kept as a trait so the map stays
/// generic over the item representation.
pub trait SearchMapItem: Clone {
    /// Identity used for deduplication and symbol caching
    fn item_id(&self) -> ContributionId;

    fn item_pattern(&self) -> Option<PatternHandle>;

    fn item_extension(&self) -> bool;

    /// Combined context-match and caller-predicate check
    fn accepted_by(&self, params: &QueryParams) -> bool;

    fn item_code_completions(
        &self,
        name: &QualifiedName,
        params: &QueryParams,
    ) -> Vec<CodeCompletionItem>;
}

impl SearchMapItem for ContributionHandle {
    fn item_id(&self) -> ContributionId {
        ContributionId::of(self)
    }

    fn item_pattern(&self) -> Option<PatternHandle> {
        self.pattern()
    }

    fn item_extension(&self) -> bool {
        self.extension()
    }

    fn accepted_by(&self, params: &QueryParams) -> bool {
        params.accepts(&**self)
    }

    fn item_code_completions(
        &self,
        name: &QualifiedName,
        params: &QueryParams,
    ) -> Vec<CodeCompletionItem> {
        self.code_completions(name, params)
    }
}

/// Materialization seam between the map and its owner
///
/// The scope implements this to route materialization through its per-context
/// symbol cache; tests implement it directly.
pub trait SymbolResolver<T> {
    fn materialize(&self, item: &T, params: &QueryParams) -> Symbol;
}

/// The ordered index of one contribution root
#[derive(Debug)]
pub struct SearchMap<T> {
    names_provider: Arc<dyn NamesProvider>,
    statics: BTreeMap<SearchMapEntry, Vec<T>>,
    patterns: BTreeMap<SearchMapEntry, Vec<T>>,
}

impl<T: SearchMapItem> SearchMap<T> {
    pub fn new(names_provider: Arc<dyn NamesProvider>) -> Self {
        Self {
            names_provider,
            statics: BTreeMap::new(),
            patterns: BTreeMap::new(),
        }
    }

    /// Index one contribution
    ///
    /// Literal declarations go into the static map under every *storage*
    /// name variant; pattern declarations fan out into the pattern map under
    /// every declared static prefix. An empty prefix set, or one containing
    /// the empty string, is coerced to `{""}`, making the pattern a candidate
    /// for every query of its kind.
    pub fn add(&mut self, qualified_name: &QualifiedName, pattern: Option<&PatternHandle>, item: T) {
        match pattern {
            None => {
                for variant in self
                    .names_provider
                    .get_names(qualified_name, NamesPurpose::Storage)
                {
                    self.statics
                        .entry(SearchMapEntry::new(&qualified_name.kind, variant))
                        .or_default()
                        .push(item.clone());
                }
            }
            Some(pattern) => {
                let mut prefixes: FxHashSet<String> =
                    pattern.static_prefixes().into_iter().collect();
                if prefixes.is_empty() || prefixes.contains("") {
                    prefixes.clear();
                    prefixes.insert(String::new());
                }
                for prefix in prefixes {
                    self.patterns
                        .entry(SearchMapEntry::new(&qualified_name.kind, prefix))
                        .or_default()
                        .push(item.clone());
                }
            }
        }
    }

    /// Resolve a concrete queried name
    ///
    /// Static results come first, in *query* name-variant order, each tagged
    /// with the originally queried (un-normalized) name; pattern-evaluation
    /// results follow. No cross-source re-sort happens here; presentation
    /// ordering is the caller's responsibility.
    pub fn get_matching_symbols<R: SymbolResolver<T>>(
        &self,
        qualified_name: &QualifiedName,
        params: &QueryParams,
        stack: &mut QueryStack,
        resolver: &R,
    ) -> Vec<Symbol> {
        let mut results = Vec::new();
        for variant in self
            .names_provider
            .get_names(qualified_name, NamesPurpose::Query)
        {
            let key = SearchMapEntry::new(&qualified_name.kind, variant);
            let Some(items) = self.statics.get(&key) else {
                continue;
            };
            for item in items {
                if !item.accepted_by(params) {
                    continue;
                }
                results.push(
                    resolver
                        .materialize(item, params)
                        .with_matched_name(&qualified_name.name),
                );
            }
        }
        results.extend(self.evaluate_patterns(qualified_name, params, stack, resolver));
        trace!(
            name = %qualified_name.name,
            results = results.len(),
            "matching symbols lookup"
        );
        results
    }

    /// Every context-matching contribution of a kind, irrespective of name
    ///
    /// Two half-open range scans bounded by the kind's exclusivity brackets,
    /// unioned and deduplicated by contribution identity.
    pub fn get_symbols<R: SymbolResolver<T>>(
        &self,
        kind: &QualifiedKind,
        params: &QueryParams,
        resolver: &R,
    ) -> Vec<Symbol> {
        let lower = SearchMapEntry::kind_lower_bound(kind);
        let upper = SearchMapEntry::kind_upper_bound(kind);
        let mut seen = FxHashSet::default();
        let mut results = Vec::new();
        let scans = self
            .statics
            .range(lower.clone()..upper.clone())
            .chain(self.patterns.range(lower..upper));
        for (_, items) in scans {
            for item in items {
                if !seen.insert(item.item_id()) {
                    continue;
                }
                if !item.accepted_by(params) {
                    continue;
                }
                results.push(resolver.materialize(item, params));
            }
        }
        results
    }

    /// Completion items for a partially typed name
    ///
    /// Both sub-indexes are range-scanned; extension contributions never
    /// complete. Deduplication runs on the generated items rather than on the
    /// source contributions, since one contribution may yield several items
    /// and may be reachable through several of its static prefixes.
    pub fn get_code_completions(
        &self,
        qualified_name: &QualifiedName,
        params: &QueryParams,
    ) -> Vec<CodeCompletionItem> {
        let lower = SearchMapEntry::kind_lower_bound(&qualified_name.kind);
        let upper = SearchMapEntry::kind_upper_bound(&qualified_name.kind);
        let mut seen = FxHashSet::default();
        let mut results = Vec::new();
        let scans = self
            .statics
            .range(lower.clone()..upper.clone())
            .chain(self.patterns.range(lower..upper));
        for (_, items) in scans {
            for item in items {
                if item.item_extension() || !item.accepted_by(params) {
                    continue;
                }
                for completion in item.item_code_completions(qualified_name, params) {
                    if seen.insert((completion.name.clone(), completion.offset)) {
                        results.push(completion);
                    }
                }
            }
        }
        results
    }

    /// Stage two of pattern lookup: evaluate every surviving candidate's full
    /// predicate against the complete query name
    fn evaluate_patterns<R: SymbolResolver<T>>(
        &self,
        qualified_name: &QualifiedName,
        params: &QueryParams,
        stack: &mut QueryStack,
        resolver: &R,
    ) -> Vec<Symbol> {
        let mut results = Vec::new();
        for item in self.collect_patterns_to_process(qualified_name) {
            if !item.accepted_by(params) {
                continue;
            }
            let Some(pattern) = item.item_pattern() else {
                continue;
            };
            let owner = resolver.materialize(&item, params);
            results.extend(pattern.matches(&owner, &qualified_name.name, params, stack));
        }
        results
    }

    /// Stage one of pattern lookup: the bounded prefix walk
    ///
    /// Walks prefix lengths `p = 0..=len(name)` (char boundaries only). At
    /// each `p` the ceiling entry of (kind, name[..p]) is inspected; the walk
    /// stops once the pattern map is exhausted for this kind or the ceiling
    /// entry's stored prefix no longer extends the probe. A candidate list
    /// entry is collected whenever the stored prefix length equals `p`.
    fn collect_patterns_to_process(&self, qualified_name: &QualifiedName) -> Vec<T> {
        let name = qualified_name.name.as_str();
        let mut to_process: Vec<T> = Vec::new();
        for p in (0..=name.len()).filter(|&p| name.is_char_boundary(p)) {
            let probe = SearchMapEntry::new(&qualified_name.kind, &name[..p]);
            let Some((entry, items)) = self
                .patterns
                .range((Bound::Included(probe), Bound::Unbounded))
                .next()
            else {
                break;
            };
            if !entry.same_kind(&qualified_name.kind) || !entry.name.starts_with(&name[..p]) {
                break;
            }
            if entry.name.len() == p {
                to_process.extend(items.iter().cloned());
                // Bound redundant re-insertion cost while the walk is still
                // collecting
                if to_process.len() > 2 {
                    dedup_by_id(&mut to_process);
                }
            }
        }
        dedup_by_id(&mut to_process);
        to_process
    }
}

/// Remove duplicate items, keeping first occurrences in order
fn dedup_by_id<T: SearchMapItem>(items: &mut Vec<T>) {
    let mut seen = FxHashSet::default();
    items.retain(|item| seen.insert(item.item_id()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interner::Interner;
    use quickcheck::quickcheck;

    fn entry(
        interner: &Interner,
        namespace: &str,
        kind: &str,
        exclusive: bool,
        name: &str,
    ) -> SearchMapEntry {
        let kind = QualifiedKind::new(interner, namespace, kind);
        if exclusive {
            assert!(name.is_empty());
            SearchMapEntry::kind_upper_bound(&kind)
        } else {
            SearchMapEntry::new(&kind, name)
        }
    }

    #[test]
    fn order_is_namespace_then_kind_then_exclusivity_then_name() {
        let interner = Interner::new();
        let ordered = [
            entry(&interner, "css", "properties", false, "color"),
            entry(&interner, "html", "attributes", false, "alt"),
            entry(&interner, "html", "attributes", false, "disabled"),
            entry(&interner, "html", "attributes", true, ""),
            entry(&interner, "html", "elements", false, ""),
        ];
        for pair in ordered.windows(2) {
            assert!(pair[0] < pair[1], "{:?} should sort before {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn exclusive_entry_sorts_after_every_name_of_its_kind() {
        let interner = Interner::new();
        let kind = QualifiedKind::new(&interner, "html", "attributes");
        let upper = SearchMapEntry::kind_upper_bound(&kind);
        for name in ["", "a", "zzzz", "\u{10FFFF}"] {
            assert!(SearchMapEntry::new(&kind, name) < upper);
        }
    }

    quickcheck! {
        fn kind_range_brackets_exactly_its_kind(name: String, other_kind: String) -> bool {
            let interner = Interner::new();
            let kind = QualifiedKind::new(&interner, "html", "attributes");
            let lower = SearchMapEntry::kind_lower_bound(&kind);
            let upper = SearchMapEntry::kind_upper_bound(&kind);
            let inside = SearchMapEntry::new(&kind, name.as_str());
            let mut ok = lower <= inside && inside < upper;
            if other_kind != "attributes" {
                let foreign = SearchMapEntry::new(
                    &QualifiedKind::new(&interner, "html", &other_kind),
                    name.as_str(),
                );
                ok &= !(lower <= foreign && foreign < upper);
            }
            ok
        }
    }
}
