//! Collaborator contracts consumed by the index
//!
//! The index treats three collaborators as black boxes: the names provider
//! (name normalization rules), the query context (per-query environment with
//! its own invalidation counter), and the caller's query parameters. Each
//! cache tier is keyed by the *instance* of one of these collaborators and
//! invalidated by its modification counter; see [`crate::scope`].

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::contribution::SymbolContribution;
use crate::model::QualifiedName;

/// Why names are being requested from a [`NamesProvider`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamesPurpose {
    /// Variants to index a declaration under
    Storage,
    /// Variants to look a queried name up under
    Query,
}

/// Name-normalization rules
///
/// `get_names` produces the ordered set of name variants for a qualified
/// name: storage variants while indexing, query variants while looking up.
/// The modification counter gates the per-provider map cache; advancing it
/// invalidates every `SearchMap` built with this provider.
pub trait NamesProvider: Send + Sync + fmt::Debug {
    fn get_names(&self, name: &QualifiedName, purpose: NamesPurpose) -> Vec<String>;

    fn modification_count(&self) -> u64;
}

/// The smallest useful names provider: names are stored and queried verbatim,
/// optionally with a lowercase query variant for case-insensitive kinds
#[derive(Debug, Default)]
pub struct IdentityNamesProvider {
    case_insensitive: bool,
    modifications: AtomicU64,
}

impl IdentityNamesProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn case_insensitive() -> Self {
        Self {
            case_insensitive: true,
            modifications: AtomicU64::new(0),
        }
    }

    /// Advance the modification counter, invalidating maps built with this
    /// provider on their next access
    pub fn bump_modification_count(&self) {
        self.modifications.fetch_add(1, Ordering::Release);
    }
}

impl NamesProvider for IdentityNamesProvider {
    fn get_names(&self, name: &QualifiedName, _purpose: NamesPurpose) -> Vec<String> {
        let mut names = vec![name.name.clone()];
        if self.case_insensitive {
            // Stored and queried alike, so any casing of a stored name hits
            // the lowercase key
            let lowered = name.name.to_lowercase();
            if lowered != name.name {
                names.push(lowered);
            }
        }
        names
    }

    fn modification_count(&self) -> u64 {
        self.modifications.load(Ordering::Acquire)
    }
}

/// Per-query environment
///
/// Exposes a modification counter gating the per-context symbol cache, plus
/// the origin information context-match predicates consume.
pub trait QueryContext: Send + Sync + fmt::Debug {
    fn modification_count(&self) -> u64;

    /// Framework the queried location belongs to, if any
    fn framework(&self) -> Option<&str>;
}

/// Caller-supplied predicate over contributions, applied after context
/// matching
pub type ContributionFilter = Arc<dyn Fn(&dyn SymbolContribution) -> bool + Send + Sync>;

/// Parameters of a single query
#[derive(Clone)]
pub struct QueryParams {
    pub context: Arc<dyn QueryContext>,
    pub names_provider: Arc<dyn NamesProvider>,
    filter: Option<ContributionFilter>,
}

impl QueryParams {
    pub fn new(context: Arc<dyn QueryContext>, names_provider: Arc<dyn NamesProvider>) -> Self {
        Self {
            context,
            names_provider,
            filter: None,
        }
    }

    pub fn with_filter(mut self, filter: ContributionFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Combined context-match and caller-predicate check for one contribution
    pub fn accepts(&self, contribution: &dyn SymbolContribution) -> bool {
        contribution.matches_context(&*self.context)
            && self.filter.as_ref().is_none_or(|filter| (**filter)(contribution))
    }
}

impl fmt::Debug for QueryParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryParams")
            .field("context", &self.context)
            .field("names_provider", &self.names_provider)
            .field("filter", &self.filter.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

/// Recursion guard threaded through pattern evaluation
///
/// Pattern engines push an identifier for every scope they expand and refuse
/// to expand one that is already on the stack. The index itself never reads
/// the stack; it only passes it through.
#[derive(Debug, Clone, Default)]
pub struct QueryStack {
    frames: Vec<u64>,
}

impl QueryStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a frame; returns `false` without pushing when `id` is already on
    /// the stack
    pub fn push(&mut self, id: u64) -> bool {
        if self.frames.contains(&id) {
            return false;
        }
        self.frames.push(id);
        true
    }

    pub fn pop(&mut self) -> Option<u64> {
        self.frames.pop()
    }

    pub fn contains(&self, id: u64) -> bool {
        self.frames.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Fixed query context for embedders without framework detection, and for
/// tests
#[derive(Debug, Default)]
pub struct StaticQueryContext {
    framework: Option<String>,
    modifications: AtomicU64,
}

impl StaticQueryContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_framework(framework: impl Into<String>) -> Self {
        Self {
            framework: Some(framework.into()),
            modifications: AtomicU64::new(0),
        }
    }

    /// Advance the modification counter, invalidating symbols materialized
    /// under this context on their next access
    pub fn bump_modification_count(&self) {
        self.modifications.fetch_add(1, Ordering::Release);
    }
}

impl QueryContext for StaticQueryContext {
    fn modification_count(&self) -> u64 {
        self.modifications.load(Ordering::Acquire)
    }

    fn framework(&self) -> Option<&str> {
        self.framework.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interner::Interner;
    use crate::model::{QualifiedKind, QualifiedName};

    #[test]
    fn identity_provider_returns_name_verbatim() {
        let interner = Interner::new();
        let name = QualifiedName::new(
            QualifiedKind::new(&interner, "html", "attributes"),
            "disabled",
        );
        let provider = IdentityNamesProvider::new();
        assert_eq!(
            provider.get_names(&name, NamesPurpose::Storage),
            vec!["disabled".to_string()]
        );
        assert_eq!(
            provider.get_names(&name, NamesPurpose::Query),
            vec!["disabled".to_string()]
        );
    }

    #[test]
    fn case_insensitive_provider_adds_query_variant() {
        let interner = Interner::new();
        let name = QualifiedName::new(
            QualifiedKind::new(&interner, "html", "elements"),
            "MyComponent",
        );
        let provider = IdentityNamesProvider::case_insensitive();
        assert_eq!(
            provider.get_names(&name, NamesPurpose::Storage),
            vec!["MyComponent".to_string(), "mycomponent".to_string()]
        );
        assert_eq!(
            provider.get_names(&name, NamesPurpose::Query),
            vec!["MyComponent".to_string(), "mycomponent".to_string()]
        );
    }

    #[test]
    fn stack_rejects_duplicate_frames() {
        let mut stack = QueryStack::new();
        assert!(stack.push(7));
        assert!(!stack.push(7));
        assert_eq!(stack.len(), 1);
        assert_eq!(stack.pop(), Some(7));
        assert!(stack.is_empty());
    }
}
