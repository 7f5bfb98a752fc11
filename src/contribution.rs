//! Contribution adapters and declaration-source roots
//!
//! Every external declaration is wrapped into a [`SymbolContribution`] before
//! it reaches the index: one trait exposing the minimal capability set the
//! index needs (qualified kind, name, optional pattern, framework tag,
//! context-match predicate, and a pure `materialize` factory). Declaration
//! sources register [`ContributionRoot`] aggregates with the scope; the scope
//! builds one `SearchMap` per (root, names provider) pair on demand.

use std::fmt;
use std::sync::Arc;

use crate::model::{CodeCompletionItem, QualifiedKind, QualifiedName, Symbol, SymbolOrigin};
use crate::pattern::PatternHandle;
use crate::query::{QueryContext, QueryParams};

/// One external declaration, ready for indexing
///
/// `materialize` must be pure: identical (contribution, query context) inputs
/// always yield contract-equal symbols, which is what makes the per-context
/// symbol cache sound.
pub trait SymbolContribution: Send + Sync + fmt::Debug {
    fn qualified_kind(&self) -> QualifiedKind;

    fn name(&self) -> &str;

    fn qualified_name(&self) -> QualifiedName {
        QualifiedName::new(self.qualified_kind(), self.name())
    }

    /// Name-family pattern, or `None` for a literal declaration
    fn pattern(&self) -> Option<PatternHandle> {
        None
    }

    /// Framework this contribution is scoped to, `None` for framework-neutral
    fn framework(&self) -> Option<&str> {
        None
    }

    /// Extension contributions augment same-name matches instead of competing
    /// for the best match
    fn extension(&self) -> bool {
        false
    }

    /// Whether this contribution applies under the given query context
    fn matches_context(&self, context: &dyn QueryContext) -> bool {
        match (self.framework(), context.framework()) {
            (None, _) => true,
            (Some(own), Some(active)) => own == active,
            (Some(_), None) => false,
        }
    }

    /// Produce the symbol this contribution resolves to
    fn materialize(&self, context: &dyn QueryContext) -> Symbol;

    /// Generate completion items for the already-typed `name`
    ///
    /// Literal contributions offer their own name; pattern contributions
    /// delegate to the pattern engine by default.
    fn code_completions(&self, name: &QualifiedName, params: &QueryParams) -> Vec<CodeCompletionItem> {
        match self.pattern() {
            None => {
                let symbol = self.materialize(&*params.context);
                vec![CodeCompletionItem::new(self.name()).with_priority(symbol.priority)]
            }
            Some(pattern) => {
                let owner = self.materialize(&*params.context);
                pattern.code_completions(&owner, &name.name, params)
            }
        }
    }
}

/// Shared handle to a contribution
pub type ContributionHandle = Arc<dyn SymbolContribution>;

/// Identity of a contribution: pointer identity of its `Arc`
///
/// Used as the deduplication key in range scans and as the per-context symbol
/// cache key. Stable for as long as the `Arc` is alive, which the owning
/// [`ContributionRoot`] guarantees while the contribution is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContributionId(usize);

impl ContributionId {
    pub fn of(contribution: &ContributionHandle) -> Self {
        Self(Arc::as_ptr(contribution) as *const () as usize)
    }
}

/// Identity of a registered root within a scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RootId(pub(crate) u64);

/// Hook for resolving type references attached to a declaration source
pub trait TypeSupport: Send + Sync + fmt::Debug {
    fn resolve_type(&self, reference: &str) -> Option<String>;
}

/// One declaration source: an aggregate of contributions plus provenance
#[derive(Debug, Clone)]
pub struct ContributionRoot {
    id: RootId,
    origin: SymbolOrigin,
    type_support: Option<Arc<dyn TypeSupport>>,
    contributions: Vec<ContributionHandle>,
}

impl ContributionRoot {
    pub(crate) fn new(
        id: RootId,
        origin: SymbolOrigin,
        type_support: Option<Arc<dyn TypeSupport>>,
        contributions: Vec<ContributionHandle>,
    ) -> Self {
        Self {
            id,
            origin,
            type_support,
            contributions,
        }
    }

    pub fn id(&self) -> RootId {
        self.id
    }

    pub fn origin(&self) -> &SymbolOrigin {
        &self.origin
    }

    pub fn type_support(&self) -> Option<&Arc<dyn TypeSupport>> {
        self.type_support.as_ref()
    }

    pub fn contributions(&self) -> &[ContributionHandle] {
        &self.contributions
    }

    /// Whether any of this root's contributions can apply under `context`
    ///
    /// Checked before building or touching the root's map, so a context
    /// mismatch costs only this predicate.
    pub fn matches_context(&self, context: &dyn QueryContext) -> bool {
        match (self.origin.framework.as_deref(), context.framework()) {
            (None, _) => true,
            (Some(own), Some(active)) => own == active,
            (Some(_), None) => false,
        }
    }
}
