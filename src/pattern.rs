//! Pattern engine contract
//!
//! A pattern describes a whole family of names (e.g. every `v-`-prefixed
//! attribute) instead of one literal. The index never interprets patterns; it
//! only uses their static prefixes to bound which patterns are worth
//! evaluating for a given query name, then delegates the expensive match to
//! the engine. See [`crate::search_map`] for the bounded prefix walk.

use std::fmt;
use std::sync::Arc;

use crate::model::Symbol;
use crate::query::{QueryParams, QueryStack};

/// A name-family pattern supplied by a declaration source
///
/// `static_prefixes` must return strings every matched name is guaranteed to
/// start with; an empty set (or one containing the empty string) declares the
/// pattern a candidate for every query. `matches` runs the full predicate and
/// is assumed comparatively expensive.
///
/// A malformed pattern may panic during evaluation; the index does not catch
/// the panic, it reaches the caller.
pub trait SymbolPattern: Send + Sync + fmt::Debug {
    /// Fixed strings every name this pattern can match starts with
    fn static_prefixes(&self) -> Vec<String>;

    /// Evaluate the pattern against a complete query name
    ///
    /// `owner` is the materialized symbol of the contribution declaring this
    /// pattern; implementations typically derive the result symbols from it.
    fn matches(
        &self,
        owner: &Symbol,
        name: &str,
        params: &QueryParams,
        stack: &mut QueryStack,
    ) -> Vec<Symbol>;

    /// Completion items this pattern offers for the already-typed `name`
    ///
    /// The default offers nothing; engines with enumerable expansions
    /// override this.
    fn code_completions(
        &self,
        owner: &Symbol,
        name: &str,
        params: &QueryParams,
    ) -> Vec<crate::model::CodeCompletionItem> {
        let _ = (owner, name, params);
        Vec::new()
    }
}

/// Shared handle to a pattern
pub type PatternHandle = Arc<dyn SymbolPattern>;
