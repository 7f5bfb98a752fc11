//! Data model for qualified symbol names, materialized symbols, and
//! code-completion items
//!
//! A symbol family is identified by a qualified name: a (namespace, kind,
//! name) triple such as `("html", "attributes", "disabled")`. Namespace and
//! kind strings are interned (see [`crate::interner::Interner`]) so equal
//! pairs share backing storage across the whole index.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::interner::Interner;

/// Interned (namespace, kind) pair identifying a family of symbols
///
/// Constructed through an [`Interner`] so that equal pairs share their
/// backing strings. Equality and hashing are structural.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QualifiedKind {
    pub namespace: Arc<str>,
    pub kind: Arc<str>,
}

impl QualifiedKind {
    pub fn new(interner: &Interner, namespace: &str, kind: &str) -> Self {
        Self {
            namespace: interner.intern(namespace),
            kind: interner.intern(kind),
        }
    }
}

/// A qualified kind plus a concrete symbol name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QualifiedName {
    pub kind: QualifiedKind,
    pub name: String,
}

impl QualifiedName {
    pub fn new(kind: QualifiedKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

/// Declaration-time priority of a symbol, used for result ranking
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Priority {
    Lowest,
    Low,
    #[default]
    Normal,
    High,
    Highest,
}

impl Priority {
    /// Numeric weight used by best-match selection
    pub fn value(self) -> u32 {
        match self {
            Priority::Lowest => 0,
            Priority::Low => 1,
            Priority::Normal => 10,
            Priority::High => 50,
            Priority::Highest => 100,
        }
    }
}

/// Why a matched name segment is considered problematic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchProblem {
    /// A required part of the name is absent from the queried text
    MissingRequiredPart,
    /// The segment resolved to no known symbol
    UnknownSymbol,
}

/// One matched segment of a symbol name
///
/// `start`/`end` are byte offsets into the matched name. `match_score`
/// rewards longer, non-wildcard static matches and feeds the third component
/// of the best-match weight.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NameSegment {
    pub start: usize,
    pub end: usize,
    pub problem: Option<MatchProblem>,
    pub match_score: i32,
}

impl NameSegment {
    /// A clean segment covering `start..end`
    pub fn matched(start: usize, end: usize, match_score: i32) -> Self {
        Self {
            start,
            end,
            problem: None,
            match_score,
        }
    }

    /// A segment flagged with a match problem
    pub fn problematic(start: usize, end: usize, problem: MatchProblem) -> Self {
        Self {
            start,
            end,
            problem: Some(problem),
            match_score: 0,
        }
    }
}

/// Provenance of a group of contributions: which framework and library
/// declared them
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SymbolOrigin {
    pub framework: Option<String>,
    pub library: Option<String>,
    pub version: Option<String>,
}

impl SymbolOrigin {
    pub fn for_framework(framework: impl Into<String>) -> Self {
        Self {
            framework: Some(framework.into()),
            ..Self::default()
        }
    }
}

/// A materialized symbol: the result form queries return
///
/// Symbols are produced by [`crate::contribution::SymbolContribution::materialize`]
/// and cached per (contribution, query context) pair; materialization is pure,
/// so identical inputs always yield equal symbols.
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub name: String,
    pub kind: QualifiedKind,
    pub origin: SymbolOrigin,
    pub priority: Priority,
    /// Extension symbols augment same-name matches instead of competing with
    /// them during best-match selection
    pub extension: bool,
    pub segments: Vec<NameSegment>,
    /// The originally queried, un-normalized name this symbol was returned
    /// for, when it differs from the declared name
    pub matched_name: Option<String>,
}

impl Symbol {
    pub fn new(name: impl Into<String>, kind: QualifiedKind, origin: SymbolOrigin) -> Self {
        let name = name.into();
        let len = name.len();
        Self {
            name,
            kind,
            origin,
            priority: Priority::Normal,
            extension: false,
            segments: vec![NameSegment::matched(0, len, 0)],
            matched_name: None,
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn as_extension(mut self) -> Self {
        self.extension = true;
        self
    }

    pub fn with_segments(mut self, segments: Vec<NameSegment>) -> Self {
        self.segments = segments;
        self
    }

    /// Tag this symbol with the originally queried name
    pub fn with_matched_name(mut self, matched_name: &str) -> Self {
        if matched_name != self.name {
            self.matched_name = Some(matched_name.to_string());
        }
        self
    }

    /// Byte offset of the first problematic segment, `None` for a clean match
    pub fn first_problem_offset(&self) -> Option<usize> {
        self.segments
            .iter()
            .find(|segment| segment.problem.is_some())
            .map(|segment| segment.start)
    }

    /// Sum of per-segment match scores
    pub fn match_score(&self) -> i64 {
        self.segments
            .iter()
            .map(|segment| segment.match_score as i64)
            .sum()
    }
}

/// One entry offered in a completion popup
///
/// Deduplication key is `(name, offset)`: a single contribution may generate
/// several items, and the same item may be reachable through several static
/// prefixes of one pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CodeCompletionItem {
    /// Text inserted on completion
    pub name: String,
    /// How many bytes of already-typed text the item replaces
    pub offset: usize,
    pub priority: Priority,
    /// Label shown in the popup when it differs from `name`
    pub display_name: Option<String>,
}

impl CodeCompletionItem {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            offset: 0,
            priority: Priority::Normal,
            display_name: None,
        }
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_values_are_monotonic() {
        let ordered = [
            Priority::Lowest,
            Priority::Low,
            Priority::Normal,
            Priority::High,
            Priority::Highest,
        ];
        for pair in ordered.windows(2) {
            assert!(pair[0].value() < pair[1].value());
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn first_problem_offset_skips_clean_segments() {
        let interner = Interner::new();
        let kind = QualifiedKind::new(&interner, "html", "attributes");
        let symbol = Symbol::new("v-bind", kind, SymbolOrigin::default()).with_segments(vec![
            NameSegment::matched(0, 2, 4),
            NameSegment::problematic(2, 6, MatchProblem::UnknownSymbol),
        ]);
        assert_eq!(symbol.first_problem_offset(), Some(2));
        assert_eq!(symbol.match_score(), 4);
    }

    #[test]
    fn matched_name_tag_skips_identical_name() {
        let interner = Interner::new();
        let kind = QualifiedKind::new(&interner, "html", "attributes");
        let symbol =
            Symbol::new("disabled", kind, SymbolOrigin::default()).with_matched_name("disabled");
        assert_eq!(symbol.matched_name, None);
    }
}
