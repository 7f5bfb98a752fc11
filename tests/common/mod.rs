//! Shared mock contributions, patterns, and providers for integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use framework_symbols::contribution::{ContributionHandle, SymbolContribution};
use framework_symbols::interner::Interner;
use framework_symbols::model::{
    CodeCompletionItem, NameSegment, Priority, QualifiedKind, QualifiedName, Symbol, SymbolOrigin,
};
use framework_symbols::pattern::{PatternHandle, SymbolPattern};
use framework_symbols::query::{QueryParams, QueryStack};

pub fn attribute_kind(interner: &Interner) -> QualifiedKind {
    QualifiedKind::new(interner, "html", "attributes")
}

pub fn element_kind(interner: &Interner) -> QualifiedKind {
    QualifiedKind::new(interner, "html", "elements")
}

/// Pattern matching any name starting with one of its declared prefixes
///
/// Records every name it was asked to evaluate, so tests can assert the
/// prefix walk never hands it names outside its prefixes.
#[derive(Debug)]
pub struct PrefixPattern {
    prefixes: Vec<String>,
    evaluations: Mutex<Vec<String>>,
}

impl PrefixPattern {
    pub fn new(prefixes: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            prefixes: prefixes.iter().map(|p| p.to_string()).collect(),
            evaluations: Mutex::new(Vec::new()),
        })
    }

    /// Names this pattern's full predicate was evaluated against
    pub fn evaluated_names(&self) -> Vec<String> {
        self.evaluations.lock().clone()
    }
}

impl SymbolPattern for PrefixPattern {
    fn static_prefixes(&self) -> Vec<String> {
        self.prefixes.clone()
    }

    fn matches(
        &self,
        owner: &Symbol,
        name: &str,
        _params: &QueryParams,
        _stack: &mut QueryStack,
    ) -> Vec<Symbol> {
        self.evaluations.lock().push(name.to_string());
        let matched_prefix = self
            .prefixes
            .iter()
            .filter(|prefix| name.starts_with(prefix.as_str()))
            .map(|prefix| prefix.len())
            .max()
            .or_else(|| self.prefixes.is_empty().then_some(0));
        match matched_prefix {
            Some(prefix_len) => {
                let mut symbol = Symbol::new(name, owner.kind.clone(), owner.origin.clone())
                    .with_priority(owner.priority)
                    .with_segments(vec![NameSegment::matched(0, name.len(), prefix_len as i32)]);
                symbol.extension = owner.extension;
                vec![symbol]
            }
            None => Vec::new(),
        }
    }

    fn code_completions(
        &self,
        owner: &Symbol,
        _name: &str,
        _params: &QueryParams,
    ) -> Vec<CodeCompletionItem> {
        self.prefixes
            .iter()
            .map(|prefix| CodeCompletionItem::new(prefix.clone()).with_priority(owner.priority))
            .collect()
    }
}

/// A deliberately broken pattern: evaluation panics
#[derive(Debug)]
pub struct MalformedPattern {
    prefixes: Vec<String>,
}

impl MalformedPattern {
    pub fn new(prefixes: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            prefixes: prefixes.iter().map(|p| p.to_string()).collect(),
        })
    }
}

impl SymbolPattern for MalformedPattern {
    fn static_prefixes(&self) -> Vec<String> {
        self.prefixes.clone()
    }

    fn matches(
        &self,
        _owner: &Symbol,
        name: &str,
        _params: &QueryParams,
        _stack: &mut QueryStack,
    ) -> Vec<Symbol> {
        panic!("malformed pattern evaluated against {name:?}");
    }
}

/// Configurable mock contribution counting its materializations
#[derive(Debug)]
pub struct MockContribution {
    kind: QualifiedKind,
    name: String,
    pattern: Option<PatternHandle>,
    framework: Option<String>,
    extension: bool,
    priority: Priority,
    materializations: AtomicU64,
}

impl MockContribution {
    pub fn literal(kind: QualifiedKind, name: &str) -> Self {
        Self {
            kind,
            name: name.to_string(),
            pattern: None,
            framework: None,
            extension: false,
            priority: Priority::Normal,
            materializations: AtomicU64::new(0),
        }
    }

    pub fn with_pattern(mut self, pattern: PatternHandle) -> Self {
        self.pattern = Some(pattern);
        self
    }

    pub fn with_framework(mut self, framework: &str) -> Self {
        self.framework = Some(framework.to_string());
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn as_extension(mut self) -> Self {
        self.extension = true;
        self
    }

    pub fn build(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// How many times `materialize` ran; cache hits do not increment this
    pub fn materialization_count(&self) -> u64 {
        self.materializations.load(Ordering::Relaxed)
    }
}

impl SymbolContribution for MockContribution {
    fn qualified_kind(&self) -> QualifiedKind {
        self.kind.clone()
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn pattern(&self) -> Option<PatternHandle> {
        self.pattern.clone()
    }

    fn framework(&self) -> Option<&str> {
        self.framework.as_deref()
    }

    fn extension(&self) -> bool {
        self.extension
    }

    fn materialize(
        &self,
        _context: &dyn framework_symbols::query::QueryContext,
    ) -> Symbol {
        self.materializations.fetch_add(1, Ordering::Relaxed);
        let origin = match &self.framework {
            Some(framework) => SymbolOrigin::for_framework(framework.clone()),
            None => SymbolOrigin::default(),
        };
        let mut symbol = Symbol::new(self.name.clone(), self.kind.clone(), origin)
            .with_priority(self.priority);
        if self.extension {
            symbol = symbol.as_extension();
        }
        symbol
    }
}

pub fn handle(contribution: &Arc<MockContribution>) -> ContributionHandle {
    contribution.clone()
}
