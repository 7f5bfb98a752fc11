//! String interning for qualified-name components
//!
//! Namespace and kind strings repeat across thousands of contributions, so
//! they are canonicalized to shared `Arc<str>` instances. Interned strings
//! compare equal by content but usually short-circuit on pointer identity,
//! and every `QualifiedKind` built through the same interner shares backing
//! storage with its peers.
//!
//! The interner is explicitly owned: embedders create one and pass it by
//! reference wherever qualified kinds are constructed. A process-wide
//! instance is available through [`Interner::process_wide`] for callers that
//! genuinely need a singleton; its lifetime is the process lifetime and it is
//! never cleared before process exit.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use rustc_hash::FxBuildHasher;

/// Canonicalizing string interner backed by a concurrent map
///
/// Thread-safe: interning may run concurrently with lookups from query
/// threads; the first writer for a given string wins and later interns of the
/// same content return the already-published `Arc`.
#[derive(Debug, Default)]
pub struct Interner {
    strings: DashMap<Arc<str>, (), FxBuildHasher>,
}

impl Interner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the canonical `Arc<str>` for `value`, inserting it if unseen
    pub fn intern(&self, value: &str) -> Arc<str> {
        // Fast path: already interned, no allocation
        if let Some(entry) = self.strings.get(value) {
            return entry.key().clone();
        }
        match self.strings.entry(Arc::from(value)) {
            Entry::Occupied(entry) => entry.key().clone(),
            Entry::Vacant(entry) => {
                let canonical = entry.key().clone();
                entry.insert(());
                canonical
            }
        }
    }

    /// Number of distinct strings interned so far
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// Shared process-wide interner
    ///
    /// Lives for the duration of the process and is only reclaimed at process
    /// exit. Prefer an explicitly owned [`Interner`] unless the embedding
    /// really calls for a singleton.
    pub fn process_wide() -> &'static Interner {
        static INSTANCE: Lazy<Interner> = Lazy::new(Interner::new);
        &INSTANCE
    }
}
