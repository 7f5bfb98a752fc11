//! Best-match selection and presentation ordering
//!
//! Raw index results may contain several candidates for one queried name:
//! clean literal matches, partial pattern matches with problematic segments,
//! and extension symbols that merely augment whatever wins. Selection keeps
//! every candidate tied for the best 3-component weight and passes extensions
//! through untouched.

use crate::model::Symbol;

/// Lexicographic weight of a non-extension candidate; higher is better
///
/// Components: byte offset of the first problematic segment (`usize::MAX`
/// for a clean match), declared priority, summed per-segment match scores.
fn weight(symbol: &Symbol) -> (usize, u32, i64) {
    (
        symbol.first_problem_offset().unwrap_or(usize::MAX),
        symbol.priority.value(),
        symbol.match_score(),
    )
}

/// Keep only the candidates tied for the best weight, plus every extension
///
/// Extensions augment results rather than competing for "the" answer, so
/// they are appended regardless of weight. Ties on the full weight tuple are
/// all retained, preserving input order.
pub fn select_best_matches(symbols: Vec<Symbol>) -> Vec<Symbol> {
    let mut best_weight: Option<(usize, u32, i64)> = None;
    let mut retained: Vec<Symbol> = Vec::new();
    let mut extensions: Vec<Symbol> = Vec::new();
    for symbol in symbols {
        if symbol.extension {
            extensions.push(symbol);
            continue;
        }
        let candidate_weight = weight(&symbol);
        match best_weight {
            None => {
                best_weight = Some(candidate_weight);
                retained.push(symbol);
            }
            Some(best) if candidate_weight > best => {
                best_weight = Some(candidate_weight);
                retained.clear();
                retained.push(symbol);
            }
            Some(best) if candidate_weight == best => retained.push(symbol),
            Some(_) => {}
        }
    }
    retained.append(&mut extensions);
    retained
}

/// Order a flat symbol list for presentation: extensions last, then
/// descending priority
///
/// The sort is stable, so same-priority symbols keep their index order.
pub fn sort_symbols_by_priority(symbols: &mut [Symbol]) {
    symbols.sort_by(|a, b| {
        a.extension
            .cmp(&b.extension)
            .then_with(|| b.priority.cmp(&a.priority))
    });
}
