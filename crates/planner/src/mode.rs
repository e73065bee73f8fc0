//! Auto-mode resolution (§4.7 "Auto mode heuristics").

use crate::query::{Query, QueryMode};

/// Resolve `QueryMode::Auto` to a concrete mode. Already-concrete modes
/// pass through unchanged.
///
/// - `connected` set and `like` absent → `graph`.
/// - `connected` set and `like` present → `fusion`.
/// - only `where` → `metadata`.
/// - only `like` → `vector`.
/// - none of the above → `metadata` (an empty predicate matches everything,
///   which is the least surprising default for an otherwise-empty query).
pub fn resolve_mode(query: &Query) -> QueryMode {
    if query.mode != QueryMode::Auto {
        return query.mode;
    }
    match (query.connected.is_some(), query.like.is_some(), query.r#where.is_some()) {
        (true, true, _) => QueryMode::Fusion,
        (true, false, _) => QueryMode::Graph,
        (false, true, _) => QueryMode::Vector,
        (false, false, _) => QueryMode::Metadata,
    }
}
