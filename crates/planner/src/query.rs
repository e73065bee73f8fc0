//! Query request shape (§4.7 "Accepts").

use serde::{Deserialize, Serialize};
use vgdb_core::NounId;
use vgdb_core::VerbType;

use crate::predicate::Predicate;

/// What the caller matches `like` against: free text to embed, or an
/// already-embedded vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LikeClause {
    Text(String),
    Vector(Vec<f32>),
}

/// Graph-traversal constraint: BFS/DFS from `from` (or to `to`), up to
/// `depth`, optionally restricted to one verb type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectedClause {
    pub from: Option<NounId>,
    pub to: Option<NounId>,
    pub via: Option<VerbType>,
    pub depth: Option<u32>,
}

/// Which mode(s) a query runs in. `Auto` is resolved by
/// [`crate::planner::resolve_mode`] before planning begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryMode {
    #[default]
    Auto,
    Vector,
    Graph,
    Metadata,
    Fusion,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub like: Option<LikeClause>,
    pub r#where: Option<Predicate>,
    pub connected: Option<ConnectedClause>,
    pub mode: QueryMode,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    pub cursor: Option<String>,
    pub max_depth: Option<u32>,
    pub parallel: Option<bool>,
    pub timeout_us: Option<u64>,
    pub exclude_deleted: Option<bool>,
    pub allow_direct_reads: Option<bool>,
}

impl Query {
    pub fn effective_limit(&self) -> usize {
        self.limit.unwrap_or(10)
    }

    pub fn effective_offset(&self) -> usize {
        self.offset.unwrap_or(0)
    }

    /// Deterministic fingerprint binding a cursor to the exact query it
    /// was minted under (§4.7 "Cursor pagination").
    pub fn fingerprint(&self) -> u64 {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        format!("{self:?}").hash(&mut hasher);
        hasher.finish()
    }
}
