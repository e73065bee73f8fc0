//! Triple-fusion query planner: vector, graph, and metadata modes merged
//! into one ranked, paginated result (§4.7).

#![warn(clippy::all)]

pub mod cursor;
pub mod graph;
pub mod mode;
pub mod planner;
pub mod predicate;
pub mod query;
pub mod scorer;

pub use cursor::Cursor;
pub use graph::GraphSource;
pub use mode::resolve_mode;
pub use planner::{MetadataSource, PlanResult, QueryPlanner, VectorSearch};
pub use predicate::Predicate;
pub use query::{ConnectedClause, LikeClause, Query, QueryMode};
pub use scorer::{fuse, CandidateSignals, FusionWeights, ScoredCandidate};
