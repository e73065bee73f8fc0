//! HNSW approximate nearest-neighbor index over noun vectors (§4.1).

#![warn(clippy::all)]

pub mod distance;
pub mod filter;
pub mod graph;
pub mod index;

pub use filter::MetadataFilter;
pub use graph::{HnswConfig, HnswGraph, VectorSource};
pub use index::HnswIndex;
