//! Metadata inverted index and shard partitioning (§4.4, §4.7).

pub mod metadata_index;
pub mod partitioner;

pub use metadata_index::MetadataIndex;
pub use partitioner::{AffinityPartitioner, HashPartitioner, Partitioner};
