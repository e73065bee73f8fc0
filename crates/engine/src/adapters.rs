//! Bridges the planner's trait seams (`VectorSearch`, `MetadataSource`,
//! `GraphSource`) onto a live [`Database`] and the embedding collaborator
//! (§6 "Embedding collaborator").

use vgdb_core::value::Metadata;
use vgdb_core::{Error, NounId, Result, VerbType};
use vgdb_planner::{GraphSource, MetadataSource, VectorSearch};

use crate::database::Database;

/// Seam to the external embedding collaborator: `embed(text) -> vector`
/// (§6). Implementations may call out to a model server; failures are
/// transient and should surface as `Error::StorageFailure` so the
/// caller's retry policy applies.
pub trait Embedder: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// A deterministic, dependency-free embedder for tests: hashes the text
/// into a low-dimensional unit vector. Never used in production — no
/// semantic relationship to the input beyond determinism.
#[derive(Debug, Default)]
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension: dimension.max(2) }
    }
}

impl Embedder for HashEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0f32; self.dimension];
        for (i, byte) in text.bytes().enumerate() {
            vector[i % self.dimension] += byte as f32;
        }
        if vector.iter().all(|x| *x == 0.0) {
            vector[0] = 1.0;
        }
        vgdb_core::Noun::normalize(&mut vector);
        Ok(vector)
    }
}

/// Wires a [`Database`] and [`Embedder`] into the planner's three data-
/// source traits. Stateless beyond the borrows.
pub struct DatabaseSources<'a> {
    db: &'a Database,
    embedder: &'a dyn Embedder,
}

impl<'a> DatabaseSources<'a> {
    pub fn new(db: &'a Database, embedder: &'a dyn Embedder) -> Self {
        Self { db, embedder }
    }
}

impl VectorSearch for DatabaseSources<'_> {
    fn search_text(&self, text: &str, k: usize) -> Result<Vec<(NounId, f32)>> {
        let vector = self.embedder.embed(text)?;
        self.search_vector(&vector, k)
    }

    fn search_vector(&self, vector: &[f32], k: usize) -> Result<Vec<(NounId, f32)>> {
        if !vgdb_core::Noun::is_unit_norm(vector) {
            return Err(Error::InvalidArgument("query vector is not unit-norm".into()));
        }
        Ok(self.db.index().read().search(vector, k))
    }
}

impl MetadataSource for DatabaseSources<'_> {
    fn all_ids(&self) -> Vec<NounId> {
        self.db.all_noun_ids()
    }

    fn metadata_of(&self, id: NounId) -> Option<Metadata> {
        self.db.metadata_of(id)
    }
}

impl GraphSource for DatabaseSources<'_> {
    fn outgoing(&self, id: NounId) -> Vec<(VerbType, NounId)> {
        self.db
            .verbs_by_source(id)
            .into_iter()
            .filter_map(|verb_id| self.db.get_verb(verb_id, 0, true).ok().flatten())
            .filter(|verb| !verb.is_tombstoned() && !verb.dangling)
            .map(|verb| (verb.verb_type, verb.target))
            .collect()
    }

    fn incoming(&self, id: NounId) -> Vec<(VerbType, NounId)> {
        self.db
            .verbs_by_target(id)
            .into_iter()
            .filter_map(|verb_id| self.db.get_verb(verb_id, 0, true).ok().flatten())
            .filter(|verb| !verb.is_tombstoned() && !verb.dangling)
            .map(|verb| (verb.verb_type, verb.source))
            .collect()
    }
}
