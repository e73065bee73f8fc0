//! Inverted index over `(field, value)` pairs, ordered so range filters
//! (`year >= 2020`) can be answered by a `BTreeMap` range scan rather than
//! a full metadata scan. A field index is just a map from key to the
//! set of ids carrying it, maintained incrementally on insert/remove.

use std::collections::{BTreeMap, BTreeSet};

use vgdb_core::value::MetaValue;
use vgdb_core::NounId;

/// One field's index: `value -> ids carrying that value`, in value order
/// so range queries are a contiguous `BTreeMap` range.
#[derive(Debug, Default)]
struct FieldIndex {
    by_value: BTreeMap<MetaValue, BTreeSet<NounId>>,
}

impl FieldIndex {
    fn insert(&mut self, value: MetaValue, id: NounId) {
        self.by_value.entry(value).or_default().insert(id);
    }

    fn remove(&mut self, value: &MetaValue, id: NounId) {
        if let Some(ids) = self.by_value.get_mut(value) {
            ids.remove(&id);
            if ids.is_empty() {
                self.by_value.remove(value);
            }
        }
    }

    fn eq_ids(&self, value: &MetaValue) -> BTreeSet<NounId> {
        self.by_value.get(value).cloned().unwrap_or_default()
    }

    fn range_ids(&self, lower: Option<&MetaValue>, upper: Option<&MetaValue>) -> BTreeSet<NounId> {
        let mut out = BTreeSet::new();
        let range = match (lower, upper) {
            (Some(l), Some(u)) => self.by_value.range(l.clone()..=u.clone()),
            (Some(l), None) => self.by_value.range(l.clone()..),
            (None, Some(u)) => self.by_value.range(..=u.clone()),
            (None, None) => self.by_value.range(..),
        };
        for (_, ids) in range {
            out.extend(ids.iter().copied());
        }
        out
    }
}

/// Inverted metadata index across every field seen on any noun (§4.7
/// "metadata mode").
#[derive(Debug, Default)]
pub struct MetadataIndex {
    fields: BTreeMap<String, FieldIndex>,
}

impl MetadataIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index one field/value pair for `id`.
    pub fn insert(&mut self, field: &str, value: MetaValue, id: NounId) {
        self.fields.entry(field.to_string()).or_default().insert(value, id);
    }

    /// Remove one field/value pair for `id` (called on delete, update-before-write,
    /// or when a field's value changes).
    pub fn remove(&mut self, field: &str, value: &MetaValue, id: NounId) {
        if let Some(index) = self.fields.get_mut(field) {
            index.remove(value, id);
        }
    }

    /// All ids where `field == value`.
    pub fn eq_ids(&self, field: &str, value: &MetaValue) -> BTreeSet<NounId> {
        self.fields.get(field).map(|i| i.eq_ids(value)).unwrap_or_default()
    }

    /// All ids where `field` falls within `[lower, upper]` (either bound
    /// optional for open ranges).
    pub fn range_ids(&self, field: &str, lower: Option<&MetaValue>, upper: Option<&MetaValue>) -> BTreeSet<NounId> {
        self.fields.get(field).map(|i| i.range_ids(lower, upper)).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eq_lookup_finds_inserted_id() {
        let mut idx = MetadataIndex::new();
        let id = NounId::new();
        idx.insert("category", MetaValue::Str("doc".into()), id);
        assert!(idx.eq_ids("category", &MetaValue::Str("doc".into())).contains(&id));
    }

    #[test]
    fn remove_drops_id_from_eq_lookup() {
        let mut idx = MetadataIndex::new();
        let id = NounId::new();
        let value = MetaValue::Str("doc".into());
        idx.insert("category", value.clone(), id);
        idx.remove("category", &value, id);
        assert!(idx.eq_ids("category", &value).is_empty());
    }

    #[test]
    fn range_query_returns_ids_within_bounds() {
        let mut idx = MetadataIndex::new();
        let ids: Vec<NounId> = (0..5).map(|_| NounId::new()).collect();
        for (i, &id) in ids.iter().enumerate() {
            idx.insert("year", MetaValue::Int(2020 + i as i64), id);
        }
        let matched = idx.range_ids("year", Some(&MetaValue::Int(2021)), Some(&MetaValue::Int(2023)));
        assert_eq!(matched.len(), 3);
        assert!(matched.contains(&ids[1]));
        assert!(matched.contains(&ids[3]));
        assert!(!matched.contains(&ids[0]));
        assert!(!matched.contains(&ids[4]));
    }
}
