//! Metadata equality filtering applied during beam search (§4.7
//! "metadata mode" and filtered vector search). Supports only equality on
//! top-level fields; range/nested filtering belongs to the planner's
//! metadata-mode predicate grammar, not the index.

use vgdb_core::value::{MetaValue, Metadata};

/// A conjunction of `field == value` equality constraints.
#[derive(Debug, Clone, Default)]
pub struct MetadataFilter {
    constraints: Vec<(String, MetaValue)>,
}

impl MetadataFilter {
    /// An empty filter, matching everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an equality constraint, builder-style.
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<MetaValue>) -> Self {
        self.constraints.push((field.into(), value.into()));
        self
    }

    /// Whether this filter has no constraints.
    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    /// Number of constraints.
    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    /// Whether `metadata` satisfies every constraint.
    pub fn matches(&self, metadata: &Metadata) -> bool {
        self.constraints
            .iter()
            .all(|(field, want)| metadata.get(field).is_some_and(|got| got == want))
    }
}

impl From<bool> for MetaValue {
    fn from(v: bool) -> Self {
        MetaValue::Bool(v)
    }
}

impl From<i64> for MetaValue {
    fn from(v: i64) -> Self {
        MetaValue::Int(v)
    }
}

impl From<f64> for MetaValue {
    fn from(v: f64) -> Self {
        MetaValue::Float(v)
    }
}

impl From<&str> for MetaValue {
    fn from(v: &str) -> Self {
        MetaValue::Str(v.to_string())
    }
}

impl From<String> for MetaValue {
    fn from(v: String) -> Self {
        MetaValue::Str(v)
    }
}
