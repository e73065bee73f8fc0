//! Metadata predicate grammar (§4.7 "Predicate grammar").
//!
//! Leaves: `eq, ne, in, notIn, gt, gte, lt, lte, contains, startsWith,
//! endsWith`. Internals: `and, or, not`.

use serde::{Deserialize, Serialize};
use vgdb_core::value::{MetaValue, Metadata};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Predicate {
    Eq { field: String, value: MetaValue },
    Ne { field: String, value: MetaValue },
    In { field: String, values: Vec<MetaValue> },
    NotIn { field: String, values: Vec<MetaValue> },
    Gt { field: String, value: MetaValue },
    Gte { field: String, value: MetaValue },
    Lt { field: String, value: MetaValue },
    Lte { field: String, value: MetaValue },
    Contains { field: String, value: MetaValue },
    StartsWith { field: String, value: MetaValue },
    EndsWith { field: String, value: MetaValue },
    And { clauses: Vec<Predicate> },
    Or { clauses: Vec<Predicate> },
    Not { clause: Box<Predicate> },
}

impl Predicate {
    pub fn matches(&self, metadata: &Metadata) -> bool {
        match self {
            Predicate::Eq { field, value } => metadata.get(field) == Some(value),
            Predicate::Ne { field, value } => metadata.get(field) != Some(value),
            Predicate::In { field, values } => {
                metadata.get(field).is_some_and(|v| values.contains(v))
            }
            Predicate::NotIn { field, values } => {
                !metadata.get(field).is_some_and(|v| values.contains(v))
            }
            Predicate::Gt { field, value } => compare(metadata, field, value, |o| o.is_gt()),
            Predicate::Gte { field, value } => compare(metadata, field, value, |o| o.is_ge()),
            Predicate::Lt { field, value } => compare(metadata, field, value, |o| o.is_lt()),
            Predicate::Lte { field, value } => compare(metadata, field, value, |o| o.is_le()),
            Predicate::Contains { field, value } => {
                metadata.get(field).is_some_and(|actual| actual.contains(value))
            }
            Predicate::StartsWith { field, value } => {
                metadata.get(field).is_some_and(|actual| actual.starts_with(value))
            }
            Predicate::EndsWith { field, value } => {
                metadata.get(field).is_some_and(|actual| actual.ends_with(value))
            }
            Predicate::And { clauses } => clauses.iter().all(|c| c.matches(metadata)),
            Predicate::Or { clauses } => clauses.iter().any(|c| c.matches(metadata)),
            Predicate::Not { clause } => !clause.matches(metadata),
        }
    }
}

fn compare(
    metadata: &Metadata,
    field: &str,
    value: &MetaValue,
    accept: impl Fn(std::cmp::Ordering) -> bool,
) -> bool {
    metadata
        .get(field)
        .and_then(|actual| actual.partial_cmp(value))
        .is_some_and(accept)
}
