//! Closed, bit-stable enumerations (§6 "Closed enumerations").
//!
//! Integer codes are fixed at first release: reordering variants would
//! silently corrupt persisted HNSW snapshots and change-log records, so
//! each enum's `as_code`/`from_code` pair is the bit-stable contract, not
//! the derive order.

use serde::{Deserialize, Serialize};

/// Closed enumeration of noun types (31 tags per §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum NounType {
    Person,
    Organization,
    Location,
    Document,
    Concept,
    Project,
    Event,
    Thing,
    File,
    Service,
    Interface,
    Measurement,
    Process,
    Task,
    Meeting,
    Message,
    Email,
    Comment,
    Review,
    Product,
    Category,
    Tag,
    Skill,
    Role,
    Team,
    Department,
    Contract,
    Invoice,
    Transaction,
    Asset,
    Other,
}

impl NounType {
    /// Bit-stable integer code, persisted in HNSW snapshots and the change log.
    pub fn as_code(self) -> u8 {
        self as u8
    }

    /// Inverse of [`NounType::as_code`].
    pub fn from_code(code: u8) -> Option<Self> {
        use NounType::*;
        const ALL: &[NounType] = &[
            Person, Organization, Location, Document, Concept, Project, Event, Thing, File,
            Service, Interface, Measurement, Process, Task, Meeting, Message, Email, Comment,
            Review, Product, Category, Tag, Skill, Role, Team, Department, Contract, Invoice,
            Transaction, Asset, Other,
        ];
        ALL.get(code as usize).copied()
    }
}

/// Closed enumeration of verb types, mirroring [`NounType`]'s fixed-code
/// discipline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum VerbType {
    RelatedTo,
    PartOf,
    Contains,
    OwnedBy,
    CreatedBy,
    ModifiedBy,
    AssignedTo,
    ReportsTo,
    WorksOn,
    DependsOn,
    References,
    Mentions,
    FollowedBy,
    PrecededBy,
    SimilarTo,
    OppositeOf,
    CausedBy,
    Enables,
    Blocks,
    Other,
}

impl VerbType {
    /// Bit-stable integer code.
    pub fn as_code(self) -> u8 {
        self as u8
    }

    /// Inverse of [`VerbType::as_code`].
    pub fn from_code(code: u8) -> Option<Self> {
        use VerbType::*;
        const ALL: &[VerbType] = &[
            RelatedTo, PartOf, Contains, OwnedBy, CreatedBy, ModifiedBy, AssignedTo, ReportsTo,
            WorksOn, DependsOn, References, Mentions, FollowedBy, PrecededBy, SimilarTo,
            OppositeOf, CausedBy, Enables, Blocks, Other,
        ];
        ALL.get(code as usize).copied()
    }
}

/// Distance function used by the HNSW index (§4.1, bit-stable codes per §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DistanceMetric {
    #[default]
    Cosine = 0,
    Euclidean = 1,
    Manhattan = 2,
    Dot = 3,
}

impl DistanceMetric {
    /// Bit-stable integer code.
    pub fn as_code(self) -> u8 {
        self as u8
    }

    /// Inverse of [`DistanceMetric::as_code`].
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Cosine),
            1 => Some(Self::Euclidean),
            2 => Some(Self::Manhattan),
            3 => Some(Self::Dot),
            _ => None,
        }
    }
}

/// Node/instance role (§6 "Instance roles").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InstanceRole {
    #[default]
    Writer = 0,
    Reader = 1,
    Hybrid = 2,
}

/// Read consistency level (§4.9, bit-stable codes per §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConsistencyLevel {
    #[default]
    Eventual = 0,
    Strong = 1,
    Bounded = 2,
}

/// Operational mode gating the public boundary (§4.7, §7 `ModeViolation`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OperationalMode {
    #[default]
    Hybrid,
    ReadOnly,
    WriteOnly,
    Frozen,
}

impl OperationalMode {
    /// Whether a mutating operation is permitted in this mode.
    pub fn allows_write(self) -> bool {
        matches!(self, Self::Hybrid | Self::WriteOnly)
    }

    /// Whether a search operation is permitted in this mode.
    ///
    /// Write-only mode still allows direct-id lookups when the caller opts
    /// in via `allowDirectReads` — that exception is handled by the planner,
    /// not here.
    pub fn allows_search(self) -> bool {
        matches!(self, Self::Hybrid | Self::ReadOnly)
    }

    /// Frozen mode refuses all mutating side effects including stats and
    /// index optimisations.
    pub fn is_frozen(self) -> bool {
        matches!(self, Self::Frozen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noun_type_code_round_trips() {
        for code in 0..31u8 {
            let ty = NounType::from_code(code).expect("code in range");
            assert_eq!(ty.as_code(), code);
        }
        assert!(NounType::from_code(31).is_none());
    }

    #[test]
    fn verb_type_code_round_trips() {
        for code in 0..20u8 {
            let ty = VerbType::from_code(code).expect("code in range");
            assert_eq!(ty.as_code(), code);
        }
    }

    #[test]
    fn distance_metric_code_round_trips() {
        for code in 0..4u8 {
            let m = DistanceMetric::from_code(code).expect("code in range");
            assert_eq!(m.as_code(), code);
        }
        assert!(DistanceMetric::from_code(4).is_none());
    }

    #[test]
    fn operational_mode_gates() {
        assert!(OperationalMode::Hybrid.allows_write());
        assert!(OperationalMode::Hybrid.allows_search());
        assert!(!OperationalMode::ReadOnly.allows_write());
        assert!(!OperationalMode::WriteOnly.allows_search());
        assert!(!OperationalMode::Frozen.allows_write());
        assert!(!OperationalMode::Frozen.allows_search());
        assert!(OperationalMode::Frozen.is_frozen());
    }
}
