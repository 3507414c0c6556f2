//! # Catalog Interface
//!
//! The catalog gives the cost model read access to planner statistics: per-relation
//! page and tuple counts, per-index page counts, and the session's cost constants.
//!
//! ## Trait Design
//!
//! The `Catalog` trait is deliberately small and object safe (`dyn Catalog`) so the
//! analyzer does not care where statistics came from. Lookups return `Option`: an
//! unknown relation or index is reported as absent and the cost model turns that
//! into `AnalysisError::MissingStatistics`. Nothing here ever fabricates an empty
//! record for a name it has not seen.
//!
//! ## Snapshot Lifecycle
//!
//! `StatisticsSnapshot` is the standard implementation. It is assembled once per
//! session through `SnapshotBuilder` and is immutable afterwards: there is no
//! `&mut` method on the snapshot itself. Because it is plain owned data it is
//! `Send + Sync` and can be shared across concurrent analyses behind an `Arc`.

use crate::stats::{CostConstants, IndexStats, RelationStats};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Read-only access to planner statistics.
pub trait Catalog: Send + Sync {
    fn relation(&self, name: &str) -> Option<&RelationStats>;
    fn index(&self, name: &str) -> Option<&IndexStats>;
    fn constants(&self) -> &CostConstants;
}

/// Immutable, session-scoped statistics snapshot.
///
/// Relations and indexes are keyed by their unqualified `pg_class.relname`.
/// `BTreeMap` keeps serialized snapshots stable across runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatisticsSnapshot {
    relations: BTreeMap<String, RelationStats>,
    indexes: BTreeMap<String, IndexStats>,
    constants: CostConstants,
}

impl StatisticsSnapshot {
    pub fn builder(constants: CostConstants) -> SnapshotBuilder {
        SnapshotBuilder {
            snapshot: StatisticsSnapshot {
                relations: BTreeMap::new(),
                indexes: BTreeMap::new(),
                constants,
            },
        }
    }

    pub fn relation_names(&self) -> impl Iterator<Item = &str> {
        self.relations.keys().map(String::as_str)
    }

    pub fn index_names(&self) -> impl Iterator<Item = &str> {
        self.indexes.keys().map(String::as_str)
    }

    pub fn num_relations(&self) -> usize {
        self.relations.len()
    }

    pub fn num_indexes(&self) -> usize {
        self.indexes.len()
    }
}

impl Catalog for StatisticsSnapshot {
    fn relation(&self, name: &str) -> Option<&RelationStats> {
        self.relations.get(name)
    }

    fn index(&self, name: &str) -> Option<&IndexStats> {
        self.indexes.get(name)
    }

    fn constants(&self) -> &CostConstants {
        &self.constants
    }
}

/// Accumulates statistics before freezing them into a `StatisticsSnapshot`.
///
/// Registering the same name twice keeps the last record, matching how a later
/// row of a catalog query overrides an earlier one.
#[derive(Debug, Clone)]
pub struct SnapshotBuilder {
    snapshot: StatisticsSnapshot,
}

impl SnapshotBuilder {
    pub fn relation(mut self, name: impl Into<String>, stats: RelationStats) -> Self {
        self.snapshot.relations.insert(name.into(), stats);
        self
    }

    pub fn index(mut self, name: impl Into<String>, stats: IndexStats) -> Self {
        self.snapshot.indexes.insert(name.into(), stats);
        self
    }

    pub fn add_relation(&mut self, name: impl Into<String>, stats: RelationStats) {
        self.snapshot.relations.insert(name.into(), stats);
    }

    pub fn add_index(&mut self, name: impl Into<String>, stats: IndexStats) {
        self.snapshot.indexes.insert(name.into(), stats);
    }

    pub fn build(self) -> StatisticsSnapshot {
        self.snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_names_are_absent() {
        let snapshot = StatisticsSnapshot::builder(CostConstants::default())
            .relation("region", RelationStats::new(1, 5.0, 1))
            .index("region_pkey", IndexStats::new(2))
            .build();

        assert!(snapshot.relation("region").is_some());
        assert!(snapshot.relation("nation").is_none());
        assert!(snapshot.index("region_pkey").is_some());
        // Relations and indexes live in separate namespaces.
        assert!(snapshot.index("region").is_none());
    }

    #[test]
    fn test_last_registration_wins() {
        let snapshot = StatisticsSnapshot::builder(CostConstants::default())
            .relation("orders", RelationStats::new(10, 100.0, 0))
            .relation("orders", RelationStats::new(20, 200.0, 5))
            .build();

        assert_eq!(snapshot.num_relations(), 1);
        assert_eq!(snapshot.relation("orders").map(|r| r.pages), Some(20));
    }
}
