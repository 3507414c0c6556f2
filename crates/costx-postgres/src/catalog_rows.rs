//! # Catalog Rows to Statistics Snapshot
//!
//! The analyzer reads statistics from an immutable `StatisticsSnapshot`. This
//! module builds one from the rows a session collaborator fetched from
//! `pg_class` with [`RELATION_STATISTICS_SQL`] and the planner settings fetched
//! with [`PLANNER_SETTINGS_SQL`].
//!
//! ## Tracked Relations
//!
//! `pg_class` lists every relation in the database, system catalogs included.
//! Only rows whose name prefix (the part before the first `_`) is a tracked
//! relation are kept, so `lineitem` and its index `lineitem_pkey` both pass
//! while `pg_statistic` does not. The default set is the eight TPC-H tables.
//!
//! `pg_class` also mixes heaps and indexes, and the rows carry no reliable
//! hint of which is which once filtered, so every kept row is registered as
//! both a relation and an index.
//!
//! ## Persistence
//!
//! Snapshots serialize to JSON so a server can load one at startup without a
//! database connection (`load_snapshot` / `save_snapshot`).

use costx_core::catalog::StatisticsSnapshot;
use costx_core::stats::{CostConstants, IndexStats, RelationStats};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// The eight TPC-H tables.
pub const TPCH_RELATIONS: [&str; 8] = [
    "lineitem", "orders", "customer", "partsupp", "supplier", "part", "nation", "region",
];

/// Per-relation statistics, one row per `pg_class` entry.
pub const RELATION_STATISTICS_SQL: &str = "\
SELECT relname, relpages AS pages, reltuples AS tuples, relallvisible AS visible_pages
FROM pg_class";

/// The five planner cost constants of the current session.
pub const PLANNER_SETTINGS_SQL: &str = "\
SELECT current_setting('random_page_cost')::real AS random_page_cost,
       current_setting('cpu_index_tuple_cost')::real AS cpu_index_tuple_cost,
       current_setting('cpu_operator_cost')::real AS cpu_operator_cost,
       current_setting('cpu_tuple_cost')::real AS cpu_tuple_cost,
       current_setting('seq_page_cost')::real AS seq_page_cost";

/// Re-collects statistics for the TPC-H tables. Run before fetching rows when
/// the data has changed since the last `ANALYZE`.
pub const REFRESH_STATISTICS_SQL: &str = "\
DO $$
DECLARE
    table_name TEXT;
    tables_to_analyze TEXT[] := ARRAY['lineitem', 'orders', 'customer', 'partsupp', 'supplier', 'part', 'nation', 'region'];
BEGIN
    FOREACH table_name IN ARRAY tables_to_analyze
    LOOP
        EXECUTE format('ANALYZE %I', table_name);
    END LOOP;
END $$";

/// One row of [`RELATION_STATISTICS_SQL`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogRow {
    pub relname: String,
    pub pages: i64,
    /// `-1` on PostgreSQL 14+ for a relation that was never analyzed.
    pub tuples: f64,
    pub visible_pages: i64,
}

impl CatalogRow {
    pub fn new(relname: impl Into<String>, pages: i64, tuples: f64, visible_pages: i64) -> Self {
        Self {
            relname: relname.into(),
            pages,
            tuples,
            visible_pages,
        }
    }
}

/// True when the part of `relname` before the first `_` is in `tracked`.
pub fn is_tracked(relname: &str, tracked: &[&str]) -> bool {
    let prefix = relname.split('_').next().unwrap_or(relname);
    tracked.contains(&prefix)
}

/// Build a snapshot from catalog rows, keeping only rows of `tracked` relations.
pub fn build_snapshot<I>(rows: I, constants: CostConstants, tracked: &[&str]) -> StatisticsSnapshot
where
    I: IntoIterator<Item = CatalogRow>,
{
    let mut builder = StatisticsSnapshot::builder(constants);
    let mut skipped = 0usize;
    for row in rows {
        if !is_tracked(&row.relname, tracked) {
            skipped += 1;
            continue;
        }
        builder.add_index(row.relname.clone(), IndexStats::new(row.pages));
        builder.add_relation(
            row.relname,
            RelationStats::new(row.pages, row.tuples, row.visible_pages),
        );
    }
    let snapshot = builder.build();
    debug!(
        relations = snapshot.num_relations(),
        skipped, "Built statistics snapshot from catalog rows"
    );
    snapshot
}

/// [`build_snapshot`] over the TPC-H tables.
pub fn build_tpch_snapshot<I>(rows: I, constants: CostConstants) -> StatisticsSnapshot
where
    I: IntoIterator<Item = CatalogRow>,
{
    build_snapshot(rows, constants, &TPCH_RELATIONS)
}

/// Parse a snapshot from its JSON form.
pub fn parse_snapshot(text: &str) -> Result<StatisticsSnapshot, SnapshotError> {
    Ok(serde_json::from_str(text)?)
}

/// Read a snapshot from a JSON file.
pub fn load_snapshot(path: impl AsRef<Path>) -> Result<StatisticsSnapshot, SnapshotError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    let snapshot = parse_snapshot(&text)?;
    info!(
        path = %path.display(),
        relations = snapshot.num_relations(),
        indexes = snapshot.num_indexes(),
        "Loaded statistics snapshot"
    );
    Ok(snapshot)
}

/// Write a snapshot to a JSON file, replacing any existing file.
pub fn save_snapshot(snapshot: &StatisticsSnapshot, path: impl AsRef<Path>) -> Result<(), SnapshotError> {
    let text = serde_json::to_string_pretty(snapshot)?;
    std::fs::write(path.as_ref(), text)?;
    Ok(())
}

/// Errors from reading or writing a snapshot file.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid snapshot JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use costx_core::catalog::Catalog;

    fn rows() -> Vec<CatalogRow> {
        vec![
            CatalogRow::new("lineitem", 112_600, 6_001_215.0, 112_000),
            CatalogRow::new("lineitem_pkey", 16_500, 6_001_215.0, 0),
            CatalogRow::new("region", 1, 5.0, 1),
            CatalogRow::new("pg_statistic", 20, 400.0, 20),
            CatalogRow::new("partsupplier_idx", 3, 10.0, 0),
        ]
    }

    #[test]
    fn test_prefix_filter() {
        assert!(is_tracked("lineitem", &TPCH_RELATIONS));
        assert!(is_tracked("orders_pkey", &TPCH_RELATIONS));
        assert!(is_tracked("part", &TPCH_RELATIONS));
        assert!(!is_tracked("partsupplier_idx", &TPCH_RELATIONS));
        assert!(!is_tracked("pg_class", &TPCH_RELATIONS));
        assert!(!is_tracked("", &TPCH_RELATIONS));
    }

    #[test]
    fn test_rows_are_registered_as_relation_and_index() {
        let snapshot = build_tpch_snapshot(rows(), CostConstants::default());
        assert_eq!(snapshot.num_relations(), 3);
        assert_eq!(snapshot.num_indexes(), 3);

        let pkey = snapshot.index("lineitem_pkey").unwrap();
        assert_eq!(pkey.pages, 16_500);
        let heap = snapshot.relation("lineitem").unwrap();
        assert_eq!(heap.visible_pages, 112_000);
        assert_eq!(snapshot.index("lineitem").map(|i| i.pages), Some(112_600));
        assert!(snapshot.relation("pg_statistic").is_none());
    }

    #[test]
    fn test_custom_tracked_set() {
        let snapshot = build_snapshot(rows(), CostConstants::default(), &["pg"]);
        assert_eq!(snapshot.relation_names().collect::<Vec<_>>(), vec!["pg_statistic"]);
    }

    #[test]
    fn test_catalog_rows_deserialize_from_query_columns() {
        let row: CatalogRow = serde_json::from_str(
            r#"{"relname": "nation", "pages": 1, "tuples": 25, "visible_pages": 0}"#,
        )
        .unwrap();
        assert_eq!(row, CatalogRow::new("nation", 1, 25.0, 0));
    }

    #[test]
    fn test_snapshot_file_roundtrip() {
        let constants = CostConstants {
            random_page_cost: 1.1,
            ..CostConstants::default()
        };
        let snapshot = build_tpch_snapshot(rows(), constants);
        let path = std::env::temp_dir().join(format!("costx-snapshot-{}.json", std::process::id()));

        save_snapshot(&snapshot, &path).unwrap();
        let loaded = load_snapshot(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(loaded, snapshot);
        assert_eq!(loaded.constants().random_page_cost, 1.1);
    }

    #[test]
    fn test_load_errors() {
        let missing = std::env::temp_dir().join("costx-no-such-snapshot.json");
        assert!(matches!(load_snapshot(&missing), Err(SnapshotError::Io(_))));
        assert!(matches!(parse_snapshot("{\"relations\": 3}"), Err(SnapshotError::Json(_))));
    }
}
