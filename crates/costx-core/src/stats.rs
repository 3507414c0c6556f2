//! # Planner Statistics
//!
//! This module defines the statistics records the cost model reads. They mirror
//! what PostgreSQL itself consults when costing a plan:
//!
//! - **Relation-level**: `relpages` (heap pages), `reltuples` (estimated live
//!   tuples) and `relallvisible` (pages marked all-visible in the visibility map).
//! - **Index-level**: the number of pages of the index relation.
//! - **Cost constants**: the five planner settings (`seq_page_cost`,
//!   `random_page_cost`, `cpu_tuple_cost`, `cpu_index_tuple_cost`,
//!   `cpu_operator_cost`) that weight I/O against CPU work.
//!
//! ## Units
//!
//! Page counts are integers exactly as stored in `pg_class`; tuple counts are
//! reals because `reltuples` is itself an estimate. All costs are expressed in
//! the planner's arbitrary cost units, where one sequential page fetch is 1.0
//! with the default settings.

use serde::{Deserialize, Serialize};

/// Statistics for a heap relation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RelationStats {
    /// Number of heap pages (`relpages`).
    pub pages: i64,
    /// Number of pages that are all-visible (`relallvisible`). Index-only scans
    /// skip the heap fetch for tuples on these pages.
    pub visible_pages: i64,
    /// Estimated number of live tuples (`reltuples`).
    pub tuples: f64,
}

impl RelationStats {
    pub fn new(pages: i64, tuples: f64, visible_pages: i64) -> Self {
        Self {
            pages,
            visible_pages,
            tuples,
        }
    }

    /// Fraction of heap pages that are all-visible, in `[0, 1]`.
    ///
    /// A relation with no pages has nothing left to fetch from the heap, so it is
    /// reported as fully visible.
    pub fn visible_fraction(&self) -> f64 {
        if self.pages <= 0 {
            return 1.0;
        }
        (self.visible_pages as f64 / self.pages as f64).clamp(0.0, 1.0)
    }
}

/// Statistics for an index relation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndexStats {
    /// Number of index pages.
    pub pages: i64,
}

impl IndexStats {
    pub fn new(pages: i64) -> Self {
        Self { pages }
    }
}

/// The planner cost constants in effect for the session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostConstants {
    /// Cost of a non-sequentially fetched page.
    pub random_page_cost: f64,
    /// Cost of processing one index entry.
    pub cpu_index_tuple_cost: f64,
    /// Cost of evaluating one operator or function.
    pub cpu_operator_cost: f64,
    /// Cost of processing one tuple.
    pub cpu_tuple_cost: f64,
    /// Cost of a sequentially fetched page.
    pub seq_page_cost: f64,
}

/// PostgreSQL's shipped defaults.
impl Default for CostConstants {
    fn default() -> Self {
        Self {
            random_page_cost: 4.0,
            cpu_index_tuple_cost: 0.005,
            cpu_operator_cost: 0.0025,
            cpu_tuple_cost: 0.01,
            seq_page_cost: 1.0,
        }
    }
}
