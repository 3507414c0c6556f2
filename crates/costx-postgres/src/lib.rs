//! # PostgreSQL Interchange Layer
//!
//! This crate moves data between PostgreSQL's own formats and the cost
//! reconstruction core in `costx-core`. It never opens a database connection:
//! callers run the exported SQL themselves and hand over the resulting rows and
//! documents.
//!
//! ```text
//! EXPLAIN (FORMAT JSON) output ──> consumer::parse_explain ──> PlanNode
//! pg_class rows + settings     ──> catalog_rows::build_snapshot ──> StatisticsSnapshot
//!                                  costx_core::analyze
//! AnalyzedNode                 ──> producer::{generate_report, render_tree}
//! ```
//!
//! ## Module Overview
//!
//! - **`consumer`**: Unwraps `EXPLAIN` JSON envelopes into a `PlanNode` tree.
//! - **`catalog_rows`**: Turns catalog rows into a `StatisticsSnapshot`, filters
//!   them to the tracked relations, and persists snapshots as JSON files.
//! - **`producer`**: Renders an analyzed tree as a JSON report or an indented
//!   text tree.

pub mod catalog_rows;
pub mod consumer;
pub mod producer;

pub use catalog_rows::{build_snapshot, load_snapshot, save_snapshot, CatalogRow, SnapshotError};
pub use consumer::{parse_explain, ExplainDocument, ExplainError};
pub use producer::{generate_report, render_tree, summarize, ReportSummary};
