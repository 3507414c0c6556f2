//! # costx-core: Plan Cost Reconstruction
//!
//! This crate independently re-derives the cost PostgreSQL's planner assigns to
//! each node of an already produced execution plan and sets it beside the
//! engine's own figure. It never searches for or compares alternative plans; it
//! scores one fixed plan, for diagnosis and for learning the cost model.
//!
//! ## Module Overview
//!
//! - **`stats`**: Relation, index and cost-constant records.
//! - **`catalog`**: `Catalog` trait and the immutable `StatisticsSnapshot`.
//! - **`plan`**: The plan tree as parsed from `EXPLAIN (FORMAT JSON)`.
//! - **`cost`**: `CostModel` trait and the per-operator PostgreSQL formulas.
//! - **`analyzer`**: Bottom-up aggregation, rounding and debug validation.
//! - **`error`**: The fatal analysis errors.
//!
//! ## Example
//!
//! ```
//! use costx_core::analyzer::analyze;
//! use costx_core::catalog::StatisticsSnapshot;
//! use costx_core::plan::{NodeType, PlanNode};
//! use costx_core::stats::{CostConstants, RelationStats};
//!
//! let constants = CostConstants { cpu_tuple_cost: 0.02, ..CostConstants::default() };
//! let snapshot = StatisticsSnapshot::builder(constants)
//!     .relation("region", RelationStats::new(1, 5.0, 1))
//!     .build();
//! let plan = PlanNode::new(NodeType::SeqScan, 5.0, 10.0).with_relation("region");
//!
//! let analyzed = analyze(&plan, &snapshot, false).unwrap();
//! assert_eq!(analyzed.estimated_cost, 1.10);
//! ```

pub mod analyzer;
pub mod catalog;
pub mod cost;
pub mod error;
pub mod plan;
pub mod stats;

pub use analyzer::{analyze, AnalyzedNode, AnalyzerConfig, PlanAnalyzer};
pub use error::AnalysisError;
