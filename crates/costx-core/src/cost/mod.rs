//! # Cost Model
//!
//! This module reconstructs the *local* cost PostgreSQL's planner charges for a
//! single plan node: the work the operator itself does, excluding whatever its
//! inputs cost. Children are folded in afterwards by the analyzer, which adds their
//! engine-reported totals.
//!
//! ## Formula Registry
//!
//! The registry is closed: `PostgresCostModel` dispatches with an exhaustive
//! `match` over `NodeType`, so adding an operator tag without a formula is a
//! compile error rather than a silent fallthrough. Formulas are grouped by family:
//!
//! - **`scan`**: Seq Scan, Index Scan, Index Only Scan.
//! - **`join`**: Nested Loop, Merge Join, Hash Join, Hash.
//! - **`buffer`**: Materialize, Sort, Unique.
//! - **`aggregate`**: Aggregate, Limit.
//! - **`parallel`**: Gather, Gather Merge.
//!
//! Each formula returns a `CostResult`: the number plus an ordered explanation
//! that spells out every intermediate quantity, meant to be read top to bottom.
//!
//! ## Fail-Soft Policy
//!
//! - An operator without a formula (`NodeType::Other`) costs 0 and says so.
//! - A node whose shape does not match what its formula expects (e.g. a Merge
//!   Join without a `Sort` input) costs 0 and explains what was not found.
//! - Missing statistics are the one fatal case: the formula cannot be evaluated
//!   and `AnalysisError::MissingStatistics` propagates to the caller.
//!
//! ## Pluggable Design
//!
//! The `CostModel` trait lets callers swap in a different set of formulas (for
//! instance one calibrated against a specific server version) without touching
//! the analyzer.

mod aggregate;
mod buffer;
mod join;
mod parallel;
mod scan;

use crate::catalog::Catalog;
use crate::error::{AnalysisError, Result, StatisticsKind};
use crate::plan::{NodeType, PlanNode};
use crate::stats::{IndexStats, RelationStats};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// The local cost of one node and how it was derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostResult {
    pub local_cost: f64,
    /// Derivation steps, in order.
    pub explanation: Vec<String>,
}

impl CostResult {
    pub fn new(local_cost: f64, explanation: Vec<String>) -> Self {
        Self {
            local_cost,
            explanation,
        }
    }

    /// Zero-cost result for an operator with no registered formula.
    pub fn unmodeled(name: &str) -> Self {
        warn!(operator = name, "no cost formula registered; costing as 0");
        Self::new(0.0, vec![format!("unmodeled operator: {name}")])
    }

    /// Zero-cost result for a node whose inputs do not have the expected shape.
    pub(crate) fn structural_mismatch(node: &PlanNode, mut explanation: Vec<String>, reason: String) -> Self {
        warn!(node_type = %node.node_type, %reason, "unexpected plan shape; costing as 0");
        explanation.push(reason);
        explanation.push("Therefore local cost = 0".to_string());
        Self::new(0.0, explanation)
    }
}

/// Trait for pluggable cost models.
pub trait CostModel: Send + Sync {
    /// Local cost of `node`, excluding every contribution of its children.
    fn local_cost(&self, node: &PlanNode, catalog: &dyn Catalog) -> Result<CostResult>;
}

/// Cost formulas approximating PostgreSQL's `costsize.c` from the figures
/// available in `EXPLAIN` output and `pg_class`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresCostModel;

impl CostModel for PostgresCostModel {
    fn local_cost(&self, node: &PlanNode, catalog: &dyn Catalog) -> Result<CostResult> {
        match &node.node_type {
            NodeType::SeqScan => scan::seq_scan(node, catalog),
            NodeType::IndexScan => Ok(scan::index_scan(node)),
            NodeType::IndexOnlyScan => scan::index_only_scan(node, catalog),
            NodeType::Materialize => Ok(buffer::materialize(node, catalog)),
            NodeType::NestedLoop => Ok(join::nested_loop(node, catalog)),
            NodeType::MergeJoin => join::merge_join(node, catalog),
            NodeType::HashJoin => Ok(join::hash_join(node)),
            NodeType::Hash => Ok(join::hash(node, catalog)),
            NodeType::Unique => Ok(buffer::unique(node)),
            NodeType::Sort => Ok(buffer::sort(node, catalog)),
            NodeType::Aggregate => Ok(aggregate::aggregate(node, catalog)),
            NodeType::Gather => Ok(parallel::gather(node)),
            NodeType::GatherMerge => Ok(parallel::gather_merge(node, catalog)),
            NodeType::Limit => Ok(aggregate::limit(node)),
            NodeType::Other(name) => Ok(CostResult::unmodeled(name)),
        }
    }
}

fn relation_stats<'a>(
    catalog: &'a dyn Catalog,
    node: &PlanNode,
    name: &str,
) -> Result<&'a RelationStats> {
    catalog
        .relation(name)
        .ok_or_else(|| AnalysisError::MissingStatistics {
            kind: StatisticsKind::Relation,
            name: name.to_string(),
            node_type: node.node_type.clone(),
        })
}

fn index_stats<'a>(catalog: &'a dyn Catalog, node: &PlanNode, name: &str) -> Result<&'a IndexStats> {
    catalog
        .index(name)
        .ok_or_else(|| AnalysisError::MissingStatistics {
            kind: StatisticsKind::Index,
            name: name.to_string(),
            node_type: node.node_type.clone(),
        })
}
