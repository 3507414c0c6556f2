//! # Plan Analyzer
//!
//! This module walks an execution plan bottom-up and annotates every node with a
//! reconstructed cost, producing a separate `AnalyzedNode` tree. The input
//! `PlanNode` tree is only borrowed and never modified.
//!
//! ## Aggregation
//!
//! For each node, children are analyzed first (post-order), then the cost model
//! supplies the node's local cost and the estimate is assembled as:
//!
//! ```text
//! estimate = local_cost + sum(child.reported_total_cost)   (every operator but Limit)
//! estimate = local_cost                                    (Limit)
//! ```
//!
//! The sum uses the children's *engine-reported* totals, not their reconstructed
//! estimates, so a modeling error in one subtree never leaks into its ancestors.
//! Limit is the exception because its formula already scales the input's reported
//! cost. The estimate is clamped at zero and rounded to two decimals.
//!
//! ## Debug Validation
//!
//! With `AnalyzerConfig::debug` set, each finalized estimate is compared against
//! the node's reported total. A relative error above the tolerance (20% for
//! Nested Loop, 10% for everything else) aborts the analysis with
//! `AnalysisError::CostDiscrepancy`.
//!
//! ## Termination
//!
//! The walk either annotates every node, or stops at the first
//! `MissingStatistics` / `CostDiscrepancy`. Recursion depth is bounded by the
//! depth of the plan.

use crate::catalog::Catalog;
use crate::cost::{CostModel, PostgresCostModel};
use crate::error::{AnalysisError, Result};
use crate::plan::{NodeType, PlanNode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, trace};

/// Default relative tolerance used by debug validation.
pub const DEFAULT_TOLERANCE: f64 = 0.1;

/// Nested Loop tolerance: its formula ignores the rescan cost of the inner input.
pub const NESTED_LOOP_TOLERANCE: f64 = 0.2;

/// Analyzer settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Fail on the first node whose estimate strays beyond tolerance.
    pub debug: bool,
}

/// A plan node annotated with its reconstructed cost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzedNode {
    pub node_type: NodeType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relation_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_name: Option<String>,
    /// The engine's figure, copied from the input node.
    pub reported_total_cost: f64,
    /// The cost model's local contribution, before children are added.
    pub local_cost: f64,
    /// Final estimate: non-negative, rounded to two decimals.
    pub estimated_cost: f64,
    pub explanation: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<AnalyzedNode>,
}

impl AnalyzedNode {
    /// `|estimated - reported| / reported`, or `None` when the engine reported 0.
    pub fn relative_error(&self) -> Option<f64> {
        if self.reported_total_cost == 0.0 {
            return None;
        }
        Some((self.estimated_cost - self.reported_total_cost).abs() / self.reported_total_cost)
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(AnalyzedNode::node_count).sum::<usize>()
    }

    /// Pre-order iterator over the subtree.
    pub fn iter(&self) -> impl Iterator<Item = &AnalyzedNode> {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let node = stack.pop()?;
            stack.extend(node.children.iter().rev());
            Some(node)
        })
    }
}

/// Tolerance applied to a node type in debug mode.
pub fn tolerance_for(node_type: &NodeType) -> f64 {
    match node_type {
        NodeType::NestedLoop => NESTED_LOOP_TOLERANCE,
        _ => DEFAULT_TOLERANCE,
    }
}

/// Round to two decimal places.
///
/// Rounds the exact binary value rather than `cost * 100`, whose own rounding
/// can lift a value just below a half (1.07499...) onto it.
pub fn round_cost(cost: f64) -> f64 {
    format!("{cost:.2}").parse().unwrap_or(cost)
}

/// Analyze `plan` against `catalog` with the default PostgreSQL cost model.
pub fn analyze(plan: &PlanNode, catalog: &dyn Catalog, debug: bool) -> Result<AnalyzedNode> {
    run(&PostgresCostModel, catalog, &AnalyzerConfig { debug }, plan)
}

/// Reusable analyzer bound to a cost model and a statistics snapshot.
///
/// Both are held behind `Arc` so one analyzer (or many clones of it) can serve
/// concurrent requests against the same read-only snapshot.
#[derive(Clone)]
pub struct PlanAnalyzer {
    pub cost_model: Arc<dyn CostModel>,
    pub catalog: Arc<dyn Catalog>,
    pub config: AnalyzerConfig,
}

impl PlanAnalyzer {
    pub fn new(cost_model: Arc<dyn CostModel>, catalog: Arc<dyn Catalog>, config: AnalyzerConfig) -> Self {
        Self {
            cost_model,
            catalog,
            config,
        }
    }

    /// Analyzer using `PostgresCostModel`.
    pub fn with_catalog(catalog: Arc<dyn Catalog>, config: AnalyzerConfig) -> Self {
        Self::new(Arc::new(PostgresCostModel), catalog, config)
    }

    pub fn analyze(&self, plan: &PlanNode) -> Result<AnalyzedNode> {
        run(self.cost_model.as_ref(), self.catalog.as_ref(), &self.config, plan)
    }
}

/// Entry point shared by `analyze` and `PlanAnalyzer::analyze`.
fn run(
    cost_model: &dyn CostModel,
    catalog: &dyn Catalog,
    config: &AnalyzerConfig,
    plan: &PlanNode,
) -> Result<AnalyzedNode> {
    debug!(
        root = %plan.node_type,
        nodes = plan.node_count(),
        debug = config.debug,
        "Starting plan analysis"
    );
    let analyzed = analyze_node(cost_model, catalog, config, plan)?;
    debug!(
        root = %analyzed.node_type,
        estimated = analyzed.estimated_cost,
        reported = analyzed.reported_total_cost,
        "Plan analysis complete"
    );
    Ok(analyzed)
}

fn analyze_node(
    cost_model: &dyn CostModel,
    catalog: &dyn Catalog,
    config: &AnalyzerConfig,
    node: &PlanNode,
) -> Result<AnalyzedNode> {
    // Step 1: Children first. The first fatal error anywhere below stops the walk.
    let children = node
        .children
        .iter()
        .map(|child| analyze_node(cost_model, catalog, config, child))
        .collect::<Result<Vec<_>>>()?;

    // Step 2: The operator's own work, from its formula.
    let cost = cost_model.local_cost(node, catalog)?;

    // Step 3: Fold in the children's reported totals. Limit's formula already
    // scales its input's reported cost, so nothing is added for it.
    let raw = match node.node_type {
        NodeType::Limit => cost.local_cost,
        _ => cost.local_cost + node.children_reported_cost(),
    };
    let estimated_cost = round_cost(raw.max(0.0));
    trace!(
        node_type = %node.node_type,
        local = cost.local_cost,
        estimated = estimated_cost,
        reported = node.total_cost,
        "Costed node"
    );

    let analyzed = AnalyzedNode {
        node_type: node.node_type.clone(),
        relation_name: node.relation_name.clone(),
        index_name: node.index_name.clone(),
        reported_total_cost: node.total_cost,
        local_cost: cost.local_cost,
        estimated_cost,
        explanation: cost.explanation,
        children,
    };

    // Step 4: In debug mode, stop at the first estimate beyond tolerance.
    if config.debug {
        validate(&analyzed)?;
    }
    Ok(analyzed)
}

/// Debug check of a finalized node against the engine's figure.
///
/// A reported cost of 0 admits only an estimate of 0.
fn validate(node: &AnalyzedNode) -> Result<()> {
    let tolerance = tolerance_for(&node.node_type);
    let within = match node.relative_error() {
        Some(err) => err <= tolerance,
        None => node.estimated_cost == 0.0,
    };
    if within {
        return Ok(());
    }

    error!(
        node_type = %node.node_type,
        relation = node.relation_name.as_deref().unwrap_or("-"),
        estimated = node.estimated_cost,
        reported = node.reported_total_cost,
        "Estimated cost differs from reported cost beyond tolerance"
    );
    Err(AnalysisError::CostDiscrepancy {
        node: Box::new(node.clone()),
        estimated: node.estimated_cost,
        reported: node.reported_total_cost,
        tolerance,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::StatisticsSnapshot;
    use crate::stats::{CostConstants, RelationStats};

    fn catalog() -> StatisticsSnapshot {
        StatisticsSnapshot::builder(CostConstants::default())
            .relation("orders", RelationStats::new(100, 1000.0, 100))
            .build()
    }

    /// Nested Loop reporting 100 whose inputs report 10 + 90. Index Scans pass
    /// their reported cost through, so in debug mode only the root can diverge;
    /// its local output cost is `rows * 0.01`.
    fn nested_loop(rows: f64) -> PlanNode {
        PlanNode::new(NodeType::NestedLoop, rows, 100.0)
            .with_child(PlanNode::new(NodeType::IndexScan, 1.0, 10.0).with_relation("orders"))
            .with_child(PlanNode::new(NodeType::IndexScan, 1.0, 90.0).with_relation("orders"))
    }

    #[test]
    fn test_round_cost() {
        assert_eq!(round_cost(1.104999), 1.1);
        assert_eq!(round_cost(1005.0), 1005.0);
        assert_eq!(round_cost(1.126), 1.13);
        assert_eq!(round_cost(0.0), 0.0);
    }

    #[test]
    fn test_round_cost_uses_exact_binary_value() {
        // Both are stored just below the half: 1.07499999999999995559...
        assert_eq!(round_cost(1.075), 1.07);
        assert_eq!(round_cost(2.0 * 0.0025 * 5.0 + 1.05), 1.07);
        // 1.00499999999999989...
        assert_eq!(round_cost(1.005), 1.0);
    }

    #[test]
    fn test_debug_rejects_nested_loop_beyond_twenty_percent() {
        let err = analyze(&nested_loop(2500.0), &catalog(), true).unwrap_err();
        match err {
            AnalysisError::CostDiscrepancy {
                node,
                estimated,
                reported,
                tolerance,
            } => {
                assert_eq!(node.node_type, NodeType::NestedLoop);
                assert_eq!(node.children.len(), 2);
                assert_eq!(node.local_cost, 25.0);
                assert_eq!(estimated, 125.0);
                assert_eq!(reported, 100.0);
                assert_eq!(tolerance, NESTED_LOOP_TOLERANCE);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_debug_accepts_nested_loop_within_twenty_percent() {
        let analyzed = analyze(&nested_loop(1500.0), &catalog(), true).unwrap();
        assert_eq!(analyzed.estimated_cost, 115.0);
        assert_eq!(analyzed.relative_error().map(round_cost), Some(0.15));
    }

    #[test]
    fn test_same_error_passes_with_default_tolerance_only_for_nested_loop() {
        let node = AnalyzedNode {
            node_type: NodeType::HashJoin,
            relation_name: None,
            index_name: None,
            reported_total_cost: 100.0,
            local_cost: 115.0,
            estimated_cost: 115.0,
            explanation: vec![],
            children: vec![],
        };
        assert!(validate(&node).is_err());
        assert!(validate(&AnalyzedNode {
            node_type: NodeType::NestedLoop,
            ..node
        })
        .is_ok());
    }

    #[test]
    fn test_zero_reported_cost() {
        let mut node = AnalyzedNode {
            node_type: NodeType::Hash,
            relation_name: None,
            index_name: None,
            reported_total_cost: 0.0,
            local_cost: 0.0,
            estimated_cost: 0.0,
            explanation: vec![],
            children: vec![],
        };
        assert_eq!(node.relative_error(), None);
        assert!(validate(&node).is_ok());
        node.estimated_cost = 0.01;
        assert!(validate(&node).is_err());
    }

    #[test]
    fn test_limit_does_not_add_child_cost() {
        let plan = PlanNode::new(NodeType::Limit, 50.0, 210.0)
            .with_child(PlanNode::new(NodeType::SeqScan, 1000.0, 1000.0).with_relation("orders"));
        let analyzed = analyze(&plan, &catalog(), false).unwrap();
        assert_eq!(analyzed.estimated_cost, 200.0);
        assert_eq!(analyzed.local_cost, 200.0);
    }

    #[test]
    fn test_free_function_matches_plan_analyzer() {
        let analyzer = PlanAnalyzer::with_catalog(Arc::new(catalog()), AnalyzerConfig { debug: true });
        let plan = nested_loop(1500.0);
        assert_eq!(analyzer.analyze(&plan), analyze(&plan, &catalog(), true));
    }

    #[test]
    fn test_input_tree_is_left_untouched() {
        let plan = nested_loop(1500.0);
        let before = plan.clone();
        let _ = analyze(&plan, &catalog(), false).unwrap();
        assert_eq!(plan, before);
    }

    #[test]
    fn test_iter_is_preorder() {
        let plan = PlanNode::new(NodeType::HashJoin, 1.0, 1.0)
            .with_child(PlanNode::new(NodeType::SeqScan, 1.0, 1.0).with_relation("orders"))
            .with_child(
                PlanNode::new(NodeType::Hash, 1.0, 1.0)
                    .with_child(PlanNode::new(NodeType::SeqScan, 1.0, 1.0).with_relation("orders")),
            );
        let analyzed = analyze(&plan, &catalog(), false).unwrap();
        let order: Vec<_> = analyzed.iter().map(|n| n.node_type.clone()).collect();
        assert_eq!(
            order,
            vec![NodeType::HashJoin, NodeType::SeqScan, NodeType::Hash, NodeType::SeqScan]
        );
        assert_eq!(analyzed.node_count(), 4);
    }
}
