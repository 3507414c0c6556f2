//! Join formulas: Nested Loop, Merge Join, Hash Join and the Hash build node.
//!
//! Inputs are always located by operator tag, never by position: EXPLAIN lists
//! the outer input first, but the formulas here care about *what* an input is
//! (the materialized side, the sorted side), not where it sits.

use super::{relation_stats, CostResult};
use crate::catalog::Catalog;
use crate::error::Result;
use crate::plan::{NodeType, PlanNode};
use ordered_float::OrderedFloat;

/// Per-tuple cost of re-reading an already materialized inner input.
pub const MATERIALIZED_RESCAN_COST: f64 = 0.0125;

/// Working memory assumed when estimating how many batches a hash build spills into.
pub const HASH_WORK_MEM: f64 = 4000.0;

/// Nested Loop: charges `rows * cpu_tuple_cost` for the joined output.
///
/// The explanation also derives the cost of rescanning the materialized inner
/// input once per outer row, but that figure is *not* part of the returned local
/// cost; the inputs are accounted for through their reported totals.
pub(super) fn nested_loop(node: &PlanNode, catalog: &dyn Catalog) -> CostResult {
    let c = catalog.constants();
    let mut explanation = vec![
        "Formula: total_cost = materialize_cost + scan_cost + output_rows_cost".to_string(),
    ];

    let materialize = node.child_of_type(&NodeType::Materialize);
    let scan = node
        .children
        .iter()
        .find(|child| child.node_type != NodeType::Materialize);

    let inputs_cost = match (materialize, scan) {
        (Some(materialize), Some(scan)) => {
            let rescan = (scan.plan_rows - 1.0) * MATERIALIZED_RESCAN_COST;
            explanation.push(format!(
                "consecutive_materialize_access_cost = (scan_rows({}) - 1) * materialized_rescan_cost({MATERIALIZED_RESCAN_COST}) = {rescan}",
                scan.plan_rows
            ));
            let materialize_cost = materialize.total_cost + rescan;
            explanation.push(format!(
                "materialize_cost = initial_materialize_cost({}) + consecutive_materialize_access_cost({rescan}) = {materialize_cost}",
                materialize.total_cost
            ));
            explanation.push(format!("scan_cost = {} ({})", scan.total_cost, scan.node_type));
            Some(materialize_cost + scan.total_cost)
        }
        _ => {
            explanation.push(
                "materialize/scan inputs not found; input costs come from the children's reported totals"
                    .to_string(),
            );
            None
        }
    };

    let output_cost = node.plan_rows * c.cpu_tuple_cost;
    explanation.push(format!(
        "output_rows_cost = output_rows({}) * cpu_tuple_cost({}) = {output_cost}",
        node.plan_rows, c.cpu_tuple_cost
    ));
    if let Some(inputs_cost) = inputs_cost {
        explanation.push(format!(
            "total_cost = materialize_cost + scan_cost + output_rows_cost = {}",
            inputs_cost + output_cost
        ));
    }
    explanation.push(format!("local cost = output_rows_cost = {output_cost}"));

    CostResult::new(output_cost, explanation)
}

/// Merge Join: both inputs costed as full sequential scans plus an `n ln n` sort.
///
/// ```text
/// left_cost  = pages_l * seq_page_cost + tuples_l * cpu_tuple_cost
/// right_cost = pages_r * seq_page_cost + tuples_r * cpu_tuple_cost
/// sort_cost  = (tuples_l + tuples_r) * ln(tuples_l + tuples_r) * cpu_operator_cost
/// ```
///
/// The left relation is the one under the `Sort` input; the right relation is the
/// other input's own relation.
pub(super) fn merge_join(node: &PlanNode, catalog: &dyn Catalog) -> Result<CostResult> {
    let explanation = vec!["Formula: total_cost = left_cost + right_cost + sort_cost".to_string()];

    let sort_position = node
        .children
        .iter()
        .position(|child| child.node_type == NodeType::Sort);
    let left = sort_position
        .and_then(|i| node.children[i].first_child())
        .and_then(|input| input.relation_name.as_deref());
    let right = node
        .children
        .iter()
        .enumerate()
        .find(|(i, _)| Some(*i) != sort_position)
        .and_then(|(_, child)| child.relation_name.as_deref());

    let (left, right) = match (left, right) {
        (Some(left), Some(right)) => (left, right),
        (None, _) => {
            return Ok(CostResult::structural_mismatch(
                node,
                explanation,
                "left relation not found: no relation under a Sort input".to_string(),
            ))
        }
        (_, None) => {
            return Ok(CostResult::structural_mismatch(
                node,
                explanation,
                "right relation not found: the non-Sort input carries no relation name".to_string(),
            ))
        }
    };

    let left_stats = relation_stats(catalog, node, left)?;
    let right_stats = relation_stats(catalog, node, right)?;
    let c = catalog.constants();
    let mut explanation = explanation;

    let side_cost = |pages: i64, tuples: f64| pages as f64 * c.seq_page_cost + tuples * c.cpu_tuple_cost;
    let left_cost = side_cost(left_stats.pages, left_stats.tuples);
    let right_cost = side_cost(right_stats.pages, right_stats.tuples);
    explanation.push(format!(
        "left_cost ({left}) = pages({}) * seq_page_cost({}) + tuples({}) * cpu_tuple_cost({}) = {left_cost}",
        left_stats.pages, c.seq_page_cost, left_stats.tuples, c.cpu_tuple_cost
    ));
    explanation.push(format!(
        "right_cost ({right}) = pages({}) * seq_page_cost({}) + tuples({}) * cpu_tuple_cost({}) = {right_cost}",
        right_stats.pages, c.seq_page_cost, right_stats.tuples, c.cpu_tuple_cost
    ));

    let merged = left_stats.tuples + right_stats.tuples;
    let sort_cost = if merged > 1.0 {
        merged * merged.ln() * c.cpu_operator_cost
    } else {
        0.0
    };
    explanation.push(format!(
        "sort_cost = tuples({merged}) * ln(tuples({merged})) * cpu_operator_cost({}) = {sort_cost}",
        c.cpu_operator_cost
    ));

    let total = left_cost + right_cost + sort_cost;
    explanation.push(format!(
        "Therefore total_cost = left_cost({left_cost}) + right_cost({right_cost}) + sort_cost({sort_cost}) = {total}"
    ));
    Ok(CostResult::new(total, explanation))
}

/// Hash Join: every input contributes its build cost; the most expensive probe
/// (scaled by how many `work_mem` batches its build side needs) is added once.
///
/// For each input: `build` is the input itself, `probe` is its own first input
/// when it has one, else the build node again.
///
/// ```text
/// build_cost      = build.reported_cost
/// probe_hash_cost = probe.reported_cost * (build.rows * build.width / work_mem)
/// cost            = sum(build_cost) + max(probe_hash_cost)
/// ```
pub(super) fn hash_join(node: &PlanNode) -> CostResult {
    let mut explanation =
        vec!["Formula: total_cost = sum(build_cost) + max(probe_hash_cost)".to_string()];

    if node.children.is_empty() {
        return CostResult::structural_mismatch(
            node,
            explanation,
            "build/probe inputs not found: Hash Join has no inputs".to_string(),
        );
    }

    let mut build_total = 0.0;
    let mut max_probe: Option<OrderedFloat<f64>> = None;
    for build in &node.children {
        let probe = build.first_child().unwrap_or(build);
        build_total += build.total_cost;

        let batches = build.plan_rows * build.plan_width as f64 / HASH_WORK_MEM;
        let probe_hash_cost = probe.total_cost * batches;
        explanation.push(format!(
            "build({}) cost = {}; probe_hash_cost = probe_cost({}) * (rows({}) * width({}) / work_mem({HASH_WORK_MEM})) = {probe_hash_cost}",
            build.node_type, build.total_cost, probe.total_cost, build.plan_rows, build.plan_width
        ));
        max_probe = max_probe.max(Some(OrderedFloat(probe_hash_cost)));
    }

    let max_probe = max_probe.map(|c| c.0).unwrap_or(0.0);
    let total = build_total + max_probe;
    explanation.push(format!(
        "Therefore total_cost = build_costs({build_total}) + max_probe_hash_cost({max_probe}) = {total}"
    ));
    CostResult::new(total, explanation)
}

/// Hash: one operator evaluation per row to hash it into the table.
pub(super) fn hash(node: &PlanNode, catalog: &dyn Catalog) -> CostResult {
    let coc = catalog.constants().cpu_operator_cost;
    let total = coc * node.plan_rows;
    CostResult::new(
        total,
        vec![
            "Formula: total_cost = cpu_operator_cost * rows".to_string(),
            format!("total_cost = cpu_operator_cost({coc}) * rows({}) = {total}", node.plan_rows),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::test_support::{assert_close, snapshot};

    fn nested_loop_plan() -> PlanNode {
        // Materialize listed first on purpose: identification is by tag.
        PlanNode::new(NodeType::NestedLoop, 2000.0, 300.0)
            .with_child(
                PlanNode::new(NodeType::Materialize, 20.0, 1.2)
                    .with_child(PlanNode::new(NodeType::SeqScan, 20.0, 1.1).with_relation("customer")),
            )
            .with_child(PlanNode::new(NodeType::SeqScan, 100.0, 3.0).with_relation("orders"))
    }

    #[test]
    fn test_nested_loop_returns_only_output_cost() {
        let result = nested_loop(&nested_loop_plan(), &snapshot());
        // 2000 * 0.01
        assert_close(result.local_cost, 20.0);

        // materialize = 1.2 + 99 * 0.0125 = 2.4375; + scan 3.0 + output 20 = 25.4375
        assert!(result
            .explanation
            .iter()
            .any(|l| l.starts_with("materialize_cost") && l.ends_with("= 2.4375")));
        assert!(result
            .explanation
            .iter()
            .any(|l| l.starts_with("total_cost") && l.ends_with("= 25.4375")));
    }

    #[test]
    fn test_nested_loop_without_materialize_keeps_output_cost() {
        let node = PlanNode::new(NodeType::NestedLoop, 50.0, 40.0)
            .with_child(PlanNode::new(NodeType::SeqScan, 5.0, 1.0).with_relation("customer"))
            .with_child(PlanNode::new(NodeType::IndexScan, 1.0, 8.0).with_relation("orders"));
        let result = nested_loop(&node, &snapshot());
        assert_close(result.local_cost, 0.5);
        assert!(result.explanation.iter().any(|l| l.contains("not found")));
    }

    #[test]
    fn test_merge_join_uses_full_relation_statistics() {
        // Sort input wraps customer (left); orders is the other input (right).
        let node = PlanNode::new(NodeType::MergeJoin, 15_000.0, 5000.0)
            .with_child(PlanNode::new(NodeType::SeqScan, 15_000.0, 350.0).with_relation("orders"))
            .with_child(
                PlanNode::new(NodeType::Sort, 1_500.0, 120.0)
                    .with_child(PlanNode::new(NodeType::SeqScan, 1_500.0, 115.0).with_relation("customer")),
            );
        let result = merge_join(&node, &snapshot()).unwrap();

        let left = 100.0 + 1_500.0 * 0.01;
        let right = 200.0 + 15_000.0 * 0.01;
        let sort = 16_500.0 * 16_500.0_f64.ln() * 0.0025;
        assert_close(result.local_cost, left + right + sort);
        assert!(result.explanation[1].contains("(customer)"));
        assert!(result.explanation[2].contains("(orders)"));
    }

    #[test]
    fn test_merge_join_without_sort_input_recovers() {
        let node = PlanNode::new(NodeType::MergeJoin, 10.0, 50.0)
            .with_child(PlanNode::new(NodeType::IndexScan, 10.0, 20.0).with_relation("orders"))
            .with_child(PlanNode::new(NodeType::IndexScan, 10.0, 20.0).with_relation("customer"));
        let result = merge_join(&node, &snapshot()).unwrap();
        assert_eq!(result.local_cost, 0.0);
        assert!(result.explanation.iter().any(|l| l.contains("not found")));
    }

    #[test]
    fn test_hash_join_accumulates_every_input() {
        // Outer scan: build=scan (no inputs) so probe=scan.
        // Hash input: build=hash, probe=its scan.
        let node = PlanNode::new(NodeType::HashJoin, 25.0, 2.7)
            .with_child(PlanNode::new(NodeType::SeqScan, 25.0, 1.25).with_relation("orders").with_width(100))
            .with_child(
                PlanNode::new(NodeType::Hash, 5.0, 1.05)
                    .with_width(40)
                    .with_child(PlanNode::new(NodeType::SeqScan, 5.0, 1.05).with_relation("customer")),
            );
        let result = hash_join(&node);

        // builds: 1.25 + 1.05 = 2.3
        // probes: 1.25 * (25*100/4000) = 0.78125 ; 1.05 * (5*40/4000) = 0.0525
        assert_close(result.local_cost, 2.3 + 0.78125);
        assert_eq!(result.explanation.len(), 4);
    }

    #[test]
    fn test_hash_cost_per_row() {
        let node = PlanNode::new(NodeType::Hash, 400.0, 10.0);
        assert_close(hash(&node, &snapshot()).local_cost, 1.0);
    }
}
