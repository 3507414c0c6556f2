//! Formulas for Aggregate and Limit, both of which cost their single input.

use super::CostResult;
use crate::catalog::Catalog;
use crate::plan::PlanNode;

/// Smallest fraction of the input's cost a Limit is assumed to save down to.
///
/// Scaling linearly by `limit_rows / input_rows` is accurate for scans but badly
/// underestimates inputs with heavy startup work (sorts, Gather Merge).
pub const MIN_LIMIT_REDUCTION: f64 = 0.2;

/// Aggregate: one operator call per input row, one tuple emitted per group.
///
/// Works for plain (one output row) and grouped aggregation alike, since the
/// node's own row estimate is the number of groups.
pub(super) fn aggregate(node: &PlanNode, catalog: &dyn Catalog) -> CostResult {
    let mut explanation = vec![
        "Formula: total_cost = rows_processed * cpu_operator_cost + rows_returned * cpu_tuple_cost"
            .to_string(),
    ];
    let Some(input) = node.first_child() else {
        return CostResult::structural_mismatch(
            node,
            explanation,
            "input not found: Aggregate has no input".to_string(),
        );
    };

    let c = catalog.constants();
    let processed = input.plan_rows * c.cpu_operator_cost;
    let returned = node.plan_rows * c.cpu_tuple_cost;
    let total = processed + returned;
    explanation.push(format!(
        "total_cost = rows_processed({}) * cpu_operator_cost({}) + rows_returned({}) * cpu_tuple_cost({}) = {total}",
        input.plan_rows, c.cpu_operator_cost, node.plan_rows, c.cpu_tuple_cost
    ));
    CostResult::new(total, explanation)
}

/// Limit: the input's reported cost, scaled by the fraction of rows consumed.
///
/// ```text
/// reduction = max(limit_rows / input_rows, 0.2)   if limit_rows < input_rows
///           = 1                                   otherwise
/// cost      = input.reported_cost * reduction
/// ```
///
/// The result already includes the input, so the analyzer does not add the
/// input's reported cost again for a Limit node.
pub(super) fn limit(node: &PlanNode) -> CostResult {
    let mut explanation =
        vec!["Formula: total_cost = child_cost * cost_reduction_factor".to_string()];
    let Some(input) = node.first_child() else {
        return CostResult::structural_mismatch(
            node,
            explanation,
            "input not found: Limit has no input".to_string(),
        );
    };

    let limit_rows = node.plan_rows;
    let input_rows = input.plan_rows;
    let reduction = if limit_rows < input_rows && input_rows > 0.0 {
        (limit_rows / input_rows).max(MIN_LIMIT_REDUCTION)
    } else {
        1.0
    };
    explanation.push(format!(
        "cost_reduction_factor = max(limit_rows({limit_rows}) / child_rows({input_rows}), {MIN_LIMIT_REDUCTION}) = {reduction}"
    ));

    let total = input.total_cost * reduction;
    explanation.push(format!(
        "total_cost = child_cost({}) * cost_reduction_factor({reduction}) = {total}",
        input.total_cost
    ));
    CostResult::new(total, explanation)
}
