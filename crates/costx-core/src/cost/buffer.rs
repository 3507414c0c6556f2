//! Formulas for operators that buffer their input: Materialize, Sort, Unique.

use super::CostResult;
use crate::catalog::Catalog;
use crate::plan::PlanNode;

/// Materialize: write each row into the tuplestore and read it back.
pub(super) fn materialize(node: &PlanNode, catalog: &dyn Catalog) -> CostResult {
    let coc = catalog.constants().cpu_operator_cost;
    let total = 2.0 * coc * node.plan_rows;
    CostResult::new(
        total,
        vec![
            "Formula: total_cost = 2 * cpu_operator_cost * rows".to_string(),
            format!(
                "total_cost = 2 * cpu_operator_cost({coc}) * rows({}) = {total}",
                node.plan_rows
            ),
        ],
    )
}

/// Sort: `n log2 n` comparisons (two operator calls each) plus writing the
/// output, with `rows / width` standing in for the number of output pages.
pub(super) fn sort(node: &PlanNode, catalog: &dyn Catalog) -> CostResult {
    let c = catalog.constants();
    let rows = node.plan_rows;
    let mut explanation = vec![
        "Formula: total_cost = 2 * cpu_operator_cost * rows * log2(rows) + seq_page_cost * (rows / width)"
            .to_string(),
    ];

    // log2 of fewer than two rows is not a comparison count.
    let comparison_cost = if rows > 1.0 {
        2.0 * c.cpu_operator_cost * rows * rows.log2()
    } else {
        0.0
    };
    explanation.push(format!(
        "comparison_cost = 2 * cpu_operator_cost({}) * rows({rows}) * log2(rows) = {comparison_cost}",
        c.cpu_operator_cost
    ));

    let pages = if node.plan_width > 0 {
        rows / node.plan_width as f64
    } else {
        0.0
    };
    let io_cost = c.seq_page_cost * pages;
    explanation.push(format!(
        "io_cost = seq_page_cost({}) * pages(rows({rows}) / width({})) = {io_cost}",
        c.seq_page_cost, node.plan_width
    ));

    let total = comparison_cost + io_cost;
    explanation.push(format!(
        "Therefore total_cost = comparison_cost({comparison_cost}) + io_cost({io_cost}) = {total}"
    ));
    CostResult::new(total, explanation)
}

/// Unique: charges the node's own reported total.
///
/// The analyzer then adds the child's reported total on top, so the input is
/// counted twice relative to the engine's figure.
pub(super) fn unique(node: &PlanNode) -> CostResult {
    CostResult::new(
        node.total_cost,
        vec![
            "Formula: total_cost = reported_total_cost".to_string(),
            format!("total_cost = reported_total_cost({})", node.total_cost),
        ],
    )
}
