//! Formulas for the parallel-query funnel nodes: Gather and Gather Merge.

use super::CostResult;
use crate::catalog::Catalog;
use crate::plan::PlanNode;

/// Fixed cost of launching parallel workers (`parallel_setup_cost`).
pub const PARALLEL_SETUP_COST: f64 = 1000.0;

/// Cost of passing one tuple from a worker to the leader (`parallel_tuple_cost`).
pub const PARALLEL_TUPLE_COST: f64 = 0.1;

/// Extra communication overhead when the leader merges sorted worker streams.
pub const MERGE_COMMUNICATION_FACTOR: f64 = 1.05;

/// Gather: setup plus per-row transfer.
pub(super) fn gather(node: &PlanNode) -> CostResult {
    let total = PARALLEL_SETUP_COST + PARALLEL_TUPLE_COST * node.plan_rows;
    CostResult::new(
        total,
        vec![
            "Formula: total_cost = parallel_setup_cost + parallel_tuple_cost * rows".to_string(),
            format!(
                "total_cost = parallel_setup_cost({PARALLEL_SETUP_COST}) + parallel_tuple_cost({PARALLEL_TUPLE_COST}) * rows({}) = {total}",
                node.plan_rows
            ),
        ],
    )
}

/// Gather Merge: a binary heap over the worker streams plus the leader itself.
///
/// ```text
/// n          = workers_launched + 1
/// comparison = 2 * cpu_operator_cost
/// startup    = comparison * n * log2(n) + parallel_setup_cost
/// run        = rows * comparison * log2(n) + cpu_operator_cost * rows
///            + parallel_tuple_cost * rows * 1.05
/// ```
pub(super) fn gather_merge(node: &PlanNode, catalog: &dyn Catalog) -> CostResult {
    let coc = catalog.constants().cpu_operator_cost;
    let rows = node.plan_rows;
    let mut explanation = vec!["Formula: total_cost = startup_cost + run_cost".to_string()];

    let workers = node.worker_count();
    let streams = (workers + 1) as f64;
    let log_n = streams.log2();
    let comparison = 2.0 * coc;
    explanation.push(format!(
        "num_workers = workers({workers}) + 1 = {streams}; log2(num_workers) = {log_n}; comparison_cost = 2 * cpu_operator_cost({coc}) = {comparison}"
    ));

    let startup = comparison * streams * log_n + PARALLEL_SETUP_COST;
    explanation.push(format!(
        "startup_cost = comparison_cost({comparison}) * num_workers({streams}) * log2(num_workers)({log_n}) + parallel_setup_cost({PARALLEL_SETUP_COST}) = {startup}"
    ));

    let run = rows * comparison * log_n
        + coc * rows
        + PARALLEL_TUPLE_COST * rows * MERGE_COMMUNICATION_FACTOR;
    explanation.push(format!(
        "run_cost = rows({rows}) * comparison_cost({comparison}) * log2(num_workers)({log_n}) + cpu_operator_cost({coc}) * rows({rows}) + parallel_tuple_cost({PARALLEL_TUPLE_COST}) * rows({rows}) * {MERGE_COMMUNICATION_FACTOR} = {run}"
    ));

    let total = startup + run;
    explanation.push(format!(
        "Therefore total_cost = startup_cost({startup}) + run_cost({run}) = {total}"
    ));
    CostResult::new(total, explanation)
}
