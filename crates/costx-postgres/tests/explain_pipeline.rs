//! From raw `EXPLAIN (FORMAT JSON)` text and catalog rows to a rendered report.

use costx_core::analyze;
use costx_core::plan::NodeType;
use costx_core::stats::CostConstants;
use costx_postgres::catalog_rows::build_tpch_snapshot;
use costx_postgres::{parse_explain, render_tree, summarize, CatalogRow};

/// `SELECT * FROM nation CROSS JOIN region` as PostgreSQL 16 explains it.
const CROSS_JOIN: &str = r#"[
  {
    "Plan": {
      "Node Type": "Nested Loop",
      "Parallel Aware": false,
      "Async Capable": false,
      "Join Type": "Inner",
      "Startup Cost": 0.00,
      "Total Cost": 3.71,
      "Plan Rows": 125,
      "Plan Width": 248,
      "Plans": [
        {
          "Node Type": "Seq Scan",
          "Parent Relationship": "Outer",
          "Parallel Aware": false,
          "Async Capable": false,
          "Relation Name": "nation",
          "Alias": "nation",
          "Startup Cost": 0.00,
          "Total Cost": 1.25,
          "Plan Rows": 25,
          "Plan Width": 124
        },
        {
          "Node Type": "Materialize",
          "Parent Relationship": "Inner",
          "Parallel Aware": false,
          "Async Capable": false,
          "Startup Cost": 0.00,
          "Total Cost": 1.07,
          "Plan Rows": 5,
          "Plan Width": 124,
          "Plans": [
            {
              "Node Type": "Seq Scan",
              "Parent Relationship": "Outer",
              "Parallel Aware": false,
              "Async Capable": false,
              "Relation Name": "region",
              "Alias": "region",
              "Startup Cost": 0.00,
              "Total Cost": 1.05,
              "Plan Rows": 5,
              "Plan Width": 124
            }
          ]
        }
      ]
    },
    "Planning Time": 0.112
  }
]"#;

fn catalog_rows() -> Vec<CatalogRow> {
    vec![
        CatalogRow::new("nation", 1, 25.0, 1),
        CatalogRow::new("nation_pkey", 2, 25.0, 0),
        CatalogRow::new("region", 1, 5.0, 1),
        CatalogRow::new("region_pkey", 2, 5.0, 0),
        CatalogRow::new("pg_type", 15, 613.0, 15),
    ]
}

#[test]
fn test_cross_join_pipeline() {
    let document = parse_explain(CROSS_JOIN).unwrap();
    assert_eq!(document.planning_time, Some(0.112));
    assert_eq!(document.execution_time, None);

    let snapshot = build_tpch_snapshot(catalog_rows(), CostConstants::default());
    let analyzed = analyze(&document.plan, &snapshot, false).unwrap();

    // Nested Loop: 125 * 0.01 + 1.25 + 1.07
    assert_eq!(analyzed.node_type, NodeType::NestedLoop);
    assert_eq!(analyzed.estimated_cost, 3.57);
    // Materialize: 2 * 0.0025 * 5 + 1.05, stored as 1.07499999...
    assert_eq!(analyzed.children[1].estimated_cost, 1.07);
    // Seq Scans: 1 * 1.0 + rows * 0.01
    assert_eq!(analyzed.children[0].estimated_cost, 1.25);
    assert_eq!(analyzed.children[1].children[0].estimated_cost, 1.05);

    // Every node is within its debug tolerance.
    assert!(analyze(&document.plan, &snapshot, true).is_ok());

    let text = render_tree(&analyzed);
    assert_eq!(text.lines().count(), 4);
    assert!(text.starts_with("Nested Loop  estimated=3.57  reported=3.71"));
    assert!(text.contains("\n    Seq Scan on region  estimated=1.05  reported=1.05"));

    let summary = summarize(&analyzed);
    assert_eq!(summary.node_count, 4);
    assert!(summary.unmodeled.is_empty());
}

#[test]
fn test_untracked_relation_is_missing_statistics() {
    let document = parse_explain(
        r#"[{"Plan": {"Node Type": "Seq Scan", "Relation Name": "pg_type",
                      "Total Cost": 21.13, "Plan Rows": 613, "Plan Width": 8}}]"#,
    )
    .unwrap();
    let snapshot = build_tpch_snapshot(catalog_rows(), CostConstants::default());

    let err = analyze(&document.plan, &snapshot, false).unwrap_err();
    assert_eq!(
        err.to_string(),
        "no statistics for relation \"pg_type\" (needed by Seq Scan)"
    );
}
