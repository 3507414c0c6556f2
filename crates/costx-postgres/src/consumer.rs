//! # EXPLAIN Consumer (Deserialization)
//!
//! This module converts the output of `EXPLAIN (FORMAT JSON)` into the core's
//! `PlanNode` tree. PostgreSQL wraps the plan in an envelope:
//!
//! ```text
//! [
//!   {
//!     "Plan": { "Node Type": "Seq Scan", ... , "Plans": [ ... ] },
//!     "Planning Time": 0.081,
//!     "Execution Time": 12.3
//!   }
//! ]
//! ```
//!
//! Client libraries often strip or add a layer (a driver returning the single
//! row of the result set wraps it in one more array), so the consumer accepts:
//!
//! - the full envelope `[{"Plan": ...}]`, nested in any number of
//!   single-element arrays,
//! - one envelope object `{"Plan": ...}`,
//! - a bare plan node `{"Node Type": ...}`.
//!
//! Timing fields are only present with `EXPLAIN ANALYZE` and are kept when found.
//!
//! ## Error Handling
//!
//! Malformed input is rejected with `ExplainError`; an empty array or `null` is
//! `ExplainError::EmptyPlan`. Unknown operator tags are *not* an error here: they
//! parse as `NodeType::Other` and the analyzer costs them as 0.

use costx_core::plan::PlanNode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// One parsed `EXPLAIN` result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplainDocument {
    #[serde(rename = "Plan")]
    pub plan: PlanNode,
    /// Milliseconds spent planning.
    #[serde(rename = "Planning Time", default, skip_serializing_if = "Option::is_none")]
    pub planning_time: Option<f64>,
    /// Milliseconds spent executing (`EXPLAIN ANALYZE` only).
    #[serde(rename = "Execution Time", default, skip_serializing_if = "Option::is_none")]
    pub execution_time: Option<f64>,
}

impl ExplainDocument {
    pub fn new(plan: PlanNode) -> Self {
        Self {
            plan,
            planning_time: None,
            execution_time: None,
        }
    }
}

/// Parse `EXPLAIN (FORMAT JSON)` text.
pub fn parse_explain(text: &str) -> Result<ExplainDocument, ExplainError> {
    let value: Value = serde_json::from_str(text)?;
    consume_value(value)
}

/// Convert an already decoded JSON value.
pub fn consume_value(value: Value) -> Result<ExplainDocument, ExplainError> {
    let document = match unwrap_arrays(value)? {
        Value::Object(map) if map.contains_key("Plan") => {
            serde_json::from_value::<ExplainDocument>(Value::Object(map))?
        }
        Value::Object(map) if map.contains_key("Node Type") => {
            ExplainDocument::new(serde_json::from_value(Value::Object(map))?)
        }
        Value::Object(_) => return Err(ExplainError::MissingPlan),
        Value::Null => return Err(ExplainError::EmptyPlan),
        other => return Err(ExplainError::UnexpectedShape(json_kind(&other))),
    };

    debug!(
        root = %document.plan.node_type,
        nodes = document.plan.node_count(),
        planning_time = document.planning_time,
        execution_time = document.execution_time,
        "Consumed EXPLAIN document"
    );
    Ok(document)
}

/// Strip enclosing arrays down to the first element.
///
/// A result set with more than one statement's plan keeps only the first.
fn unwrap_arrays(mut value: Value) -> Result<Value, ExplainError> {
    while let Value::Array(items) = value {
        value = items.into_iter().next().ok_or(ExplainError::EmptyPlan)?;
    }
    Ok(value)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Errors that can occur while consuming an `EXPLAIN` document.
#[derive(Debug, thiserror::Error)]
pub enum ExplainError {
    /// The document holds no plan at all (`[]` or `null`).
    #[error("empty EXPLAIN document: no plan")]
    EmptyPlan,
    /// An object that is neither an envelope nor a plan node.
    #[error("EXPLAIN object has neither a \"Plan\" nor a \"Node Type\" key")]
    MissingPlan,
    /// A JSON scalar where a plan was expected.
    #[error("expected an EXPLAIN object or array, found {0}")]
    UnexpectedShape(&'static str),
    /// Invalid JSON, or a plan node missing a required field.
    #[error("invalid EXPLAIN JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use costx_core::plan::NodeType;
    use serde_json::json;

    fn scan() -> Value {
        json!({
            "Node Type": "Seq Scan",
            "Relation Name": "region",
            "Plan Rows": 5,
            "Plan Width": 124,
            "Startup Cost": 0.0,
            "Total Cost": 1.05
        })
    }

    #[test]
    fn test_full_envelope_with_timings() {
        let text = json!([{ "Plan": scan(), "Planning Time": 0.08, "Execution Time": 0.02 }]).to_string();
        let document = parse_explain(&text).unwrap();
        assert_eq!(document.plan.node_type, NodeType::SeqScan);
        assert_eq!(document.plan.relation_name.as_deref(), Some("region"));
        assert_eq!(document.plan.plan_width, 124);
        assert_eq!(document.planning_time, Some(0.08));
        assert_eq!(document.execution_time, Some(0.02));
    }

    #[test]
    fn test_driver_row_wrapping() {
        let document = consume_value(json!([[{ "Plan": scan() }]])).unwrap();
        assert_eq!(document.plan.total_cost, 1.05);
        assert_eq!(document.planning_time, None);
    }

    #[test]
    fn test_bare_plan_node() {
        let document = consume_value(scan()).unwrap();
        assert_eq!(document, ExplainDocument::new(serde_json::from_value(scan()).unwrap()));
    }

    #[test]
    fn test_unknown_operator_parses_as_other() {
        let document = consume_value(json!({
            "Plan": { "Node Type": "CTE Scan", "Total Cost": 3.0, "Plan Rows": 1 }
        }))
        .unwrap();
        assert_eq!(document.plan.node_type, NodeType::Other("CTE Scan".into()));
    }

    #[test]
    fn test_empty_documents() {
        assert!(matches!(parse_explain("[]"), Err(ExplainError::EmptyPlan)));
        assert!(matches!(parse_explain("[[]]"), Err(ExplainError::EmptyPlan)));
        assert!(matches!(parse_explain("null"), Err(ExplainError::EmptyPlan)));
    }

    #[test]
    fn test_malformed_documents() {
        assert!(matches!(parse_explain("{\"QUERY PLAN\": 1}"), Err(ExplainError::MissingPlan)));
        assert!(matches!(parse_explain("42"), Err(ExplainError::UnexpectedShape("number"))));
        assert!(matches!(parse_explain("[{\"Plan\""), Err(ExplainError::Json(_))));
        // "Total Cost" is required.
        let err = consume_value(json!({ "Node Type": "Seq Scan" })).unwrap_err();
        assert!(err.to_string().contains("Total Cost"));
    }
}
