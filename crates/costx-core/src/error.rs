//! Errors that abort a plan analysis.
//!
//! Only two conditions are fatal: statistics the cost model needs are missing
//! from the snapshot, or debug validation finds an estimate too far from the
//! engine's figure. Unmodeled operators and unexpected plan shapes are handled
//! inside the cost model and never surface here.

use crate::analyzer::AnalyzedNode;
use crate::plan::NodeType;
use std::fmt;

/// Which statistics namespace a lookup missed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatisticsKind {
    Relation,
    Index,
}

impl fmt::Display for StatisticsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatisticsKind::Relation => f.write_str("relation"),
            StatisticsKind::Index => f.write_str("index"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AnalysisError {
    /// The snapshot has no record for a relation or index the plan references.
    #[error("no statistics for {kind} \"{name}\" (needed by {node_type})")]
    MissingStatistics {
        kind: StatisticsKind,
        name: String,
        node_type: NodeType,
    },
    /// Debug validation: the relative error exceeds the node's tolerance.
    ///
    /// `node` is the offending node as annotated, explanation and subtree included.
    #[error(
        "estimated cost ({estimated}) of {} differs from reported cost ({reported}) by more than {}%",
        describe(.node),
        percent(.tolerance)
    )]
    CostDiscrepancy {
        node: Box<AnalyzedNode>,
        estimated: f64,
        reported: f64,
        tolerance: f64,
    },
}

pub type Result<T> = std::result::Result<T, AnalysisError>;

fn describe(node: &AnalyzedNode) -> String {
    match &node.relation_name {
        Some(relation) => format!("{} on {relation}", node.node_type),
        None => node.node_type.to_string(),
    }
}

fn percent(fraction: &f64) -> f64 {
    (fraction * 100.0).round()
}
