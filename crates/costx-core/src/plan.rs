//! # Plan Tree
//!
//! This module defines the in-memory form of a plan produced by PostgreSQL's
//! `EXPLAIN (FORMAT JSON)`. The tree is consumed read-only by the analyzer; every
//! node carries the engine's own figures (`Total Cost`, `Plan Rows`, ...) which
//! the cost model treats as ground truth.
//!
//! ## Operator Tags
//!
//! `NodeType` is a closed enum of the operators the cost model knows about, plus
//! `Other(name)` for everything else (e.g. `Bitmap Heap Scan`, `Append`). Tags
//! round-trip through their EXPLAIN spelling, so an unmodeled operator keeps its
//! exact name all the way into the report.
//!
//! ## JSON Shape
//!
//! `PlanNode` deserializes directly from an EXPLAIN node object. Keys the analyzer
//! does not use (`Actual Rows`, `Filter`, `Output`, ...) are ignored. Only
//! `Node Type` and `Total Cost` are mandatory; the other metrics default to zero
//! so that hand-written fixtures can stay short.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Operator tag of a plan node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NodeType {
    SeqScan,
    IndexScan,
    IndexOnlyScan,
    Materialize,
    NestedLoop,
    MergeJoin,
    HashJoin,
    Hash,
    Unique,
    Sort,
    Aggregate,
    Gather,
    GatherMerge,
    Limit,
    /// Any operator without a registered cost formula.
    Other(String),
}

impl NodeType {
    /// Every operator with a registered formula, in EXPLAIN spelling order.
    pub const MODELED: [NodeType; 14] = [
        NodeType::SeqScan,
        NodeType::IndexScan,
        NodeType::IndexOnlyScan,
        NodeType::Materialize,
        NodeType::NestedLoop,
        NodeType::MergeJoin,
        NodeType::HashJoin,
        NodeType::Hash,
        NodeType::Unique,
        NodeType::Sort,
        NodeType::Aggregate,
        NodeType::Gather,
        NodeType::GatherMerge,
        NodeType::Limit,
    ];

    /// The tag as EXPLAIN prints it.
    pub fn as_str(&self) -> &str {
        match self {
            NodeType::SeqScan => "Seq Scan",
            NodeType::IndexScan => "Index Scan",
            NodeType::IndexOnlyScan => "Index Only Scan",
            NodeType::Materialize => "Materialize",
            NodeType::NestedLoop => "Nested Loop",
            NodeType::MergeJoin => "Merge Join",
            NodeType::HashJoin => "Hash Join",
            NodeType::Hash => "Hash",
            NodeType::Unique => "Unique",
            NodeType::Sort => "Sort",
            NodeType::Aggregate => "Aggregate",
            NodeType::Gather => "Gather",
            NodeType::GatherMerge => "Gather Merge",
            NodeType::Limit => "Limit",
            NodeType::Other(name) => name,
        }
    }

    pub fn is_modeled(&self) -> bool {
        !matches!(self, NodeType::Other(_))
    }
}

impl From<&str> for NodeType {
    fn from(tag: &str) -> Self {
        match tag {
            "Seq Scan" => NodeType::SeqScan,
            "Index Scan" => NodeType::IndexScan,
            "Index Only Scan" => NodeType::IndexOnlyScan,
            "Materialize" => NodeType::Materialize,
            "Nested Loop" => NodeType::NestedLoop,
            "Merge Join" => NodeType::MergeJoin,
            "Hash Join" => NodeType::HashJoin,
            "Hash" => NodeType::Hash,
            "Unique" => NodeType::Unique,
            "Sort" => NodeType::Sort,
            "Aggregate" => NodeType::Aggregate,
            "Gather" => NodeType::Gather,
            "Gather Merge" => NodeType::GatherMerge,
            "Limit" => NodeType::Limit,
            other => NodeType::Other(other.to_string()),
        }
    }
}

impl From<String> for NodeType {
    fn from(tag: String) -> Self {
        NodeType::from(tag.as_str())
    }
}

impl From<NodeType> for String {
    fn from(tag: NodeType) -> Self {
        match tag {
            NodeType::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Workers assumed for a parallel node whose EXPLAIN output names none.
pub const DEFAULT_WORKERS: i64 = 1;

/// One operator of an execution plan, with the engine-reported metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanNode {
    #[serde(rename = "Node Type")]
    pub node_type: NodeType,
    #[serde(rename = "Relation Name", default, skip_serializing_if = "Option::is_none")]
    pub relation_name: Option<String>,
    #[serde(rename = "Index Name", default, skip_serializing_if = "Option::is_none")]
    pub index_name: Option<String>,
    #[serde(rename = "Plan Rows", default)]
    pub plan_rows: f64,
    #[serde(rename = "Plan Width", default)]
    pub plan_width: i64,
    #[serde(rename = "Startup Cost", default)]
    pub startup_cost: f64,
    #[serde(rename = "Total Cost")]
    pub total_cost: f64,
    /// Only present under `EXPLAIN ANALYZE`.
    #[serde(rename = "Workers Launched", default, skip_serializing_if = "Option::is_none")]
    pub workers_launched: Option<i64>,
    #[serde(rename = "Workers Planned", default, skip_serializing_if = "Option::is_none")]
    pub workers_planned: Option<i64>,
    #[serde(rename = "Plans", default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<PlanNode>,
}

impl PlanNode {
    pub fn new(node_type: impl Into<NodeType>, plan_rows: f64, total_cost: f64) -> Self {
        Self {
            node_type: node_type.into(),
            relation_name: None,
            index_name: None,
            plan_rows,
            plan_width: 0,
            startup_cost: 0.0,
            total_cost,
            workers_launched: None,
            workers_planned: None,
            children: Vec::new(),
        }
    }

    pub fn with_relation(mut self, name: impl Into<String>) -> Self {
        self.relation_name = Some(name.into());
        self
    }

    pub fn with_index(mut self, name: impl Into<String>) -> Self {
        self.index_name = Some(name.into());
        self
    }

    pub fn with_width(mut self, width: i64) -> Self {
        self.plan_width = width;
        self
    }

    pub fn with_startup_cost(mut self, cost: f64) -> Self {
        self.startup_cost = cost;
        self
    }

    pub fn with_workers(mut self, workers: i64) -> Self {
        self.workers_launched = Some(workers);
        self
    }

    pub fn with_planned_workers(mut self, workers: i64) -> Self {
        self.workers_planned = Some(workers);
        self
    }

    /// Launched workers, else planned workers, else one.
    pub fn worker_count(&self) -> i64 {
        self.workers_launched
            .or(self.workers_planned)
            .unwrap_or(DEFAULT_WORKERS)
            .max(0)
    }

    pub fn with_child(mut self, child: PlanNode) -> Self {
        self.children.push(child);
        self
    }

    /// First child carrying the given tag, regardless of its position.
    pub fn child_of_type(&self, node_type: &NodeType) -> Option<&PlanNode> {
        self.children.iter().find(|c| &c.node_type == node_type)
    }

    pub fn first_child(&self) -> Option<&PlanNode> {
        self.children.first()
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(PlanNode::node_count).sum::<usize>()
    }

    /// Sum of the engine-reported total costs of the direct children.
    pub fn children_reported_cost(&self) -> f64 {
        self.children.iter().map(|c| c.total_cost).sum()
    }
}
