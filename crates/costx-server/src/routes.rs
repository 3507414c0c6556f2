//! # HTTP Route Handlers
//!
//! This module defines the Axum route handlers for the analysis service.
//!
//! ## Analysis Pipeline
//!
//! The core flow (`run_analysis`) is shared between `/analyze` and `/report`:
//!
//! 1. **Consume**: Unwrap the EXPLAIN JSON into a `PlanNode` tree.
//! 2. **Configure**: Pick the request's inline snapshot or the server's loaded
//!    one, and the request's debug flag or the server default.
//! 3. **Analyze**: Run the bottom-up cost reconstruction.
//!
//! ## Error Handling
//!
//! Errors are returned as HTTP status codes with descriptive messages:
//! - 400 Bad Request: malformed EXPLAIN document
//! - 422 Unprocessable Entity: the plan references a relation or index with no statistics
//! - 409 Conflict: debug validation found an estimate beyond tolerance
//! - 500 Internal Server Error: report encoding failure

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use costx_core::analyzer::{AnalyzedNode, AnalyzerConfig, PlanAnalyzer};
use costx_core::catalog::{Catalog, StatisticsSnapshot};
use costx_core::plan::NodeType;
use costx_core::stats::CostConstants;
use costx_core::AnalysisError;
use costx_postgres::consumer::consume_value;
use costx_postgres::producer::{generate_report, render_tree, summarize, ReportSummary};

use crate::state::AppState;

/// GET /health
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

/// GET /operators: Operators with a cost formula; anything else costs 0.
pub async fn list_operators() -> impl IntoResponse {
    let operators = NodeType::MODELED
        .iter()
        .map(|node_type| node_type.as_str().to_string())
        .collect();
    Json(OperatorsResponse { operators })
}

#[derive(Serialize)]
pub struct OperatorsResponse {
    pub operators: Vec<String>,
}

/// GET /statistics: What the server-wide snapshot holds.
pub async fn statistics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(StatisticsResponse {
        relations: state.snapshot.relation_names().map(str::to_string).collect(),
        num_indexes: state.snapshot.num_indexes(),
        constants: *state.snapshot.constants(),
    })
}

#[derive(Serialize)]
pub struct StatisticsResponse {
    pub relations: Vec<String>,
    pub num_indexes: usize,
    pub constants: CostConstants,
}

/// Request body shared by `/analyze` and `/report`.
#[derive(Deserialize)]
pub struct AnalyzeRequest {
    /// EXPLAIN (FORMAT JSON) output, in any envelope the consumer accepts.
    pub plan: serde_json::Value,
    /// Statistics to use instead of the server's snapshot.
    #[serde(default)]
    pub statistics: Option<StatisticsSnapshot>,
    /// Overrides the server's `--debug` default.
    #[serde(default)]
    pub debug: Option<bool>,
}

#[derive(Serialize)]
pub struct AnalyzeResponse {
    pub summary: ReportSummary,
    pub analysis: AnalyzedNode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub planning_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_time: Option<f64>,
}

/// POST /analyze: Annotate every node with its reconstructed cost.
pub async fn analyze_plan(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    Ok(Json(run_analysis(&state, req)?))
}

/// POST /report: Text tree followed by the full JSON report.
pub async fn report_plan(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let response = run_analysis(&state, req)?;
    let json = generate_report(&response.analysis)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Encode error: {}", e)))?;
    Ok(format!("{}\n{}\n", render_tree(&response.analysis), json))
}

/// Core analysis logic shared between the endpoints.
fn run_analysis(state: &AppState, req: AnalyzeRequest) -> Result<AnalyzeResponse, (StatusCode, String)> {
    // Step 1: Unwrap the EXPLAIN envelope into a plan tree.
    let document = consume_value(req.plan)
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("Failed to consume plan: {}", e)))?;

    // Step 2: An inline snapshot replaces the server's for this request only.
    let catalog: Arc<dyn Catalog> = match req.statistics {
        Some(snapshot) => Arc::new(snapshot),
        None => Arc::clone(&state.snapshot) as Arc<dyn Catalog>,
    };
    let config = AnalyzerConfig {
        debug: req.debug.unwrap_or(state.config.debug),
    };
    let analyzer = PlanAnalyzer::new(state.cost_model.clone(), catalog, config);

    // Step 3: Reconstruct every node's cost. Missing statistics and debug
    // discrepancies abort with their own status codes.
    let analysis = analyzer.analyze(&document.plan).map_err(error_response)?;

    // Step 4: Summarize for the caller.
    Ok(AnalyzeResponse {
        summary: summarize(&analysis),
        analysis,
        planning_time: document.planning_time,
        execution_time: document.execution_time,
    })
}

fn error_response(err: AnalysisError) -> (StatusCode, String) {
    let status = match err {
        AnalysisError::MissingStatistics { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        AnalysisError::CostDiscrepancy { .. } => StatusCode::CONFLICT,
    };
    (status, err.to_string())
}
