//! # costx-server: HTTP Service for Plan Cost Reconstruction
//!
//! This binary crate exposes the cost analyzer as a network service. A client
//! runs `EXPLAIN (FORMAT JSON)` against PostgreSQL, posts the result here, and
//! receives every node annotated with its reconstructed cost next to the
//! engine's own figure.
//!
//! ## Architecture
//!
//! ```text
//! Client (psql script, notebook, GUI)
//!   |
//!   | HTTP POST /analyze (EXPLAIN JSON)
//!   v
//! costx-server (this binary)
//!   |
//!   +-> EXPLAIN consumer (unwrap the envelope into a plan tree)
//!   +-> Plan analyzer (bottom-up cost reconstruction)
//!   +-> Report producer (JSON tree, text tree, summary)
//!   |
//!   | HTTP response
//!   v
//! Client
//! ```
//!
//! ## Endpoints
//!
//! - `GET  /health`      - Health check
//! - `GET  /operators`   - Operators with a cost formula
//! - `GET  /statistics`  - Summary of the loaded statistics snapshot
//! - `POST /analyze`     - Analyze an EXPLAIN document, return the annotated tree
//! - `POST /report`      - Analyze an EXPLAIN document, return a text report
//!
//! ## Configuration
//!
//! Flags are described by `ServerConfig` (`--listen-addr`, `--statistics`,
//! `--debug`). Logging is controlled by the `RUST_LOG` environment variable
//! (defaults to `costx=debug`).

mod routes;
mod state;

use axum::routing::{get, post};
use axum::Router;
use clap::Parser;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("costx=debug".parse()?))
        .init();

    let config = state::ServerConfig::parse();
    let addr = config.listen_addr.clone();
    let state = Arc::new(state::AppState::load(config)?);

    let app = Router::new()
        .route("/health", get(routes::health))
        .route("/operators", get(routes::list_operators))
        .route("/statistics", get(routes::statistics))
        .route("/analyze", post(routes::analyze_plan))
        .route("/report", post(routes::report_plan))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("costx-server listening on http://{addr}");
    axum::serve(listener, app).await?;
    Ok(())
}
