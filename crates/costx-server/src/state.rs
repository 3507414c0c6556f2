//! # Application State
//!
//! This module defines the configuration parsed from the command line and the
//! shared state available to all HTTP request handlers. The state is created
//! once at server startup and shared via `Arc` across all concurrent requests.
//!
//! ## Components
//!
//! - **Statistics Snapshot**: Loaded once from the `--statistics` file (or empty
//!   when none is given) and never mutated afterwards. Requests may carry their
//!   own inline snapshot, which replaces this one for that request only.
//! - **Cost Model**: The PostgreSQL formulas. Stateless, so shared.
//! - **Server Config**: Listen address, snapshot path and the default debug flag.

use clap::Parser;
use costx_core::catalog::StatisticsSnapshot;
use costx_core::cost::{CostModel, PostgresCostModel};
use costx_postgres::catalog_rows::{load_snapshot, SnapshotError};
use std::path::PathBuf;
use std::sync::Arc;

/// costx HTTP server
#[derive(Parser, Debug, Clone)]
#[command(name = "costx-server")]
#[command(about = "Reconstructs PostgreSQL plan costs over HTTP")]
pub struct ServerConfig {
    /// Listen address (host:port)
    #[arg(long, default_value = "0.0.0.0:3000")]
    pub listen_addr: String,

    /// Statistics snapshot (JSON) to analyze plans against
    #[arg(long)]
    pub statistics: Option<PathBuf>,

    /// Validate every node against its reported cost unless a request says otherwise
    #[arg(long)]
    pub debug: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:3000".to_string(),
            statistics: None,
            debug: false,
        }
    }
}

/// Shared application state, accessible by all request handlers via Axum's State extractor.
pub struct AppState {
    /// Default statistics for requests that carry none.
    pub snapshot: Arc<StatisticsSnapshot>,
    /// The cost model used to re-derive every node's local cost.
    pub cost_model: Arc<dyn CostModel>,
    pub config: ServerConfig,
}

impl AppState {
    /// Build the state, loading the configured snapshot file if any.
    pub fn load(config: ServerConfig) -> Result<Self, SnapshotError> {
        let snapshot = match &config.statistics {
            Some(path) => load_snapshot(path)?,
            None => StatisticsSnapshot::default(),
        };
        Ok(Self::new(snapshot, config))
    }

    pub fn new(snapshot: StatisticsSnapshot, config: ServerConfig) -> Self {
        Self {
            snapshot: Arc::new(snapshot),
            cost_model: Arc::new(PostgresCostModel),
            config,
        }
    }
}
