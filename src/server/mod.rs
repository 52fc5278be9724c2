//! HTTP boundary
//!
//! Thin axum layer over [`RiskModels`] and the [`WeightResolver`]. All
//! response types serialize floats through [`crate::wire`], so a response
//! body is always valid JSON.

pub mod error;
pub mod handlers;

use anyhow::{Context, Result};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use crate::regime::WeightResolver;
use crate::risk::RiskModels;

pub use error::ApiError;

/// Shared, read-only request state
#[derive(Debug, Clone)]
pub struct AppState {
    pub models: Arc<RiskModels>,
    pub weights: Arc<WeightResolver>,
}

impl AppState {
    pub fn new(models: RiskModels, weights: WeightResolver) -> Self {
        Self {
            models: Arc::new(models),
            weights: Arc::new(weights),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/risk/analysis", post(handlers::risk_analysis))
        .route("/risk/var", post(handlers::value_at_risk))
        .route("/risk/stresstest", post(handlers::stress_test))
        .route("/risk/hedging", post(handlers::hedging))
        .route("/risk/report", post(handlers::report))
        .route("/risk/scenarios", get(handlers::scenarios))
        .route("/analysis/weights", get(handlers::weight_table))
        .route("/analysis/weights/:regime", get(handlers::regime_weights))
        .route("/analysis/blend", post(handlers::blend))
        .with_state(state)
}

/// Serve until Ctrl-C
pub async fn serve(listener: TcpListener, state: AppState) -> Result<()> {
    let addr = listener.local_addr()?;
    info!("Risk engine listening on http://{}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown signal received");
            }
        })
        .await
        .context("HTTP server error")
}
