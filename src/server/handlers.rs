//! Request handlers
//!
//! Handlers validate the body, normalize positions once, call into the
//! calculators and return a fully assembled response or an [`ApiError`].

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use super::error::ApiError;
use super::AppState;
use crate::portfolio::Portfolio;
use crate::regime::{blend_for_regime, BlendedSignal, StrategyWeights, WeightTable};
use crate::risk::stress::DEFAULT_SCENARIO;
use crate::risk::var::DEFAULT_CONFIDENCE_LEVEL;
use crate::risk::{HedgingAdvice, RiskProfile, RiskReport, StressScenario, StressTestResult, VarResult};
use crate::types::RawPosition;

type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Debug, Deserialize)]
pub struct PortfolioRequest {
    #[serde(default)]
    pub positions: Vec<RawPosition>,
}

#[derive(Debug, Deserialize)]
pub struct VarRequest {
    #[serde(default)]
    pub positions: Vec<RawPosition>,
    #[serde(default, alias = "confidenceLevel")]
    pub confidence_level: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct StressRequest {
    #[serde(default)]
    pub positions: Vec<RawPosition>,
    #[serde(default)]
    pub scenario: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BlendRequest {
    pub regime: String,
    #[serde(default)]
    pub signals: BTreeMap<String, f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub weights_loaded_at: Option<DateTime<Utc>>,
    pub weights_fingerprint: Option<String>,
}

fn portfolio_from(positions: &[RawPosition]) -> Result<Portfolio, ApiError> {
    Ok(Portfolio::from_raw(positions)?)
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        weights_loaded_at: state.weights.loaded_at(),
        weights_fingerprint: state.weights.current().map(|s| s.fingerprint.clone()),
    })
}

/// `POST /risk/analysis`
pub async fn risk_analysis(
    State(state): State<AppState>,
    body: Result<Json<PortfolioRequest>, JsonRejection>,
) -> ApiResult<RiskProfile> {
    let Json(req) = body?;
    let portfolio = portfolio_from(&req.positions)?;
    debug!("Risk analysis for {} positions", portfolio.len());
    Ok(Json(state.models.profile(&portfolio)))
}

/// `POST /risk/var`
pub async fn value_at_risk(
    State(state): State<AppState>,
    body: Result<Json<VarRequest>, JsonRejection>,
) -> ApiResult<VarResult> {
    let Json(req) = body?;
    let portfolio = portfolio_from(&req.positions)?;
    let confidence = req.confidence_level.unwrap_or(DEFAULT_CONFIDENCE_LEVEL);
    Ok(Json(state.models.value_at_risk(&portfolio, confidence)?))
}

/// `POST /risk/stresstest`
pub async fn stress_test(
    State(state): State<AppState>,
    body: Result<Json<StressRequest>, JsonRejection>,
) -> ApiResult<StressTestResult> {
    let Json(req) = body?;
    let portfolio = portfolio_from(&req.positions)?;
    let scenario = req.scenario.as_deref().unwrap_or(DEFAULT_SCENARIO);
    Ok(Json(state.models.stress_test(&portfolio, scenario)))
}

/// `POST /risk/hedging`
pub async fn hedging(
    State(state): State<AppState>,
    body: Result<Json<PortfolioRequest>, JsonRejection>,
) -> ApiResult<HedgingAdvice> {
    let Json(req) = body?;
    let portfolio = portfolio_from(&req.positions)?;
    Ok(Json(state.models.hedging(&portfolio)))
}

/// `POST /risk/report`, all analyses computed in parallel off the async runtime
pub async fn report(
    State(state): State<AppState>,
    body: Result<Json<VarRequest>, JsonRejection>,
) -> ApiResult<RiskReport> {
    let Json(req) = body?;
    let portfolio = portfolio_from(&req.positions)?;
    let confidence = req.confidence_level.unwrap_or(DEFAULT_CONFIDENCE_LEVEL);

    let models = Arc::clone(&state.models);
    let report =
        tokio::task::spawn_blocking(move || models.report(&portfolio, confidence)).await??;
    Ok(Json(report))
}

/// `GET /risk/scenarios`
pub async fn scenarios(State(state): State<AppState>) -> Json<Vec<StressScenario>> {
    Json(state.models.scenarios.scenarios().to_vec())
}

/// `GET /analysis/weights`
pub async fn weight_table(State(state): State<AppState>) -> ApiResult<WeightTable> {
    let snapshot = state.weights.snapshot().await?;
    Ok(Json(snapshot.table.clone()))
}

/// `GET /analysis/weights/:regime`
pub async fn regime_weights(
    State(state): State<AppState>,
    Path(regime): Path<String>,
) -> ApiResult<StrategyWeights> {
    Ok(Json(state.weights.resolve(&regime).await?))
}

/// `POST /analysis/blend`
pub async fn blend(
    State(state): State<AppState>,
    body: Result<Json<BlendRequest>, JsonRejection>,
) -> ApiResult<BlendedSignal> {
    let Json(req) = body?;
    let resolution = state.weights.resolve(&req.regime).await;
    Ok(Json(blend_for_regime(&req.regime, resolution, &req.signals)?))
}
