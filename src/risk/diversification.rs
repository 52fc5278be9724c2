//! Diversification analyzer
//!
//! Scores concentration risk from the number of holdings and attaches a
//! correlation matrix and per-asset risk contribution.
//!
//! ```text
//! diversification_score = min(n * 10, 100) * 0.7
//! risk_score            = clamp(100 - diversification_score * 0.8, 0, 100)
//! contribution_pct      = allocation_pct / 100 * risk_score
//! ```
//!
//! The 0.7 weight caps diversification at 70: holding count alone never
//! earns a perfect score.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::classifier::AssetClassifier;
use super::correlation::{CorrelationMatrix, CorrelationSource};
use crate::portfolio::Portfolio;
use crate::types::RiskLevel;

/// Tunable constants of the concentration heuristic
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiversificationParams {
    /// Points awarded per distinct holding before the cap
    pub points_per_position: f64,
    /// Cap applied to the raw count score
    pub max_count_score: f64,
    /// Weight applied to the capped count score
    pub count_weight: f64,
    /// How strongly diversification offsets risk
    pub risk_offset_weight: f64,
    /// Short-term forecast is `high` above this risk score
    pub short_term_high_above: f64,
    /// Medium-term forecast is `low` below this risk score
    pub medium_term_low_below: f64,
}

impl Default for DiversificationParams {
    fn default() -> Self {
        Self {
            points_per_position: 10.0,
            max_count_score: 100.0,
            count_weight: 0.7,
            risk_offset_weight: 0.8,
            short_term_high_above: 70.0,
            medium_term_low_below: 50.0,
        }
    }
}

impl DiversificationParams {
    pub fn diversification_score(&self, position_count: usize) -> f64 {
        (position_count as f64 * self.points_per_position).min(self.max_count_score)
            * self.count_weight
    }

    pub fn risk_score(&self, diversification_score: f64) -> f64 {
        (100.0 - diversification_score * self.risk_offset_weight).clamp(0.0, 100.0)
    }

    pub fn forecast(&self, risk_score: f64) -> Forecast {
        Forecast {
            short_term: if risk_score > self.short_term_high_above {
                RiskLevel::High
            } else {
                RiskLevel::Moderate
            },
            medium_term: if risk_score < self.medium_term_low_below {
                RiskLevel::Low
            } else {
                RiskLevel::Moderate
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Forecast {
    pub short_term: RiskLevel,
    pub medium_term: RiskLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetRisk {
    pub asset_class: String,
    #[serde(serialize_with = "crate::wire::float")]
    pub volatility: f64,
    #[serde(serialize_with = "crate::wire::float")]
    pub contribution_pct: f64,
}

/// Concentration and correlation view of a portfolio
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskProfile {
    #[serde(serialize_with = "crate::wire::float")]
    pub total_value: f64,
    pub position_count: usize,
    #[serde(serialize_with = "crate::wire::float")]
    pub diversification_score: f64,
    #[serde(serialize_with = "crate::wire::float")]
    pub risk_score: f64,
    pub correlation_source: String,
    pub correlation_matrix: CorrelationMatrix,
    /// Mean pairwise correlation, `null` for a single position
    #[serde(serialize_with = "crate::wire::optional_float")]
    pub average_correlation: Option<f64>,
    pub risk_by_asset: BTreeMap<String, AssetRisk>,
    pub forecast: Forecast,
}

impl RiskProfile {
    pub fn risk_level(&self) -> RiskLevel {
        RiskLevel::from_score(self.risk_score)
    }
}

/// Compute the risk profile of a validated portfolio
pub fn analyze(
    portfolio: &Portfolio,
    params: &DiversificationParams,
    correlation: &dyn CorrelationSource,
    classifier: &dyn AssetClassifier,
) -> RiskProfile {
    let position_count = portfolio.len();
    let diversification_score = params.diversification_score(position_count);
    let risk_score = params.risk_score(diversification_score);

    let symbols = portfolio.symbols();
    let correlation_matrix = correlation.correlation_matrix(&symbols);

    let risk_by_asset = portfolio
        .positions()
        .iter()
        .map(|p| {
            let profile = classifier.classify(&p.symbol);
            (
                p.symbol.to_string(),
                AssetRisk {
                    asset_class: profile.class,
                    volatility: profile.baseline_volatility,
                    contribution_pct: p.allocation_pct / 100.0 * risk_score,
                },
            )
        })
        .collect();

    tracing::debug!(
        "Diversification: positions={}, score={:.2}, risk={:.2}, source={}",
        position_count,
        diversification_score,
        risk_score,
        correlation.name()
    );

    RiskProfile {
        total_value: portfolio.total_value(),
        position_count,
        diversification_score,
        risk_score,
        correlation_source: correlation.name().to_string(),
        average_correlation: correlation_matrix.average_off_diagonal(),
        correlation_matrix,
        risk_by_asset,
        forecast: params.forecast(risk_score),
    }
}
