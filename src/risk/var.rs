//! Value-at-Risk calculator
//!
//! A designed approximation, not a fitted return model:
//!
//! ```text
//! multiplier = 1 + max(0, confidence - 90) / 10 * 0.5
//! daily      = baseline_daily_loss_pct * multiplier
//! weekly     = daily * sqrt(5)
//! monthly    = daily * sqrt(22)
//! amount     = percent / 100 * total_value
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{RiskError, RiskResult};
use crate::portfolio::Portfolio;

pub const METHODOLOGY_LABEL: &str = "Historical Simulation (parametric approximation)";
pub const DEFAULT_CONFIDENCE_LEVEL: f64 = 95.0;
pub const MIN_CONFIDENCE_LEVEL: f64 = 50.0;
pub const MAX_CONFIDENCE_LEVEL: f64 = 99.9;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VarParams {
    /// Daily loss at or below the confidence floor, in percent
    pub baseline_daily_loss_pct: f64,
    /// Confidence level above which the multiplier starts to grow
    pub confidence_floor: f64,
    /// Multiplier increase per 10 points of confidence above the floor
    pub multiplier_per_ten_points: f64,
    pub trading_days_per_week: f64,
    pub trading_days_per_month: f64,
}

impl Default for VarParams {
    fn default() -> Self {
        Self {
            baseline_daily_loss_pct: 2.0,
            confidence_floor: 90.0,
            multiplier_per_ten_points: 0.5,
            trading_days_per_week: 5.0,
            trading_days_per_month: 22.0,
        }
    }
}

impl VarParams {
    pub fn confidence_multiplier(&self, confidence_level: f64) -> f64 {
        1.0 + (confidence_level - self.confidence_floor).max(0.0) / 10.0
            * self.multiplier_per_ten_points
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VarEstimate {
    #[serde(serialize_with = "crate::wire::float")]
    pub percent: f64,
    #[serde(serialize_with = "crate::wire::float")]
    pub amount_usd: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VarHorizons {
    pub daily: VarEstimate,
    pub weekly: VarEstimate,
    pub monthly: VarEstimate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VarResult {
    #[serde(serialize_with = "crate::wire::float")]
    pub confidence_level: f64,
    pub methodology_label: String,
    #[serde(serialize_with = "crate::wire::float")]
    pub portfolio_value: f64,
    pub horizons: VarHorizons,
}

pub fn validate_confidence(confidence_level: f64) -> RiskResult<f64> {
    if confidence_level.is_finite()
        && (MIN_CONFIDENCE_LEVEL..=MAX_CONFIDENCE_LEVEL).contains(&confidence_level)
    {
        Ok(confidence_level)
    } else {
        Err(RiskError::InvalidConfidenceLevel(confidence_level))
    }
}

/// Project probable loss at daily, weekly and monthly horizons
pub fn calculate(
    portfolio: &Portfolio,
    confidence_level: f64,
    params: &VarParams,
) -> RiskResult<VarResult> {
    let confidence_level = validate_confidence(confidence_level)?;
    let total = portfolio.total_value();

    let daily_pct = params.baseline_daily_loss_pct * params.confidence_multiplier(confidence_level);
    let estimate = |percent: f64| VarEstimate {
        percent,
        amount_usd: percent / 100.0 * total,
    };

    Ok(VarResult {
        confidence_level,
        methodology_label: METHODOLOGY_LABEL.to_string(),
        portfolio_value: total,
        horizons: VarHorizons {
            daily: estimate(daily_pct),
            weekly: estimate(daily_pct * params.trading_days_per_week.sqrt()),
            monthly: estimate(daily_pct * params.trading_days_per_month.sqrt()),
        },
    })
}

/// VaR at several confidence levels; fails on the first invalid level
pub fn ladder(
    portfolio: &Portfolio,
    confidence_levels: &[f64],
    params: &VarParams,
) -> RiskResult<Vec<VarResult>> {
    confidence_levels
        .iter()
        .map(|&c| calculate(portfolio, c, params))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RawPosition;
    use approx::assert_abs_diff_eq;

    fn portfolio() -> Portfolio {
        Portfolio::from_raw(&[
            RawPosition::new("BTCUSDT", 6000.0),
            RawPosition::new("ETHUSDT", 4000.0),
        ])
        .unwrap()
    }

    #[test]
    fn test_confidence_multiplier() {
        let params = VarParams::default();
        assert_abs_diff_eq!(params.confidence_multiplier(95.0), 1.25, epsilon = 1e-12);
        assert_abs_diff_eq!(params.confidence_multiplier(99.0), 1.45, epsilon = 1e-12);
        assert_abs_diff_eq!(params.confidence_multiplier(80.0), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_default_confidence_amounts() {
        let result = calculate(&portfolio(), DEFAULT_CONFIDENCE_LEVEL, &VarParams::default()).unwrap();
        assert_abs_diff_eq!(result.horizons.daily.percent, 2.5, epsilon = 1e-12);
        assert_abs_diff_eq!(result.horizons.daily.amount_usd, 250.0, epsilon = 1e-9);
        assert_abs_diff_eq!(
            result.horizons.weekly.percent,
            2.5 * 5f64.sqrt(),
            epsilon = 1e-12
        );
        assert_abs_diff_eq!(
            result.horizons.monthly.amount_usd,
            250.0 * 22f64.sqrt(),
            epsilon = 1e-9
        );
        assert_eq!(result.methodology_label, METHODOLOGY_LABEL);
    }

    #[test]
    fn test_out_of_range_confidence_rejected() {
        let params = VarParams::default();
        for c in [49.9, 99.95, 100.0, -1.0, f64::NAN, f64::INFINITY] {
            let result = calculate(&portfolio(), c, &params);
            assert!(
                matches!(result, Err(RiskError::InvalidConfidenceLevel(_))),
                "confidence {} accepted",
                c
            );
        }
        assert!(calculate(&portfolio(), 50.0, &params).is_ok());
        assert!(calculate(&portfolio(), 99.9, &params).is_ok());
    }

    #[test]
    fn test_monotonic_in_confidence_and_horizon() {
        let params = VarParams::default();
        let levels: Vec<f64> = (0..=99).map(|i| 50.0 + i as f64 * 0.499).collect();
        let results = ladder(&portfolio(), &levels, &params).unwrap();

        for window in results.windows(2) {
            assert!(window[1].horizons.daily.amount_usd >= window[0].horizons.daily.amount_usd);
            assert!(window[1].horizons.monthly.amount_usd >= window[0].horizons.monthly.amount_usd);
        }
        for r in &results {
            assert!(r.horizons.monthly.amount_usd >= r.horizons.weekly.amount_usd);
            assert!(r.horizons.weekly.amount_usd >= r.horizons.daily.amount_usd);
            assert!(r.horizons.daily.percent >= 0.0);
        }
    }
}
