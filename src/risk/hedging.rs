//! Hedging advisor
//!
//! Maps a risk posture to an ordered list of hedge templates. This is
//! advisory text generation, not optimization; the payload says so.

use serde::{Deserialize, Serialize};

use super::diversification::RiskProfile;
use crate::portfolio::Portfolio;
use crate::types::{Complexity, RiskLevel};

pub const DISCLAIMER: &str = "These recommendations are generated from heuristic risk scores for \
informational purposes only. They are not financial advice; evaluate costs, liquidity and \
counterparty risk before acting.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HedgeType {
    Options,
    Futures,
    Diversification,
    StablecoinRotation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HedgingParams {
    /// Number of largest holdings named as hedge targets
    pub top_assets: usize,
    pub options_min_risk_score: f64,
    pub futures_min_risk_score: f64,
    pub stablecoin_min_risk_score: f64,
    /// Below this portfolio value a futures hedge is not worth the margin overhead
    pub futures_min_notional_usd: f64,
    pub options_cost_bps: f64,
    pub futures_cost_bps: f64,
    pub diversification_cost_bps: f64,
    pub stablecoin_cost_bps: f64,
    /// Share of the portfolio suggested for stablecoin rotation, percent
    pub stablecoin_rotation_pct: f64,
}

impl Default for HedgingParams {
    fn default() -> Self {
        Self {
            top_assets: 3,
            options_min_risk_score: 50.0,
            futures_min_risk_score: 70.0,
            stablecoin_min_risk_score: 60.0,
            futures_min_notional_usd: 10_000.0,
            options_cost_bps: 200.0,
            futures_cost_bps: 15.0,
            diversification_cost_bps: 20.0,
            stablecoin_cost_bps: 10.0,
            stablecoin_rotation_pct: 20.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HedgingRecommendation {
    #[serde(rename = "type")]
    pub hedge_type: HedgeType,
    pub description: String,
    pub target_assets: Vec<String>,
    #[serde(serialize_with = "crate::wire::float")]
    pub cost_estimate_usd: f64,
    pub cost_estimate_label: String,
    pub benefit_label: String,
    pub complexity: Complexity,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HedgingAdvice {
    #[serde(serialize_with = "crate::wire::float")]
    pub portfolio_value: f64,
    pub current_risk_level: RiskLevel,
    #[serde(serialize_with = "crate::wire::float")]
    pub risk_score: f64,
    pub recommendations: Vec<HedgingRecommendation>,
    pub disclaimer: String,
}

fn cost(total_value: f64, bps: f64) -> (f64, String) {
    let usd = total_value * bps / 10_000.0;
    (usd, format!("${:.2} (~{:.2}% of portfolio)", usd, bps / 100.0))
}

/// Produce hedge recommendations for a portfolio and its risk profile
///
/// Template order is fixed: options, futures, diversification, stablecoin
/// rotation. Diversification is always present.
pub fn advise(profile: &RiskProfile, portfolio: &Portfolio, params: &HedgingParams) -> HedgingAdvice {
    let risk = profile.risk_score;
    let total = portfolio.total_value();
    let targets: Vec<String> = portfolio
        .top_positions(params.top_assets)
        .iter()
        .map(|p| p.symbol.to_string())
        .collect();
    let joined = targets.join(", ");

    let mut recommendations = Vec::with_capacity(4);

    if risk >= params.options_min_risk_score {
        let (usd, label) = cost(total, params.options_cost_bps);
        recommendations.push(HedgingRecommendation {
            hedge_type: HedgeType::Options,
            description: format!(
                "Buy out-of-the-money protective puts on {} to cap downside",
                joined
            ),
            target_assets: targets.clone(),
            cost_estimate_usd: usd,
            cost_estimate_label: label,
            benefit_label: "Limits losses below the strike while keeping upside".to_string(),
            complexity: Complexity::High,
        });
    }

    if risk >= params.futures_min_risk_score && total >= params.futures_min_notional_usd {
        let (usd, label) = cost(total, params.futures_cost_bps);
        recommendations.push(HedgingRecommendation {
            hedge_type: HedgeType::Futures,
            description: format!(
                "Open short perpetual futures against {} sized to the spot exposure",
                joined
            ),
            target_assets: targets.clone(),
            cost_estimate_usd: usd,
            cost_estimate_label: format!("{} plus funding", label),
            benefit_label: "Offsets directional exposure without selling spot".to_string(),
            complexity: Complexity::Medium,
        });
    }

    {
        let (usd, label) = cost(total, params.diversification_cost_bps);
        let description = if profile.position_count < 5 {
            format!(
                "Portfolio holds {} asset(s); add low-correlation assets to reduce concentration in {}",
                profile.position_count, joined
            )
        } else {
            format!(
                "Rebalance away from {} toward lower-correlation holdings",
                joined
            )
        };
        recommendations.push(HedgingRecommendation {
            hedge_type: HedgeType::Diversification,
            description,
            target_assets: targets.clone(),
            cost_estimate_usd: usd,
            cost_estimate_label: label,
            benefit_label: "Reduces concentration and single-asset drawdown risk".to_string(),
            complexity: Complexity::Low,
        });
    }

    if risk >= params.stablecoin_min_risk_score {
        let rotated = total * params.stablecoin_rotation_pct / 100.0;
        let (usd, label) = cost(rotated, params.stablecoin_cost_bps);
        recommendations.push(HedgingRecommendation {
            hedge_type: HedgeType::StablecoinRotation,
            description: format!(
                "Rotate about {:.0}% (${:.2}) of {} into stablecoins",
                params.stablecoin_rotation_pct, rotated, joined
            ),
            target_assets: targets,
            cost_estimate_usd: usd,
            cost_estimate_label: label,
            benefit_label: "Locks in value and provides dry powder for re-entry".to_string(),
            complexity: Complexity::Low,
        });
    }

    HedgingAdvice {
        portfolio_value: total,
        current_risk_level: RiskLevel::from_score(risk),
        risk_score: risk,
        recommendations,
        disclaimer: DISCLAIMER.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::risk::classifier::StaticAssetClassifier;
    use crate::risk::correlation::SyntheticPlaceholder;
    use crate::risk::diversification::{analyze, DiversificationParams};
    use crate::types::RawPosition;

    fn advice_for(values: &[(&str, f64)]) -> HedgingAdvice {
        let raw: Vec<RawPosition> = values.iter().map(|(s, v)| RawPosition::new(*s, *v)).collect();
        let portfolio = Portfolio::from_raw(&raw).unwrap();
        let profile = analyze(
            &portfolio,
            &DiversificationParams::default(),
            &SyntheticPlaceholder,
            &StaticAssetClassifier::default(),
        );
        advise(&profile, &portfolio, &HedgingParams::default())
    }

    fn types(advice: &HedgingAdvice) -> Vec<HedgeType> {
        advice.recommendations.iter().map(|r| r.hedge_type).collect()
    }

    #[test]
    fn test_concentrated_portfolio_gets_all_templates_in_order() {
        let advice = advice_for(&[("BTCUSDT", 6000.0), ("ETHUSDT", 4000.0)]);
        assert_eq!(advice.current_risk_level, RiskLevel::High);
        assert_eq!(
            types(&advice),
            vec![
                HedgeType::Options,
                HedgeType::Futures,
                HedgeType::Diversification,
                HedgeType::StablecoinRotation
            ]
        );
        assert_eq!(advice.recommendations[0].target_assets, vec!["BTCUSDT", "ETHUSDT"]);
        assert!((advice.recommendations[0].cost_estimate_usd - 200.0).abs() < 1e-9);
    }

    #[test]
    fn test_small_portfolio_skips_futures() {
        let advice = advice_for(&[("BTCUSDT", 600.0), ("ETHUSDT", 400.0)]);
        assert!(!types(&advice).contains(&HedgeType::Futures));
    }

    #[test]
    fn test_diversified_portfolio_only_diversification() {
        let coins: Vec<(String, f64)> = (0..10).map(|i| (format!("C{}", i), 1000.0)).collect();
        let refs: Vec<(&str, f64)> = coins.iter().map(|(s, v)| (s.as_str(), *v)).collect();
        let advice = advice_for(&refs);
        assert_eq!(advice.current_risk_level, RiskLevel::Moderate);
        assert_eq!(types(&advice), vec![HedgeType::Diversification]);
        assert_eq!(advice.recommendations[0].target_assets.len(), 3);
        assert_eq!(advice.disclaimer, DISCLAIMER);
    }

    #[test]
    fn test_hedge_type_wire_names() {
        assert_eq!(
            serde_json::to_string(&HedgeType::StablecoinRotation).unwrap(),
            "\"stablecoinRotation\""
        );
    }
}
