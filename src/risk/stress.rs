//! Stress test engine
//!
//! Applies named macro scenarios to current exposures. Each scenario maps
//! asset classes to a fractional price shock; classes it does not list get
//! the scenario default.
//!
//! ```text
//! impact_amount   = value * multiplier
//! projected_value = value + impact_amount
//! ```
//!
//! An unknown scenario id is not an error for the caller: the engine logs
//! it and evaluates the default scenario (`bearMarket`) instead, flagging
//! `fell_back` in the result.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use super::classifier::{AssetClassifier, STABLECOIN_CLASS};
use crate::error::RiskError;
use crate::portfolio::Portfolio;

pub const DEFAULT_SCENARIO: &str = "bearMarket";

/// A named hypothetical market shock
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StressScenario {
    pub id: String,
    pub description: String,
    #[serde(serialize_with = "crate::wire::float_map")]
    pub asset_class_multipliers: BTreeMap<String, f64>,
    #[serde(serialize_with = "crate::wire::float")]
    pub default_multiplier: f64,
    pub duration_label: String,
    pub probability_label: String,
}

impl StressScenario {
    fn builtin(
        id: &str,
        description: &str,
        multipliers: &[(&str, f64)],
        default_multiplier: f64,
        duration_label: &str,
        probability_label: &str,
    ) -> Self {
        Self {
            id: id.to_string(),
            description: description.to_string(),
            asset_class_multipliers: multipliers
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect(),
            default_multiplier,
            duration_label: duration_label.to_string(),
            probability_label: probability_label.to_string(),
        }
    }

    pub fn multiplier_for(&self, asset_class: &str) -> f64 {
        self.asset_class_multipliers
            .get(asset_class)
            .copied()
            .unwrap_or(self.default_multiplier)
    }
}

/// Lookup key: case-insensitive, ignoring `_` and `-`, so `bear_market` finds `bearMarket`
fn scenario_key(id: &str) -> String {
    id.chars()
        .filter(|c| *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Immutable set of scenarios keyed by id
#[derive(Debug, Clone)]
pub struct ScenarioRegistry {
    scenarios: Vec<StressScenario>,
}

impl Default for ScenarioRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ScenarioRegistry {
    pub fn builtin() -> Self {
        let scenarios = vec![
            StressScenario::builtin(
                "bearMarket",
                "Prolonged crypto bear market with broad risk-off selling",
                &[("BTC", -0.40), ("ETH", -0.45), (STABLECOIN_CLASS, -0.01)],
                -0.35,
                "6-18 months",
                "medium",
            ),
            StressScenario::builtin(
                "marketCrash",
                "Severe market-wide crash with forced deleveraging",
                &[("BTC", -0.55), ("ETH", -0.60), (STABLECOIN_CLASS, -0.02)],
                -0.70,
                "1-3 months",
                "low",
            ),
            StressScenario::builtin(
                "flashCrash",
                "Liquidity-driven flash crash across spot and derivatives venues",
                &[("BTC", -0.25), ("ETH", -0.30), (STABLECOIN_CLASS, -0.005)],
                -0.40,
                "hours to days",
                "medium",
            ),
            StressScenario::builtin(
                "inflationShock",
                "Inflation surprise followed by aggressive rate hikes",
                &[("BTC", -0.20), ("ETH", -0.25), (STABLECOIN_CLASS, 0.0)],
                -0.30,
                "3-6 months",
                "medium",
            ),
            StressScenario::builtin(
                "regulatoryShock",
                "Major regulatory crackdown on exchanges and stablecoin issuers",
                &[("BTC", -0.25), ("ETH", -0.30), (STABLECOIN_CLASS, -0.05)],
                -0.45,
                "1-6 months",
                "low",
            ),
        ];
        Self { scenarios }
    }

    /// Add a scenario, replacing any existing one with the same id
    pub fn with_scenario(mut self, scenario: StressScenario) -> Self {
        let key = scenario_key(&scenario.id);
        match self.scenarios.iter_mut().find(|s| scenario_key(&s.id) == key) {
            Some(existing) => *existing = scenario,
            None => self.scenarios.push(scenario),
        }
        self
    }

    pub fn with_scenarios(self, extra: &[StressScenario]) -> Self {
        extra
            .iter()
            .cloned()
            .fold(self, |registry, s| registry.with_scenario(s))
    }

    pub fn get(&self, id: &str) -> Option<&StressScenario> {
        let key = scenario_key(id);
        self.scenarios.iter().find(|s| scenario_key(&s.id) == key)
    }

    pub fn scenarios(&self) -> &[StressScenario] {
        &self.scenarios
    }

    pub fn default_scenario(&self) -> &StressScenario {
        self.get(DEFAULT_SCENARIO).unwrap_or(&self.scenarios[0])
    }

    /// Resolve an id, falling back to the default scenario; the flag is true on fallback
    pub fn resolve(&self, id: &str) -> (&StressScenario, bool) {
        match self.get(id) {
            Some(s) => (s, false),
            None => {
                let fallback = self.default_scenario();
                warn!(
                    "{}; falling back to {}",
                    RiskError::UnknownScenario(id.to_string()),
                    fallback.id
                );
                (fallback, true)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetImpact {
    pub symbol: String,
    pub asset_class: String,
    #[serde(serialize_with = "crate::wire::float")]
    pub multiplier: f64,
    #[serde(serialize_with = "crate::wire::float")]
    pub current_value: f64,
    #[serde(serialize_with = "crate::wire::float")]
    pub impact_pct: f64,
    #[serde(serialize_with = "crate::wire::float")]
    pub impact_amount: f64,
    #[serde(serialize_with = "crate::wire::float")]
    pub projected_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StressTestResult {
    pub scenario_id: String,
    pub requested_scenario: String,
    pub fell_back: bool,
    pub description: String,
    pub duration: String,
    pub probability: String,
    #[serde(serialize_with = "crate::wire::float")]
    pub total_current_value: f64,
    #[serde(serialize_with = "crate::wire::float")]
    pub total_impact_amount: f64,
    #[serde(serialize_with = "crate::wire::float")]
    pub total_impact_pct: f64,
    #[serde(serialize_with = "crate::wire::float")]
    pub projected_value: f64,
    pub per_asset_impacts: Vec<AssetImpact>,
}

/// Evaluate one scenario against a portfolio
pub fn run(
    portfolio: &Portfolio,
    scenario_id: &str,
    registry: &ScenarioRegistry,
    classifier: &dyn AssetClassifier,
) -> StressTestResult {
    let (scenario, fell_back) = registry.resolve(scenario_id);
    apply(portfolio, scenario, scenario_id, fell_back, classifier)
}

/// Evaluate every registered scenario, in registry order
pub fn run_all(
    portfolio: &Portfolio,
    registry: &ScenarioRegistry,
    classifier: &dyn AssetClassifier,
) -> Vec<StressTestResult> {
    registry
        .scenarios()
        .iter()
        .map(|s| apply(portfolio, s, &s.id, false, classifier))
        .collect()
}

fn apply(
    portfolio: &Portfolio,
    scenario: &StressScenario,
    requested: &str,
    fell_back: bool,
    classifier: &dyn AssetClassifier,
) -> StressTestResult {
    let per_asset_impacts: Vec<AssetImpact> = portfolio
        .positions()
        .iter()
        .map(|p| {
            let class = classifier.classify(&p.symbol).class;
            let multiplier = scenario.multiplier_for(&class);
            let impact_amount = p.value_usd * multiplier;
            AssetImpact {
                symbol: p.symbol.to_string(),
                asset_class: class,
                multiplier,
                current_value: p.value_usd,
                impact_pct: multiplier * 100.0,
                impact_amount,
                projected_value: p.value_usd + impact_amount,
            }
        })
        .collect();

    let total_current_value = portfolio.total_value();
    let total_impact_amount: f64 = per_asset_impacts.iter().map(|a| a.impact_amount).sum();
    let projected_value = total_current_value + total_impact_amount;

    debug!(
        "Stress {}: impact={:.2} on {:.2}",
        scenario.id, total_impact_amount, total_current_value
    );

    StressTestResult {
        scenario_id: scenario.id.clone(),
        requested_scenario: requested.to_string(),
        fell_back,
        description: scenario.description.clone(),
        duration: scenario.duration_label.clone(),
        probability: scenario.probability_label.clone(),
        total_current_value,
        total_impact_amount,
        total_impact_pct: total_impact_amount / total_current_value * 100.0,
        projected_value,
        per_asset_impacts,
    }
}
