//! Signal blending with regime weights

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, warn};

use super::table::StrategyWeights;
use crate::error::{RiskError, RiskResult};

/// Equal weights across the named strategies
pub fn equal_weights<S: AsRef<str>>(strategies: &[S]) -> BTreeMap<String, f64> {
    let mut names: Vec<&str> = strategies.iter().map(|s| s.as_ref()).collect();
    names.sort_unstable();
    names.dedup();
    if names.is_empty() {
        return BTreeMap::new();
    }
    let w = 1.0 / names.len() as f64;
    names.into_iter().map(|n| (n.to_string(), w)).collect()
}

/// Weighted sum of strategy signals
///
/// Signals are clamped to [-1, 1]. A strategy with a weight but no signal,
/// or with a non-finite signal, contributes zero.
pub fn blend_signals(weights: &BTreeMap<String, f64>, signals: &BTreeMap<String, f64>) -> f64 {
    weights
        .iter()
        .map(|(strategy, w)| match signals.get(strategy) {
            Some(s) if s.is_finite() => w * s.clamp(-1.0, 1.0),
            Some(s) => {
                warn!("Ignoring non-finite signal {} from {}", s, strategy);
                0.0
            }
            None => 0.0,
        })
        .sum()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlendedSignal {
    pub regime: String,
    #[serde(serialize_with = "crate::wire::float_map")]
    pub weights: BTreeMap<String, f64>,
    #[serde(serialize_with = "crate::wire::float")]
    pub blended_signal: f64,
    pub used_fallback: bool,
    /// Weighted strategies that supplied no signal
    pub missing_strategies: Vec<String>,
}

/// Blend signals using a resolution result
///
/// `UnknownRegime` is the one error handled here: the blend falls back to
/// equal weights over the supplied signals and reports `used_fallback`.
/// Every other error propagates.
pub fn blend_for_regime(
    label: &str,
    resolution: RiskResult<StrategyWeights>,
    signals: &BTreeMap<String, f64>,
) -> RiskResult<BlendedSignal> {
    let (weights, used_fallback) = match resolution {
        Ok(resolved) => (resolved.weights, false),
        Err(RiskError::UnknownRegime(regime)) => {
            info!(
                "No weights for regime '{}', blending {} strategies with equal weights",
                regime,
                signals.len()
            );
            let names: Vec<&str> = signals.keys().map(String::as_str).collect();
            (equal_weights(&names), true)
        }
        Err(e) => return Err(e),
    };

    let missing_strategies = weights
        .keys()
        .filter(|k| !signals.contains_key(*k))
        .cloned()
        .collect();

    Ok(BlendedSignal {
        regime: label.trim().to_lowercase(),
        blended_signal: blend_signals(&weights, signals),
        weights,
        used_fallback,
        missing_strategies,
    })
}
