//! Ensemble weight table
//!
//! Wire format, as written by the backtest pipeline:
//!
//! ```json
//! { "trending": { "momentum": 0.6, "mean_reversion": 0.4 }, ... }
//! ```
//!
//! A table is accepted whole or not at all. Clamping or renormalizing a bad
//! row would silently mis-allocate capital, so any violation rejects it.

use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use tracing::warn;

use super::MarketRegime;
use crate::error::{RiskError, RiskResult};

/// Allowed deviation of a regime's weight sum from 1.0
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Validated regime -> strategy -> weight mapping
#[derive(Debug, Clone, PartialEq)]
pub struct WeightTable(BTreeMap<String, BTreeMap<String, f64>>);

impl Serialize for WeightTable {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        crate::wire::nested_float_map(&self.0, serializer)
    }
}

impl WeightTable {
    /// Validate a mapping; regime labels are trimmed and lower-cased
    pub fn new(raw: BTreeMap<String, BTreeMap<String, f64>>) -> RiskResult<Self> {
        let mut rows = BTreeMap::new();
        for (label, weights) in raw {
            let key = label.trim().to_lowercase();
            if rows.insert(key, weights).is_some() {
                return Err(RiskError::CorruptWeightTable(format!(
                    "duplicate regime '{}'",
                    label.trim()
                )));
            }
        }
        let table = WeightTable(rows);
        table.validate()?;
        Ok(table)
    }

    /// Parse and validate pipeline output
    pub fn from_slice(bytes: &[u8]) -> RiskResult<Self> {
        let raw: BTreeMap<String, BTreeMap<String, f64>> = serde_json::from_slice(bytes)
            .map_err(|e| RiskError::CorruptWeightTable(format!("malformed JSON: {}", e)))?;
        Self::new(raw)
    }

    fn validate(&self) -> RiskResult<()> {
        if self.0.is_empty() {
            return Err(RiskError::CorruptWeightTable(
                "table contains no regimes".to_string(),
            ));
        }

        for (regime, weights) in &self.0 {
            if regime.parse::<MarketRegime>().is_err() {
                warn!("Weight table contains unrecognised regime '{}'", regime);
            }
            if weights.is_empty() {
                return Err(RiskError::CorruptWeightTable(format!(
                    "regime '{}' has no strategies",
                    regime
                )));
            }
            for (strategy, w) in weights {
                if !w.is_finite() || *w < 0.0 {
                    return Err(RiskError::CorruptWeightTable(format!(
                        "regime '{}' strategy '{}' has invalid weight {}",
                        regime, strategy, w
                    )));
                }
            }
            let sum: f64 = weights.values().sum();
            if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
                return Err(RiskError::CorruptWeightTable(format!(
                    "regime '{}' weights sum to {:.9}, expected 1.0",
                    regime, sum
                )));
            }
        }
        Ok(())
    }

    pub fn regimes(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Weights for one regime, `UnknownRegime` when the table lacks it
    pub fn weights_for(&self, regime: MarketRegime) -> RiskResult<StrategyWeights> {
        self.0
            .get(regime.as_str())
            .map(|weights| StrategyWeights {
                regime,
                weights: weights.clone(),
            })
            .ok_or_else(|| RiskError::UnknownRegime(regime.to_string()))
    }

    pub fn as_map(&self) -> &BTreeMap<String, BTreeMap<String, f64>> {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyWeights {
    pub regime: MarketRegime,
    #[serde(serialize_with = "crate::wire::float_map")]
    pub weights: BTreeMap<String, f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"{
        "trending": {"momentum": 0.6, "mean_reversion": 0.1, "breakout": 0.3},
        "Sideways": {"momentum": 0.2, "mean_reversion": 0.8}
    }"#;

    #[test]
    fn test_valid_table_loads() {
        let table = WeightTable::from_slice(VALID.as_bytes()).unwrap();
        assert_eq!(table.len(), 2);
        let w = table.weights_for(MarketRegime::Sideways).unwrap();
        assert_eq!(w.weights["mean_reversion"], 0.8);
    }

    #[test]
    fn test_every_regime_sums_to_one() {
        let table = WeightTable::from_slice(VALID.as_bytes()).unwrap();
        for weights in table.as_map().values() {
            let sum: f64 = weights.values().sum();
            assert!((sum - 1.0).abs() <= WEIGHT_SUM_TOLERANCE);
        }
    }

    #[test]
    fn test_missing_regime_is_unknown() {
        let table = WeightTable::from_slice(VALID.as_bytes()).unwrap();
        assert_eq!(
            table.weights_for(MarketRegime::Volatile),
            Err(RiskError::UnknownRegime("volatile".to_string()))
        );
    }

    #[test]
    fn test_bad_sum_rejected_not_clamped() {
        let json = r#"{"trending": {"a": 0.6, "b": 0.6}, "bull": {"a": 1.0}}"#;
        let result = WeightTable::from_slice(json.as_bytes());
        assert!(matches!(result, Err(RiskError::CorruptWeightTable(_))));
    }

    #[test]
    fn test_case_colliding_regimes_rejected() {
        let json = r#"{"Bull": {"a": 1.0}, "bull": {"b": 0.5, "c": 0.5}}"#;
        assert_eq!(
            WeightTable::from_slice(json.as_bytes()),
            Err(RiskError::CorruptWeightTable("duplicate regime 'bull'".to_string()))
        );
    }

    #[test]
    fn test_tolerance_boundary() {
        let ok = r#"{"bull": {"a": 0.5, "b": 0.5000005}}"#;
        assert!(WeightTable::from_slice(ok.as_bytes()).is_ok());
        let bad = r#"{"bull": {"a": 0.5, "b": 0.50001}}"#;
        assert!(WeightTable::from_slice(bad.as_bytes()).is_err());
    }

    #[test]
    fn test_negative_weight_rejected() {
        let json = r#"{"bear": {"a": 1.5, "b": -0.5}}"#;
        assert!(matches!(
            WeightTable::from_slice(json.as_bytes()),
            Err(RiskError::CorruptWeightTable(_))
        ));
    }

    #[test]
    fn test_empty_and_malformed_rejected() {
        for json in ["{}", r#"{"bull": {}}"#, "not json", r#"{"bull": {"a": "x"}}"#] {
            assert!(
                matches!(
                    WeightTable::from_slice(json.as_bytes()),
                    Err(RiskError::CorruptWeightTable(_))
                ),
                "accepted {}",
                json
            );
        }
    }

    #[test]
    fn test_table_serializes_as_plain_mapping() {
        let table = WeightTable::from_slice(VALID.as_bytes()).unwrap();
        let value = serde_json::to_value(&table).unwrap();
        assert_eq!(value["sideways"]["momentum"], 0.2);
        assert_eq!(value["trending"]["breakout"], 0.3);
    }
}
