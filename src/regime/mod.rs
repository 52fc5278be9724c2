//! Regime-weighted strategy allocation
//!
//! The offline backtest pipeline derives, for each market regime, the
//! blend weights of the trading strategies. This module validates that
//! table, serves it from an atomically swapped snapshot, and blends
//! per-strategy signals with the resolved weights.

pub mod blend;
pub mod resolver;
pub mod table;

use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub use blend::{blend_for_regime, blend_signals, equal_weights, BlendedSignal};
pub use resolver::{FileWeightSource, StaticWeightSource, WeightResolver, WeightSnapshot, WeightSource};
pub use table::{StrategyWeights, WeightTable, WEIGHT_SUM_TOLERANCE};

use crate::error::RiskError;

/// Market condition label used to select strategy weights
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketRegime {
    Normal,
    Trending,
    Volatile,
    Sideways,
    Gappy,
    Bull,
    Bear,
}

impl MarketRegime {
    pub const ALL: [MarketRegime; 7] = [
        MarketRegime::Normal,
        MarketRegime::Trending,
        MarketRegime::Volatile,
        MarketRegime::Sideways,
        MarketRegime::Gappy,
        MarketRegime::Bull,
        MarketRegime::Bear,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MarketRegime::Normal => "normal",
            MarketRegime::Trending => "trending",
            MarketRegime::Volatile => "volatile",
            MarketRegime::Sideways => "sideways",
            MarketRegime::Gappy => "gappy",
            MarketRegime::Bull => "bull",
            MarketRegime::Bear => "bear",
        }
    }
}

impl std::fmt::Display for MarketRegime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MarketRegime {
    type Err = RiskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let label = s.trim().to_lowercase();
        MarketRegime::ALL
            .into_iter()
            .find(|r| r.as_str() == label)
            .ok_or_else(|| RiskError::UnknownRegime(s.trim().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_labels() {
        for regime in MarketRegime::ALL {
            assert_eq!(regime.as_str().parse::<MarketRegime>().unwrap(), regime);
        }
        assert_eq!(" Volatile ".parse::<MarketRegime>().unwrap(), MarketRegime::Volatile);
    }

    #[test]
    fn test_parse_unknown_label() {
        assert_eq!(
            "crab".parse::<MarketRegime>(),
            Err(RiskError::UnknownRegime("crab".to_string()))
        );
    }

    #[test]
    fn test_serde_matches_labels() {
        assert_eq!(serde_json::to_string(&MarketRegime::Gappy).unwrap(), "\"gappy\"");
    }
}
