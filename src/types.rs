//! Core data types shared by the risk calculators

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Trading pair symbol using Arc<str> for cheap cloning
///
/// Symbols are cloned into correlation matrices, per-asset breakdowns and
/// hedge target lists. Using Arc<str> instead of String keeps each clone O(1).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(#[serde(with = "arc_str_serde")] Arc<str>);

/// Custom serde for Arc<str>
mod arc_str_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::sync::Arc;

    pub fn serialize<S>(value: &Arc<str>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(value)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Arc<str>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Arc::from(s.as_str()))
    }
}

impl Symbol {
    pub fn new(s: impl AsRef<str>) -> Self {
        Symbol(Arc::from(s.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A holding as supplied by the caller, before validation
///
/// `allocation` is advisory only; the normalizer recomputes it from values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawPosition {
    pub symbol: String,
    #[serde(alias = "valueUsd", alias = "value_usd")]
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allocation: Option<f64>,
}

impl RawPosition {
    pub fn new(symbol: impl Into<String>, value: f64) -> Self {
        Self {
            symbol: symbol.into(),
            value,
            allocation: None,
        }
    }
}

/// A validated holding inside a [`crate::Portfolio`]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub symbol: Symbol,
    /// Share of total portfolio value, 0-100
    #[serde(serialize_with = "crate::wire::float")]
    pub allocation_pct: f64,
    #[serde(serialize_with = "crate::wire::float")]
    pub value_usd: f64,
}

/// Qualitative risk bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

impl RiskLevel {
    /// Bucket a 0-100 risk score: low below 40, high from 70
    pub fn from_score(score: f64) -> Self {
        if score >= 70.0 {
            RiskLevel::High
        } else if score >= 40.0 {
            RiskLevel::Moderate
        } else {
            RiskLevel::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Moderate => "moderate",
            RiskLevel::High => "high",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operational complexity of a hedge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Low,
    Medium,
    High,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_serializes_as_plain_string() {
        let symbol = Symbol::new("BTCUSDT");
        assert_eq!(serde_json::to_string(&symbol).unwrap(), "\"BTCUSDT\"");
        let back: Symbol = serde_json::from_str("\"ETHUSDT\"").unwrap();
        assert_eq!(back.as_str(), "ETHUSDT");
    }

    #[test]
    fn test_raw_position_accepts_value_aliases() {
        let a: RawPosition = serde_json::from_str(r#"{"symbol":"BTC","value":10}"#).unwrap();
        let b: RawPosition = serde_json::from_str(r#"{"symbol":"BTC","valueUsd":10}"#).unwrap();
        let c: RawPosition =
            serde_json::from_str(r#"{"symbol":"BTC","value_usd":10,"allocation":55}"#).unwrap();
        assert_eq!(a.value, 10.0);
        assert_eq!(b.value, 10.0);
        assert_eq!(c.allocation, Some(55.0));
    }

    #[test]
    fn test_risk_level_buckets() {
        assert_eq!(RiskLevel::from_score(10.0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(40.0), RiskLevel::Moderate);
        assert_eq!(RiskLevel::from_score(69.9), RiskLevel::Moderate);
        assert_eq!(RiskLevel::from_score(88.8), RiskLevel::High);
        assert_eq!(
            serde_json::to_string(&RiskLevel::Moderate).unwrap(),
            "\"moderate\""
        );
    }
}
