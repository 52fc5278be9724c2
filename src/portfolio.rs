//! Position normalizer
//!
//! Turns a caller-supplied holdings list into a validated [`Portfolio`].
//! This is the single place where portfolio input is checked; every
//! calculator downstream can assume `total_value > 0` and finite values.

use serde::Serialize;
use tracing::debug;

use crate::error::{RiskError, RiskResult};
use crate::types::{Position, RawPosition, Symbol};

/// Validated, request-scoped snapshot of holdings
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Portfolio {
    positions: Vec<Position>,
    #[serde(serialize_with = "crate::wire::float")]
    total_value: f64,
}

impl Portfolio {
    /// Validate and normalize raw positions
    pub fn from_raw(raw: &[RawPosition]) -> RiskResult<Self> {
        normalize(raw)
    }

    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn total_value(&self) -> f64 {
        self.total_value
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn symbols(&self) -> Vec<Symbol> {
        self.positions.iter().map(|p| p.symbol.clone()).collect()
    }

    /// Largest `n` holdings by value, ties kept in input order
    pub fn top_positions(&self, n: usize) -> Vec<&Position> {
        let mut sorted: Vec<&Position> = self.positions.iter().collect();
        sorted.sort_by(|a, b| b.value_usd.total_cmp(&a.value_usd));
        sorted.truncate(n);
        sorted
    }
}

/// Validate a raw holdings list and recompute allocation percentages
///
/// - empty list: `EmptyPortfolio`
/// - blank symbol, negative or non-finite value, or zero total: `InvalidPortfolio`
/// - zero-value positions are dropped
/// - symbols are trimmed and upper-cased; duplicates are merged in first-seen order
pub fn normalize(raw: &[RawPosition]) -> RiskResult<Portfolio> {
    if raw.is_empty() {
        return Err(RiskError::EmptyPortfolio);
    }

    let mut merged: Vec<(Symbol, f64)> = Vec::with_capacity(raw.len());
    for (idx, p) in raw.iter().enumerate() {
        let symbol = p.symbol.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(RiskError::InvalidPortfolio(format!(
                "position {} has an empty symbol",
                idx
            )));
        }
        if !p.value.is_finite() {
            return Err(RiskError::InvalidPortfolio(format!(
                "{} has a non-finite value",
                symbol
            )));
        }
        if p.value < 0.0 {
            return Err(RiskError::InvalidPortfolio(format!(
                "{} has a negative value ({})",
                symbol, p.value
            )));
        }
        if p.value == 0.0 {
            debug!("Dropping zero-value position {}", symbol);
            continue;
        }

        match merged.iter_mut().find(|(s, _)| s.as_str() == symbol) {
            Some((_, value)) => *value += p.value,
            None => merged.push((Symbol::new(&symbol), p.value)),
        }
    }

    let total_value: f64 = merged.iter().map(|(_, v)| v).sum();
    if total_value <= 0.0 || !total_value.is_finite() {
        return Err(RiskError::InvalidPortfolio(format!(
            "total value must be positive, got {}",
            total_value
        )));
    }

    let positions = merged
        .into_iter()
        .map(|(symbol, value_usd)| Position {
            symbol,
            allocation_pct: value_usd / total_value * 100.0,
            value_usd,
        })
        .collect();

    Ok(Portfolio {
        positions,
        total_value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn raw(items: &[(&str, f64)]) -> Vec<RawPosition> {
        items.iter().map(|(s, v)| RawPosition::new(*s, *v)).collect()
    }

    #[test]
    fn test_empty_list_is_rejected() {
        assert_eq!(normalize(&[]), Err(RiskError::EmptyPortfolio));
    }

    #[test]
    fn test_allocations_recomputed_and_sum_to_100() {
        let mut input = raw(&[("BTCUSDT", 6000.0), ("ETHUSDT", 3000.0), ("SOLUSDT", 1000.0)]);
        input[0].allocation = Some(99.0);

        let portfolio = normalize(&input).unwrap();
        assert_eq!(portfolio.total_value(), 10_000.0);
        assert_abs_diff_eq!(portfolio.positions()[0].allocation_pct, 60.0, epsilon = 1e-9);

        let sum: f64 = portfolio.positions().iter().map(|p| p.allocation_pct).sum();
        assert_abs_diff_eq!(sum, 100.0, epsilon = 1e-6);
    }

    #[test]
    fn test_negative_value_is_invalid() {
        let result = normalize(&raw(&[("BTC", 100.0), ("ETH", -1.0)]));
        assert!(matches!(result, Err(RiskError::InvalidPortfolio(_))));
    }

    #[test]
    fn test_non_finite_value_is_invalid() {
        let result = normalize(&raw(&[("BTC", f64::NAN)]));
        assert!(matches!(result, Err(RiskError::InvalidPortfolio(_))));
        let result = normalize(&raw(&[("BTC", f64::INFINITY)]));
        assert!(matches!(result, Err(RiskError::InvalidPortfolio(_))));
    }

    #[test]
    fn test_all_zero_values_is_invalid() {
        let result = normalize(&raw(&[("BTC", 0.0), ("ETH", 0.0)]));
        assert!(matches!(result, Err(RiskError::InvalidPortfolio(_))));
    }

    #[test]
    fn test_blank_symbol_is_invalid() {
        let result = normalize(&raw(&[("   ", 10.0)]));
        assert!(matches!(result, Err(RiskError::InvalidPortfolio(_))));
    }

    #[test]
    fn test_zero_value_positions_are_dropped() {
        let portfolio = normalize(&raw(&[("BTC", 100.0), ("DOGE", 0.0)])).unwrap();
        assert_eq!(portfolio.len(), 1);
        assert_eq!(portfolio.positions()[0].symbol.as_str(), "BTC");
        assert_eq!(portfolio.positions()[0].allocation_pct, 100.0);
    }

    #[test]
    fn test_duplicate_symbols_are_merged() {
        let portfolio =
            normalize(&raw(&[("btcusdt", 100.0), ("ETHUSDT", 50.0), (" BTCUSDT ", 50.0)])).unwrap();
        assert_eq!(portfolio.len(), 2);
        assert_eq!(portfolio.positions()[0].symbol.as_str(), "BTCUSDT");
        assert_eq!(portfolio.positions()[0].value_usd, 150.0);
        assert_eq!(portfolio.positions()[1].symbol.as_str(), "ETHUSDT");
    }

    #[test]
    fn test_top_positions_orders_by_value() {
        let portfolio = normalize(&raw(&[("A", 1.0), ("B", 5.0), ("C", 3.0)])).unwrap();
        let top: Vec<&str> = portfolio
            .top_positions(2)
            .iter()
            .map(|p| p.symbol.as_str())
            .collect();
        assert_eq!(top, vec!["B", "C"]);
    }
}
