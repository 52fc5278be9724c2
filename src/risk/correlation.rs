//! Correlation sources
//!
//! The diversification analyzer asks a [`CorrelationSource`] for a
//! symbol×symbol matrix. Two sources exist:
//!
//! - [`SyntheticPlaceholder`]: index-based proxy bounded to [0.3, 0.9].
//!   Not derived from market data.
//! - [`HistoricalReturns`]: Pearson correlation over per-symbol return
//!   series, loaded from CSV.

use anyhow::{Context, Result};
use itertools::Itertools;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use statrs::statistics::Statistics;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

use crate::wire::Finite;
use crate::Symbol;

/// Lowest off-diagonal value the placeholder produces
pub const PLACEHOLDER_MIN_CORRELATION: f64 = 0.3;
/// Highest off-diagonal value the placeholder produces (adjacent holdings)
pub const PLACEHOLDER_MAX_CORRELATION: f64 = 0.9;
/// Decrease per step of index distance
pub const PLACEHOLDER_DECAY: f64 = 0.1;

/// Square, symmetric correlation matrix with unit diagonal
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    symbols: Vec<Symbol>,
    values: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    /// Build a matrix from a pairwise function evaluated on the upper triangle
    pub fn from_pairs<F>(symbols: &[Symbol], mut pair: F) -> Self
    where
        F: FnMut(usize, usize) -> f64,
    {
        let n = symbols.len();
        let mut values = vec![vec![0.0; n]; n];
        for (i, row) in values.iter_mut().enumerate() {
            row[i] = 1.0;
        }
        for (i, j) in (0..n).tuple_combinations() {
            let v = pair(i, j);
            values[i][j] = v;
            values[j][i] = v;
        }
        Self {
            symbols: symbols.to_vec(),
            values,
        }
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn values(&self) -> &[Vec<f64>] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Look up the correlation between two symbols
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.symbols.iter().position(|s| s.as_str() == a)?;
        let j = self.symbols.iter().position(|s| s.as_str() == b)?;
        Some(self.values[i][j])
    }

    /// Mean of the off-diagonal entries, `None` for fewer than two symbols
    pub fn average_off_diagonal(&self) -> Option<f64> {
        let n = self.symbols.len();
        if n < 2 {
            return None;
        }
        let sum: f64 = (0..n)
            .tuple_combinations()
            .map(|(i, j)| self.values[i][j])
            .sum();
        Some(sum / (n * (n - 1) / 2) as f64)
    }
}

/// Serialized as `{symbol: {symbol: value}}` in input order
impl Serialize for CorrelationMatrix {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        struct Row<'a>(&'a [Symbol], &'a [f64]);

        impl Serialize for Row<'_> {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: Serializer,
            {
                let mut map = serializer.serialize_map(Some(self.0.len()))?;
                for (symbol, value) in self.0.iter().zip(self.1) {
                    map.serialize_entry(symbol.as_str(), &Finite(*value))?;
                }
                map.end()
            }
        }

        let mut map = serializer.serialize_map(Some(self.symbols.len()))?;
        for (symbol, row) in self.symbols.iter().zip(&self.values) {
            map.serialize_entry(symbol.as_str(), &Row(&self.symbols, row))?;
        }
        map.end()
    }
}

/// Capability for producing correlation estimates
pub trait CorrelationSource: Send + Sync {
    /// Short identifier reported alongside the matrix
    fn name(&self) -> &'static str;

    fn correlation_matrix(&self, symbols: &[Symbol]) -> CorrelationMatrix;
}

/// Index-distance proxy: adjacent holdings 0.9, decaying by 0.1 per step, floored at 0.3
pub fn placeholder_correlation(i: usize, j: usize) -> f64 {
    if i == j {
        return 1.0;
    }
    let distance = i.abs_diff(j) as f64;
    (PLACEHOLDER_MAX_CORRELATION - PLACEHOLDER_DECAY * (distance - 1.0))
        .max(PLACEHOLDER_MIN_CORRELATION)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SyntheticPlaceholder;

impl CorrelationSource for SyntheticPlaceholder {
    fn name(&self) -> &'static str {
        "synthetic_placeholder"
    }

    fn correlation_matrix(&self, symbols: &[Symbol]) -> CorrelationMatrix {
        CorrelationMatrix::from_pairs(symbols, placeholder_correlation)
    }
}

/// Pearson correlation over historical return series
///
/// Series are aligned on their most recent observations. Pairs with fewer
/// than `min_observations` overlapping points, a missing series, or zero
/// variance fall back to [`placeholder_correlation`].
#[derive(Debug, Clone)]
pub struct HistoricalReturns {
    returns: HashMap<String, Vec<f64>>,
    min_observations: usize,
}

impl HistoricalReturns {
    pub fn new(returns: HashMap<String, Vec<f64>>) -> Self {
        Self {
            returns: returns
                .into_iter()
                .map(|(k, v)| (k.trim().to_uppercase(), v))
                .collect(),
            min_observations: 2,
        }
    }

    pub fn with_min_observations(mut self, min: usize) -> Self {
        self.min_observations = min.max(2);
        self
    }

    /// Load a CSV whose header names the symbols and whose rows are returns
    ///
    /// Empty cells are skipped, so columns may have different lengths.
    pub fn from_csv(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open returns file {}", path.display()))?;
        let source = Self::from_reader(file)
            .with_context(|| format!("Failed to parse returns file {}", path.display()))?;
        info!(
            "Loaded historical returns for {} symbols from {}",
            source.returns.len(),
            path.display()
        );
        Ok(source)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::Reader::from_reader(reader);
        let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.to_string()).collect();
        let mut columns: Vec<Vec<f64>> = vec![Vec::new(); headers.len()];

        for (row_idx, record) in rdr.records().enumerate() {
            let record = record?;
            for (col, cell) in record.iter().enumerate().take(headers.len()) {
                let cell = cell.trim();
                if cell.is_empty() {
                    continue;
                }
                let value: f64 = cell.parse().with_context(|| {
                    format!("Invalid return '{}' at row {}, column {}", cell, row_idx + 1, col)
                })?;
                columns[col].push(value);
            }
        }

        Ok(Self::new(headers.into_iter().zip(columns).collect()))
    }

    pub fn symbol_count(&self) -> usize {
        self.returns.len()
    }

    fn pearson(&self, a: &str, b: &str) -> Option<f64> {
        let a = self.returns.get(a)?;
        let b = self.returns.get(b)?;
        let n = a.len().min(b.len());
        if n < self.min_observations {
            return None;
        }
        let a = &a[a.len() - n..];
        let b = &b[b.len() - n..];

        let sd_a = a.iter().std_dev();
        let sd_b = b.iter().std_dev();
        if !(sd_a > 0.0 && sd_b > 0.0) {
            return None;
        }
        let cov = a.iter().covariance(b.iter());
        let r = cov / (sd_a * sd_b);
        r.is_finite().then(|| r.clamp(-1.0, 1.0))
    }
}

impl CorrelationSource for HistoricalReturns {
    fn name(&self) -> &'static str {
        "historical_returns"
    }

    fn correlation_matrix(&self, symbols: &[Symbol]) -> CorrelationMatrix {
        CorrelationMatrix::from_pairs(symbols, |i, j| {
            self.pearson(symbols[i].as_str(), symbols[j].as_str())
                .unwrap_or_else(|| {
                    debug!(
                        "No usable return history for {}/{}, using placeholder",
                        symbols[i], symbols[j]
                    );
                    placeholder_correlation(i, j)
                })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn symbols(names: &[&str]) -> Vec<Symbol> {
        names.iter().map(Symbol::new).collect()
    }

    #[test]
    fn test_placeholder_diagonal_and_symmetry() {
        let syms = symbols(&["A", "B", "C", "D", "E", "F", "G", "H", "I", "J"]);
        let m = SyntheticPlaceholder.correlation_matrix(&syms);
        for i in 0..syms.len() {
            assert_eq!(m.values()[i][i], 1.0);
            for j in 0..syms.len() {
                assert_eq!(m.values()[i][j], m.values()[j][i]);
                if i != j {
                    let v = m.values()[i][j];
                    assert!((0.3..=0.9).contains(&v), "({},{}) = {}", i, j, v);
                }
            }
        }
    }

    #[test]
    fn test_placeholder_decays_with_distance() {
        assert_abs_diff_eq!(placeholder_correlation(0, 1), 0.9, epsilon = 1e-12);
        assert_abs_diff_eq!(placeholder_correlation(0, 2), 0.8, epsilon = 1e-12);
        assert_abs_diff_eq!(placeholder_correlation(0, 9), 0.3, epsilon = 1e-12);
        assert_abs_diff_eq!(placeholder_correlation(3, 1), 0.8, epsilon = 1e-12);
    }

    #[test]
    fn test_matrix_lookup_and_average() {
        let m = SyntheticPlaceholder.correlation_matrix(&symbols(&["BTC", "ETH", "SOL"]));
        assert_eq!(m.get("BTC", "BTC"), Some(1.0));
        assert_eq!(m.get("BTC", "ETH"), m.get("ETH", "BTC"));
        assert_eq!(m.get("BTC", "XRP"), None);
        // (0.9 + 0.8 + 0.9) / 3
        assert_abs_diff_eq!(m.average_off_diagonal().unwrap(), 2.6 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_matrix_serializes_as_nested_map() {
        let m = SyntheticPlaceholder.correlation_matrix(&symbols(&["BTC", "ETH"]));
        let value = serde_json::to_value(&m).unwrap();
        assert_eq!(value["BTC"]["BTC"], 1.0);
        assert_eq!(value["ETH"]["BTC"], 0.9);
    }

    #[test]
    fn test_historical_perfect_correlation() {
        let mut returns = HashMap::new();
        returns.insert("BTC".to_string(), vec![0.01, -0.02, 0.03, 0.00, 0.015]);
        returns.insert("ETH".to_string(), vec![0.02, -0.04, 0.06, 0.00, 0.03]);
        returns.insert("INV".to_string(), vec![-0.01, 0.02, -0.03, 0.00, -0.015]);
        let source = HistoricalReturns::new(returns);

        let m = source.correlation_matrix(&symbols(&["BTC", "ETH", "INV"]));
        assert_abs_diff_eq!(m.get("BTC", "ETH").unwrap(), 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(m.get("BTC", "INV").unwrap(), -1.0, epsilon = 1e-9);
        assert_eq!(m.get("INV", "INV"), Some(1.0));
    }

    #[test]
    fn test_historical_falls_back_without_data() {
        let mut returns = HashMap::new();
        returns.insert("BTC".to_string(), vec![0.01, 0.02, 0.03]);
        returns.insert("FLAT".to_string(), vec![0.0, 0.0, 0.0]);
        let source = HistoricalReturns::new(returns);

        let m = source.correlation_matrix(&symbols(&["BTC", "ETH", "FLAT"]));
        assert_eq!(m.get("BTC", "ETH"), Some(placeholder_correlation(0, 1)));
        assert_eq!(m.get("BTC", "FLAT"), Some(placeholder_correlation(0, 2)));
    }

    #[test]
    fn test_historical_from_csv_reader() {
        let csv = "btc,eth\n0.01,0.02\n-0.02,-0.04\n0.03,\n0.01,0.02\n";
        let source = HistoricalReturns::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(source.symbol_count(), 2);
        assert_eq!(source.returns["BTC"].len(), 4);
        assert_eq!(source.returns["ETH"].len(), 3);
    }

    #[test]
    fn test_historical_csv_rejects_garbage() {
        let csv = "BTC\nabc\n";
        assert!(HistoricalReturns::from_reader(csv.as_bytes()).is_err());
    }
}
