//! Asset classification
//!
//! Maps trading symbols (`BTCUSDT`, `ETH/USDT`, `SOL-USD`) to an asset class
//! key and a baseline volatility estimate. The lookup tables are populated
//! once at startup; nothing else in the crate parses symbols.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::Symbol;

/// Lower bound for per-asset baseline volatility
pub const MIN_BASELINE_VOLATILITY: f64 = 0.10;
/// Upper bound for per-asset baseline volatility, also used for unknown assets
pub const MAX_BASELINE_VOLATILITY: f64 = 0.30;
/// Asset class key shared by all USD-pegged stablecoins
pub const STABLECOIN_CLASS: &str = "STABLECOIN";

/// Result of classifying a symbol
#[derive(Debug, Clone, PartialEq)]
pub struct AssetProfile {
    /// Base asset with any quote asset removed, e.g. `BTC`
    pub base: String,
    /// Key used by stress scenarios, e.g. `BTC` or `STABLECOIN`
    pub class: String,
    /// Baseline annualised volatility estimate in [0.10, 0.30]
    pub baseline_volatility: f64,
}

/// Capability for resolving symbols to asset classes
pub trait AssetClassifier: Send + Sync {
    fn classify(&self, symbol: &Symbol) -> AssetProfile;
}

/// Extra asset registered from configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetEntry {
    pub base: String,
    pub volatility: f64,
    #[serde(default)]
    pub stablecoin: bool,
}

#[derive(Debug, Clone)]
struct KnownAsset {
    volatility: f64,
    stablecoin: bool,
}

/// Table-driven classifier
#[derive(Debug, Clone)]
pub struct StaticAssetClassifier {
    assets: HashMap<String, KnownAsset>,
    /// Quote assets, longest first so `FDUSD` wins over `USD`
    quotes: Vec<String>,
}

impl Default for StaticAssetClassifier {
    fn default() -> Self {
        let mut classifier = Self {
            assets: HashMap::new(),
            quotes: Vec::new(),
        };
        for (base, vol) in [
            ("BTC", 0.15),
            ("ETH", 0.20),
            ("BNB", 0.22),
            ("XRP", 0.25),
            ("ADA", 0.26),
            ("SOL", 0.28),
            ("AVAX", 0.28),
            ("DOT", 0.27),
            ("LINK", 0.27),
            ("MATIC", 0.28),
            ("LTC", 0.22),
            ("DOGE", 0.30),
        ] {
            classifier = classifier.with_asset(base, vol, false);
        }
        for base in ["USDT", "USDC", "BUSD", "DAI", "TUSD", "FDUSD"] {
            classifier = classifier.with_asset(base, MIN_BASELINE_VOLATILITY, true);
        }
        for quote in ["USDT", "USDC", "BUSD", "FDUSD", "TUSD", "USD", "INR", "EUR", "BTC", "ETH"] {
            classifier = classifier.with_quote(quote);
        }
        classifier
    }
}

impl StaticAssetClassifier {
    /// Register (or override) a base asset
    pub fn with_asset(mut self, base: &str, volatility: f64, stablecoin: bool) -> Self {
        self.assets.insert(
            base.to_uppercase(),
            KnownAsset {
                volatility: volatility.clamp(MIN_BASELINE_VOLATILITY, MAX_BASELINE_VOLATILITY),
                stablecoin,
            },
        );
        self
    }

    /// Register a quote asset suffix
    pub fn with_quote(mut self, quote: &str) -> Self {
        let quote = quote.to_uppercase();
        if !self.quotes.contains(&quote) {
            self.quotes.push(quote);
            self.quotes.sort_by(|a, b| b.len().cmp(&a.len()));
        }
        self
    }

    /// Apply entries loaded from configuration
    pub fn with_entries(self, entries: &[AssetEntry]) -> Self {
        entries.iter().fold(self, |c, e| {
            c.with_asset(&e.base, e.volatility, e.stablecoin)
        })
    }

    fn base_of(&self, symbol: &str) -> String {
        let symbol = symbol.trim().to_uppercase();

        if let Some((base, _)) = symbol.split_once(['/', '-', '_']) {
            return base.to_string();
        }
        if self.assets.contains_key(&symbol) {
            return symbol;
        }

        let mut candidate = None;
        for quote in &self.quotes {
            if let Some(prefix) = symbol.strip_suffix(quote.as_str()) {
                if prefix.is_empty() {
                    continue;
                }
                if self.assets.contains_key(prefix) {
                    return prefix.to_string();
                }
                candidate.get_or_insert_with(|| prefix.to_string());
            }
        }
        candidate.unwrap_or(symbol)
    }
}

impl AssetClassifier for StaticAssetClassifier {
    fn classify(&self, symbol: &Symbol) -> AssetProfile {
        let base = self.base_of(symbol.as_str());
        match self.assets.get(&base) {
            Some(known) => AssetProfile {
                class: if known.stablecoin {
                    STABLECOIN_CLASS.to_string()
                } else {
                    base.clone()
                },
                baseline_volatility: known.volatility,
                base,
            },
            None => AssetProfile {
                class: base.clone(),
                baseline_volatility: MAX_BASELINE_VOLATILITY,
                base,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(symbol: &str) -> AssetProfile {
        StaticAssetClassifier::default().classify(&Symbol::new(symbol))
    }

    #[test]
    fn test_strips_concatenated_quote() {
        assert_eq!(classify("BTCUSDT").class, "BTC");
        assert_eq!(classify("ETHUSDT").class, "ETH");
        assert_eq!(classify("SOLINR").class, "SOL");
        assert_eq!(classify("ETHBTC").class, "ETH");
    }

    #[test]
    fn test_strips_separated_quote() {
        assert_eq!(classify("BTC/USDT").class, "BTC");
        assert_eq!(classify("eth-usd").class, "ETH");
    }

    #[test]
    fn test_bare_base_symbol() {
        assert_eq!(classify("BTC").class, "BTC");
        assert_eq!(classify("USDT").class, STABLECOIN_CLASS);
    }

    #[test]
    fn test_stablecoin_pair_resolves_to_stablecoin() {
        let profile = classify("USDCUSDT");
        assert_eq!(profile.base, "USDC");
        assert_eq!(profile.class, STABLECOIN_CLASS);
        assert_eq!(profile.baseline_volatility, MIN_BASELINE_VOLATILITY);
    }

    #[test]
    fn test_unknown_asset_gets_max_volatility() {
        let profile = classify("PEPEUSDT");
        assert_eq!(profile.class, "PEPE");
        assert_eq!(profile.baseline_volatility, MAX_BASELINE_VOLATILITY);
    }

    #[test]
    fn test_volatility_always_within_bounds() {
        let classifier = StaticAssetClassifier::default()
            .with_asset("WILD", 2.0, false)
            .with_asset("CALM", 0.01, false);
        for s in ["BTCUSDT", "WILD", "CALM", "XYZ", "DOGEUSDT"] {
            let v = classifier.classify(&Symbol::new(s)).baseline_volatility;
            assert!(
                (MIN_BASELINE_VOLATILITY..=MAX_BASELINE_VOLATILITY).contains(&v),
                "{} volatility {} out of bounds",
                s,
                v
            );
        }
    }

    #[test]
    fn test_config_entries_extend_table() {
        let classifier = StaticAssetClassifier::default().with_entries(&[AssetEntry {
            base: "pyusd".into(),
            volatility: 0.1,
            stablecoin: true,
        }]);
        assert_eq!(
            classifier.classify(&Symbol::new("PYUSDUSDT")).class,
            STABLECOIN_CLASS
        );
    }
}
