//! Configuration management
//!
//! Handles loading and parsing of JSON configuration files with environment
//! variable overrides for deployment-specific settings. Every section has
//! defaults, so an empty `{}` file is a valid configuration.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::regime::{FileWeightSource, WeightResolver};
use crate::risk::classifier::{AssetEntry, StaticAssetClassifier};
use crate::risk::correlation::{HistoricalReturns, SyntheticPlaceholder};
use crate::risk::{
    CorrelationSource, DiversificationParams, HedgingParams, RiskModels, ScenarioRegistry,
    StressScenario, VarParams,
};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub weights: WeightsConfig,
    pub model: ModelConfig,
    pub correlation: CorrelationConfig,
    /// Extra assets for the classifier, merged over the built-in table
    pub assets: Vec<AssetEntry>,
    /// Extra stress scenarios, replacing built-ins with the same id
    pub scenarios: Vec<StressScenario>,
}

impl Config {
    /// Load configuration from JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref()).context("Failed to read config file")?;
        let mut config: Config =
            serde_json::from_str(&contents).context("Failed to parse config JSON")?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load from `path` when given, otherwise start from defaults
    pub fn load(path: Option<&str>) -> Result<Self> {
        match path {
            Some(p) => {
                let config = Self::from_file(p)?;
                info!("Loaded configuration from: {}", p);
                Ok(config)
            }
            None => {
                let mut config = Self::default();
                config.apply_env_overrides()?;
                info!("No configuration file given, using defaults");
                Ok(config)
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(bind) = std::env::var("RISK_ENGINE_BIND") {
            self.server.bind_addr = bind;
        }
        if let Ok(path) = std::env::var("RISK_ENGINE_WEIGHTS_PATH") {
            self.weights.path = path;
        }
        if let Ok(ttl) = std::env::var("RISK_ENGINE_WEIGHTS_TTL_SECS") {
            self.weights.ttl_secs = ttl
                .parse()
                .with_context(|| format!("Invalid RISK_ENGINE_WEIGHTS_TTL_SECS: {}", ttl))?;
        }
        Ok(())
    }

    /// Build the calculator bundle described by this configuration
    pub fn build_models(&self) -> Result<RiskModels> {
        let classifier = StaticAssetClassifier::default().with_entries(&self.assets);
        let correlation = self.correlation.build()?;

        Ok(RiskModels {
            diversification: self.model.diversification.clone(),
            var: self.model.var.clone(),
            hedging: self.model.hedging.clone(),
            scenarios: ScenarioRegistry::builtin().with_scenarios(&self.scenarios),
            classifier: Arc::new(classifier),
            correlation,
        })
    }

    /// Build the weight resolver reading the pipeline's output file
    pub fn build_resolver(&self) -> WeightResolver {
        WeightResolver::new(Arc::new(FileWeightSource::new(&self.weights.path)))
            .with_ttl(Duration::from_secs(self.weights.ttl_secs))
            .with_reload_timeout(Duration::from_secs(self.weights.reload_timeout_secs))
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind_addr: "127.0.0.1:8080".to_string(),
        }
    }
}

/// Ensemble weight table configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightsConfig {
    /// JSON file written by the backtest/report pipeline
    pub path: String,
    /// Minimum seconds between reloads
    pub ttl_secs: u64,
    /// Upper bound on a single reload
    pub reload_timeout_secs: u64,
    /// Load the table at startup instead of on first request
    pub preload: bool,
}

impl Default for WeightsConfig {
    fn default() -> Self {
        WeightsConfig {
            path: "results/ensemble_weights.json".to_string(),
            ttl_secs: 300,
            reload_timeout_secs: 5,
            preload: true,
        }
    }
}

/// Heuristic model constants
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub diversification: DiversificationParams,
    pub var: VarParams,
    pub hedging: HedgingParams,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationKind {
    #[default]
    Synthetic,
    Historical,
}

/// Correlation source selection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrelationConfig {
    pub source: CorrelationKind,
    /// CSV of per-symbol returns, required for `historical`
    pub returns_csv: Option<String>,
    pub min_observations: usize,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        CorrelationConfig {
            source: CorrelationKind::Synthetic,
            returns_csv: None,
            min_observations: 30,
        }
    }
}

impl CorrelationConfig {
    pub fn build(&self) -> Result<Arc<dyn CorrelationSource>> {
        match self.source {
            CorrelationKind::Synthetic => Ok(Arc::new(SyntheticPlaceholder)),
            CorrelationKind::Historical => {
                let path = self
                    .returns_csv
                    .as_deref()
                    .context("correlation.returns_csv is required for the historical source")?;
                let source = HistoricalReturns::from_csv(path)?
                    .with_min_observations(self.min_observations);
                Ok(Arc::new(source))
            }
        }
    }
}
