//! Portfolio risk calculators
//!
//! Every calculator is a pure function of a validated [`Portfolio`] and its
//! parameters. [`RiskModels`] bundles the parameters and capabilities built
//! at startup so request handlers only pass the portfolio.

pub mod classifier;
pub mod correlation;
pub mod diversification;
pub mod hedging;
pub mod stress;
pub mod var;

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

pub use classifier::{AssetClassifier, AssetProfile, StaticAssetClassifier};
pub use correlation::{CorrelationMatrix, CorrelationSource, HistoricalReturns, SyntheticPlaceholder};
pub use diversification::{DiversificationParams, RiskProfile};
pub use hedging::{HedgingAdvice, HedgingParams, HedgingRecommendation};
pub use stress::{ScenarioRegistry, StressScenario, StressTestResult};
pub use var::{VarParams, VarResult};

use crate::error::RiskResult;
use crate::portfolio::Portfolio;

/// Confidence levels reported in the VaR ladder of a full report
pub const REPORT_CONFIDENCE_LEVELS: [f64; 3] = [90.0, 95.0, 99.0];

/// Parameters and capabilities shared by all requests
#[derive(Clone)]
pub struct RiskModels {
    pub diversification: DiversificationParams,
    pub var: VarParams,
    pub hedging: HedgingParams,
    pub scenarios: ScenarioRegistry,
    pub classifier: Arc<dyn AssetClassifier>,
    pub correlation: Arc<dyn CorrelationSource>,
}

impl Default for RiskModels {
    fn default() -> Self {
        Self {
            diversification: DiversificationParams::default(),
            var: VarParams::default(),
            hedging: HedgingParams::default(),
            scenarios: ScenarioRegistry::builtin(),
            classifier: Arc::new(StaticAssetClassifier::default()),
            correlation: Arc::new(SyntheticPlaceholder),
        }
    }
}

impl std::fmt::Debug for RiskModels {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RiskModels")
            .field("diversification", &self.diversification)
            .field("var", &self.var)
            .field("hedging", &self.hedging)
            .field("scenarios", &self.scenarios.scenarios().len())
            .field("correlation", &self.correlation.name())
            .finish()
    }
}

impl RiskModels {
    pub fn with_correlation_source(mut self, source: Arc<dyn CorrelationSource>) -> Self {
        self.correlation = source;
        self
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn AssetClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn profile(&self, portfolio: &Portfolio) -> RiskProfile {
        diversification::analyze(
            portfolio,
            &self.diversification,
            self.correlation.as_ref(),
            self.classifier.as_ref(),
        )
    }

    pub fn value_at_risk(&self, portfolio: &Portfolio, confidence_level: f64) -> RiskResult<VarResult> {
        var::calculate(portfolio, confidence_level, &self.var)
    }

    pub fn stress_test(&self, portfolio: &Portfolio, scenario_id: &str) -> StressTestResult {
        stress::run(portfolio, scenario_id, &self.scenarios, self.classifier.as_ref())
    }

    pub fn hedging(&self, portfolio: &Portfolio) -> HedgingAdvice {
        let profile = self.profile(portfolio);
        hedging::advise(&profile, portfolio, &self.hedging)
    }

    /// Run every calculator for one portfolio
    ///
    /// The calculators share no state, so they run in parallel on the rayon
    /// pool. The confidence level is validated before any work starts.
    pub fn report(&self, portfolio: &Portfolio, confidence_level: f64) -> RiskResult<RiskReport> {
        var::validate_confidence(confidence_level)?;

        let ((profile, var_result), (var_ladder, stress_tests)) = rayon::join(
            || {
                rayon::join(
                    || self.profile(portfolio),
                    || self.value_at_risk(portfolio, confidence_level),
                )
            },
            || {
                rayon::join(
                    || var::ladder(portfolio, &REPORT_CONFIDENCE_LEVELS, &self.var),
                    || stress::run_all(portfolio, &self.scenarios, self.classifier.as_ref()),
                )
            },
        );

        let hedging = hedging::advise(&profile, portfolio, &self.hedging);

        Ok(RiskReport {
            generated_at: Utc::now(),
            portfolio: portfolio.clone(),
            profile,
            value_at_risk: var_result?,
            var_ladder: var_ladder?,
            stress_tests,
            hedging,
        })
    }
}

/// Every analysis for one portfolio
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskReport {
    pub generated_at: DateTime<Utc>,
    pub portfolio: Portfolio,
    pub profile: RiskProfile,
    pub value_at_risk: VarResult,
    pub var_ladder: Vec<VarResult>,
    pub stress_tests: Vec<StressTestResult>,
    pub hedging: HedgingAdvice,
}
