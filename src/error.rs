//! Error taxonomy for the risk engine
//!
//! Validation errors are raised once, at the portfolio normalizer or the
//! regime weight resolver, and propagated unchanged to the caller.

use thiserror::Error;

/// Errors produced by the risk calculators and the weight resolver
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RiskError {
    #[error("portfolio contains no positions")]
    EmptyPortfolio,

    #[error("invalid portfolio: {0}")]
    InvalidPortfolio(String),

    #[error("confidence level {0} is outside the supported range [50, 99.9]")]
    InvalidConfidenceLevel(f64),

    /// Non-fatal: the stress engine substitutes the default scenario
    #[error("unknown stress scenario '{0}'")]
    UnknownScenario(String),

    #[error("no strategy weights for market regime '{0}'")]
    UnknownRegime(String),

    #[error("weight table rejected: {0}")]
    CorruptWeightTable(String),

    #[error("weight table could not be loaded: {0}")]
    WeightTableLoad(String),
}

impl RiskError {
    /// Stable machine-readable code used in error response bodies
    pub fn code(&self) -> &'static str {
        match self {
            Self::EmptyPortfolio => "EMPTY_PORTFOLIO",
            Self::InvalidPortfolio(_) => "INVALID_PORTFOLIO",
            Self::InvalidConfidenceLevel(_) => "INVALID_CONFIDENCE_LEVEL",
            Self::UnknownScenario(_) => "UNKNOWN_SCENARIO",
            Self::UnknownRegime(_) => "UNKNOWN_REGIME",
            Self::CorruptWeightTable(_) => "CORRUPT_WEIGHT_TABLE",
            Self::WeightTableLoad(_) => "WEIGHT_TABLE_UNAVAILABLE",
        }
    }

    /// True for errors caused by caller input rather than engine state
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::EmptyPortfolio
                | Self::InvalidPortfolio(_)
                | Self::InvalidConfidenceLevel(_)
                | Self::UnknownScenario(_)
                | Self::UnknownRegime(_)
        )
    }
}

pub type RiskResult<T> = Result<T, RiskError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_distinct() {
        let errors = [
            RiskError::EmptyPortfolio,
            RiskError::InvalidPortfolio("x".into()),
            RiskError::InvalidConfidenceLevel(10.0),
            RiskError::UnknownScenario("x".into()),
            RiskError::UnknownRegime("x".into()),
            RiskError::CorruptWeightTable("x".into()),
            RiskError::WeightTableLoad("x".into()),
        ];
        let mut codes: Vec<_> = errors.iter().map(|e| e.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_client_error_classification() {
        assert!(RiskError::EmptyPortfolio.is_client_error());
        assert!(RiskError::UnknownRegime("bull".into()).is_client_error());
        assert!(!RiskError::CorruptWeightTable("sum".into()).is_client_error());
        assert!(!RiskError::WeightTableLoad("io".into()).is_client_error());
    }
}
