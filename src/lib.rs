//! Portfolio Risk Engine
//!
//! Heuristic risk analytics for crypto portfolios (diversification and
//! risk scoring, Value-at-Risk, scenario stress tests, hedging advice) and
//! regime-weighted strategy allocation backed by a hot-reloaded weight
//! table, exposed over HTTP.

pub mod config;
pub mod error;
pub mod portfolio;
pub mod regime;
pub mod risk;
pub mod server;
pub mod types;
pub mod wire;

pub use config::Config;
pub use error::{RiskError, RiskResult};
pub use portfolio::Portfolio;
pub use regime::{MarketRegime, WeightResolver, WeightTable};
pub use risk::{RiskModels, RiskReport};
pub use types::*;
