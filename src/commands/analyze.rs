//! Analyze command implementation
//!
//! Runs the full risk report for a portfolio file and prints it, either as
//! a console summary or as the same JSON the HTTP service returns.

use anyhow::{Context, Result};
use portfolio_risk_engine::{Config, Portfolio, RawPosition};
use serde::Deserialize;
use std::fs;
use tracing::{debug, info};

/// Accepts `{"positions": [...]}` or a bare array of positions
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PortfolioFile {
    Wrapped { positions: Vec<RawPosition> },
    Bare(Vec<RawPosition>),
}

impl PortfolioFile {
    fn into_positions(self) -> Vec<RawPosition> {
        match self {
            PortfolioFile::Wrapped { positions } | PortfolioFile::Bare(positions) => positions,
        }
    }
}

pub fn run(
    portfolio_path: String,
    config_path: Option<String>,
    confidence: f64,
    scenario: Option<String>,
    json: bool,
) -> Result<()> {
    info!("Starting risk analysis");

    let config = Config::load(config_path.as_deref())?;
    let models = config.build_models()?;

    let contents = fs::read_to_string(&portfolio_path)
        .with_context(|| format!("Failed to read portfolio file: {}", portfolio_path))?;
    let file: PortfolioFile =
        serde_json::from_str(&contents).context("Failed to parse portfolio JSON")?;
    let portfolio = Portfolio::from_raw(&file.into_positions())?;
    info!(
        "Loaded {} positions worth ${:.2}",
        portfolio.len(),
        portfolio.total_value()
    );

    let report = models.report(&portfolio, confidence)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let profile = &report.profile;
    println!("\n{}", "=".repeat(60));
    println!("PORTFOLIO RISK REPORT");
    println!("{}", "=".repeat(60));
    println!("Total Value:        ${:.2}", portfolio.total_value());
    println!("Positions:          {}", profile.position_count);
    println!("Diversification:    {:.1}", profile.diversification_score);
    println!("Risk Score:         {:.1} ({})", profile.risk_score, profile.risk_level());
    println!(
        "Forecast:           short term {}, medium term {}",
        profile.forecast.short_term, profile.forecast.medium_term
    );
    println!("Correlation Source: {}", profile.correlation_source);
    if let Some(avg) = profile.average_correlation {
        println!("Avg Correlation:    {:.2}", avg);
    }

    println!("\nAllocation");
    println!("{}", "-".repeat(60));
    for position in portfolio.positions() {
        let class = profile
            .risk_by_asset
            .get(position.symbol.as_str())
            .map(|r| r.asset_class.as_str())
            .unwrap_or("-");
        println!(
            "  {:<12} {:<12} ${:>14.2} {:>7.2}%",
            position.symbol.as_str(),
            class,
            position.value_usd,
            position.allocation_pct
        );
    }

    let var = &report.value_at_risk;
    println!("\nValue at Risk ({:.1}% confidence)", var.confidence_level);
    println!("{}", "-".repeat(60));
    for (label, estimate) in [
        ("Daily", &var.horizons.daily),
        ("Weekly", &var.horizons.weekly),
        ("Monthly", &var.horizons.monthly),
    ] {
        println!(
            "  {:<10} {:>7.2}%  ${:>14.2}",
            label, estimate.percent, estimate.amount_usd
        );
    }

    println!("\nStress Tests");
    println!("{}", "-".repeat(60));
    let stress_tests: Vec<_> = match scenario.as_deref() {
        Some(id) => vec![models.stress_test(&portfolio, id)],
        None => report.stress_tests.clone(),
    };
    for result in &stress_tests {
        debug!("{}: {}", result.scenario_id, result.description);
        println!(
            "  {:<18} {:>8.2}%  impact ${:>14.2}  projected ${:>14.2}",
            result.scenario_id,
            result.total_impact_pct,
            result.total_impact_amount,
            result.projected_value
        );
    }

    println!("\nHedging ({} risk)", report.hedging.current_risk_level);
    println!("{}", "-".repeat(60));
    for rec in &report.hedging.recommendations {
        println!("  - {}", rec.description);
        println!(
            "    cost ~${:.2} ({}), complexity {:?}",
            rec.cost_estimate_usd, rec.cost_estimate_label, rec.complexity
        );
    }
    println!("\n{}", report.hedging.disclaimer);
    println!("{}", "=".repeat(60));

    Ok(())
}
