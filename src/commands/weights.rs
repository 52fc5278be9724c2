//! Weights command implementation

use anyhow::{Context, Result};
use portfolio_risk_engine::{MarketRegime, WeightTable};
use std::fs;
use tracing::info;

pub fn run(file: String, regime: Option<String>) -> Result<()> {
    let bytes = fs::read(&file).with_context(|| format!("Failed to read weight table: {}", file))?;
    let table = WeightTable::from_slice(&bytes)?;
    info!("Weight table {} is valid: {} regimes", file, table.len());

    let regimes: Vec<MarketRegime> = match regime {
        Some(label) => vec![label.parse()?],
        None => table.regimes().filter_map(|r| r.parse().ok()).collect(),
    };

    println!("\n{}", "=".repeat(60));
    println!("ENSEMBLE WEIGHTS: {}", file);
    println!("{}", "=".repeat(60));

    for regime in regimes {
        let resolved = table.weights_for(regime)?;
        println!("\n{}", regime);
        println!("{}", "-".repeat(60));
        for (strategy, weight) in &resolved.weights {
            println!("  {:<30} {:>8.2}%", strategy, weight * 100.0);
        }
    }
    println!("{}", "=".repeat(60));

    Ok(())
}
