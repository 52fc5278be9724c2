//! Portfolio risk engine - main entry point
//!
//! This binary provides three subcommands:
//! - serve: Run the HTTP risk service
//! - analyze: Print a full risk report for a portfolio file
//! - weights: Validate and inspect an ensemble weight table

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "risk-engine")]
#[command(about = "Portfolio risk analytics and regime-weighted strategy allocation", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP risk service
    Serve {
        /// Path to configuration file
        #[arg(short, long)]
        config: Option<String>,

        /// Bind address (overrides config file)
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Analyze a portfolio file
    Analyze {
        /// Portfolio JSON: {"positions": [{"symbol", "value"}]} or a bare array
        #[arg(short, long)]
        portfolio: String,

        /// Path to configuration file
        #[arg(short, long)]
        config: Option<String>,

        /// VaR confidence level in percent
        #[arg(long, default_value = "95")]
        confidence: f64,

        /// Only show this stress scenario
        #[arg(short, long)]
        scenario: Option<String>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate and print an ensemble weight table
    Weights {
        /// Weight table JSON
        #[arg(short, long, default_value = "results/ensemble_weights.json")]
        file: String,

        /// Only show this regime
        #[arg(short, long)]
        regime: Option<String>,
    },
}

fn setup_logging(verbose: bool, command_name: &str, file_only: bool) -> Result<()> {
    // Create logs directory
    std::fs::create_dir_all("logs")?;

    // Create log file with naming pattern: {command}_{date}.log
    let log_filename = format!(
        "{}_{}.log",
        command_name,
        chrono::Local::now().format("%Y-%m-%d_%H-%M-%S")
    );
    let log_path = PathBuf::from("logs").join(&log_filename);

    // Set log level - filter out noisy external crates
    let level = if verbose { "debug" } else { "info" };
    let filter_str = format!(
        "{},hyper=warn,hyper_util=warn,axum=warn",
        level
    );
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    // File appender
    let file_appender = tracing_appender::rolling::never("logs", &log_filename);

    if file_only {
        // Report output goes to stdout, so keep the console free of log lines
        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(file_appender)
            .with_target(true)
            .with_line_number(true)
            .with_file(true)
            .with_ansi(false);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(file_layer)
            .init();
    } else {
        // Console layer: timestamp, level, target, file:line
        let console_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_line_number(true)
            .with_file(true)
            .with_ansi(true);

        // File layer - same format but without ANSI colors
        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(file_appender)
            .with_target(true)
            .with_line_number(true)
            .with_file(true)
            .with_ansi(false);

        // Initialize subscriber with both console and file
        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .with(file_layer)
            .init();

        info!("Logging initialized");
        info!("Log file: {}", log_path.display());
    }

    Ok(())
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    // Determine command name and whether to use file-only logging
    let (command_name, file_only) = match &cli.command {
        Commands::Serve { .. } => ("serve", false),
        Commands::Analyze { json, .. } => ("analyze", *json),
        Commands::Weights { .. } => ("weights", false),
    };

    // Setup logging
    setup_logging(cli.verbose, command_name, file_only)?;

    // Execute command
    match cli.command {
        Commands::Serve { config, bind } => commands::serve::run(config, bind),

        Commands::Analyze {
            portfolio,
            config,
            confidence,
            scenario,
            json,
        } => commands::analyze::run(portfolio, config, confidence, scenario, json),

        Commands::Weights { file, regime } => commands::weights::run(file, regime),
    }
}
