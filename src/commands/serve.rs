//! Serve command implementation

use anyhow::{Context, Result};
use portfolio_risk_engine::server::{self, AppState};
use portfolio_risk_engine::Config;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

pub fn run(config_path: Option<String>, bind_override: Option<String>) -> Result<()> {
    let mut config = Config::load(config_path.as_deref())?;

    if let Some(bind) = bind_override {
        info!("Overriding bind address to: {}", bind);
        config.server.bind_addr = bind;
    }

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    runtime.block_on(serve(config))
}

async fn serve(config: Config) -> Result<()> {
    let models = config.build_models()?;
    info!(
        "Risk models ready: {} stress scenarios, correlation source '{}'",
        models.scenarios.scenarios().len(),
        models.correlation.name()
    );

    let resolver = Arc::new(config.build_resolver());
    info!(
        "Weight table: {} (ttl {}s)",
        config.weights.path, config.weights.ttl_secs
    );

    if config.weights.preload {
        match resolver.refresh().await {
            Ok(snapshot) => info!(
                "Loaded {} regimes (fingerprint {})",
                snapshot.table.len(),
                snapshot.fingerprint
            ),
            Err(e) => warn!("Weight table unavailable at startup: {}", e),
        }
    }
    let _refresher = resolver.spawn_refresh_task();

    let state = AppState {
        models: Arc::new(models),
        weights: resolver,
    };

    let listener = TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_addr))?;

    server::serve(listener, state).await
}
