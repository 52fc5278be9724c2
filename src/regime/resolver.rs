//! Regime weight resolver
//!
//! Serves strategy weights from an immutable [`WeightSnapshot`]. Readers
//! clone an `Arc` to the current snapshot and never see a half-written
//! table; a reload builds and validates a complete new snapshot before
//! swapping the pointer. Old snapshots are dropped when their last reader
//! finishes.
//!
//! Reload policy:
//! - at most one reload per TTL window, serialized by an async mutex
//! - the source is read on a blocking thread under a timeout
//! - a failed or rejected reload keeps the last-known-good snapshot and is
//!   retried on the next TTL tick
//! - unchanged content (same SHA-256 fingerprint) skips the swap

use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::table::{StrategyWeights, WeightTable};
use super::MarketRegime;
use crate::error::{RiskError, RiskResult};

pub const DEFAULT_TTL: Duration = Duration::from_secs(300);
pub const DEFAULT_RELOAD_TIMEOUT: Duration = Duration::from_secs(5);

/// Where weight tables come from
pub trait WeightSource: Send + Sync {
    /// Human-readable location for logs
    fn describe(&self) -> String;

    /// Raw table bytes; blocking I/O is allowed
    fn fetch(&self) -> RiskResult<Vec<u8>>;
}

/// JSON file regenerated by the backtest/report pipeline
#[derive(Debug, Clone)]
pub struct FileWeightSource {
    path: PathBuf,
}

impl FileWeightSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl WeightSource for FileWeightSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn fetch(&self) -> RiskResult<Vec<u8>> {
        std::fs::read(&self.path).map_err(|e| {
            RiskError::WeightTableLoad(format!("failed to read {}: {}", self.path.display(), e))
        })
    }
}

/// In-memory source whose content can be replaced
#[derive(Debug, Default)]
pub struct StaticWeightSource {
    bytes: Mutex<Vec<u8>>,
}

impl StaticWeightSource {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: Mutex::new(bytes.into()),
        }
    }

    pub fn replace(&self, bytes: impl Into<Vec<u8>>) {
        *self.bytes.lock().unwrap_or_else(PoisonError::into_inner) = bytes.into();
    }
}

impl WeightSource for StaticWeightSource {
    fn describe(&self) -> String {
        "in-memory".to_string()
    }

    fn fetch(&self) -> RiskResult<Vec<u8>> {
        Ok(self.bytes.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }
}

/// A fully validated table plus provenance
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightSnapshot {
    pub table: WeightTable,
    pub fingerprint: String,
    pub loaded_at: DateTime<Utc>,
    pub source: String,
}

pub struct WeightResolver {
    source: Arc<dyn WeightSource>,
    current: ArcSwapOption<WeightSnapshot>,
    next_refresh: Mutex<Option<Instant>>,
    reload_gate: tokio::sync::Mutex<()>,
    ttl: Duration,
    reload_timeout: Duration,
}

impl std::fmt::Debug for WeightResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeightResolver")
            .field("source", &self.source.describe())
            .field("ttl", &self.ttl)
            .field("reload_timeout", &self.reload_timeout)
            .finish()
    }
}

impl WeightResolver {
    pub fn new(source: Arc<dyn WeightSource>) -> Self {
        Self {
            source,
            current: ArcSwapOption::empty(),
            next_refresh: Mutex::new(None),
            reload_gate: tokio::sync::Mutex::new(()),
            ttl: DEFAULT_TTL,
            reload_timeout: DEFAULT_RELOAD_TIMEOUT,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_reload_timeout(mut self, timeout: Duration) -> Self {
        self.reload_timeout = timeout;
        self
    }

    /// Current snapshot without triggering a reload
    pub fn current(&self) -> Option<Arc<WeightSnapshot>> {
        self.current.load_full()
    }

    pub fn loaded_at(&self) -> Option<DateTime<Utc>> {
        self.current().map(|s| s.loaded_at)
    }

    fn refresh_due(&self) -> bool {
        match *self.next_refresh.lock().unwrap_or_else(PoisonError::into_inner) {
            Some(at) => Instant::now() >= at,
            None => true,
        }
    }

    fn schedule_next_refresh(&self) {
        *self.next_refresh.lock().unwrap_or_else(PoisonError::into_inner) =
            Some(Instant::now() + self.ttl);
    }

    /// Snapshot to serve, reloading first when the TTL has expired
    pub async fn snapshot(&self) -> RiskResult<Arc<WeightSnapshot>> {
        if !self.refresh_due() {
            if let Some(snapshot) = self.current() {
                return Ok(snapshot);
            }
        }

        let _gate = self.reload_gate.lock().await;

        // Another request may have reloaded while we waited
        if !self.refresh_due() {
            if let Some(snapshot) = self.current() {
                return Ok(snapshot);
            }
        }

        match self.reload_locked().await {
            Ok(snapshot) => Ok(snapshot),
            Err(e) => match self.current() {
                Some(last_good) => {
                    warn!(
                        "Weight table reload failed, serving snapshot from {}: {}",
                        last_good.loaded_at, e
                    );
                    Ok(last_good)
                }
                None => Err(e),
            },
        }
    }

    /// Force a reload now; the previous snapshot is kept on failure
    pub async fn refresh(&self) -> RiskResult<Arc<WeightSnapshot>> {
        let _gate = self.reload_gate.lock().await;
        self.reload_locked().await
    }

    async fn reload_locked(&self) -> RiskResult<Arc<WeightSnapshot>> {
        self.schedule_next_refresh();

        let source = Arc::clone(&self.source);
        let fetched =
            tokio::time::timeout(self.reload_timeout, tokio::task::spawn_blocking(move || source.fetch()))
                .await;
        let bytes = match fetched {
            Err(_) => {
                return Err(RiskError::WeightTableLoad(format!(
                    "reading {} timed out after {:?}",
                    self.source.describe(),
                    self.reload_timeout
                )))
            }
            Ok(Err(join_err)) => {
                return Err(RiskError::WeightTableLoad(format!(
                    "reload task failed: {}",
                    join_err
                )))
            }
            Ok(Ok(result)) => result?,
        };

        let fingerprint = hex::encode(Sha256::digest(&bytes));
        if let Some(current) = self.current() {
            if current.fingerprint == fingerprint {
                debug!("Weight table unchanged ({})", &fingerprint[..12]);
                return Ok(current);
            }
        }

        let table = WeightTable::from_slice(&bytes).inspect_err(|e| {
            error!("Rejected weight table from {}: {}", self.source.describe(), e);
        })?;

        let snapshot = Arc::new(WeightSnapshot {
            table,
            fingerprint,
            loaded_at: Utc::now(),
            source: self.source.describe(),
        });
        self.current.store(Some(Arc::clone(&snapshot)));

        info!(
            "Loaded weight table from {} ({} regimes, fingerprint {})",
            snapshot.source,
            snapshot.table.len(),
            &snapshot.fingerprint[..12]
        );
        Ok(snapshot)
    }

    /// Weights for a regime label
    ///
    /// Labels outside the regime enumeration and regimes missing from the
    /// table both fail with `UnknownRegime`; the caller decides the fallback.
    pub async fn resolve(&self, label: &str) -> RiskResult<StrategyWeights> {
        let regime: MarketRegime = label.parse()?;
        let snapshot = self.snapshot().await?;
        snapshot.table.weights_for(regime)
    }

    /// Reload on every TTL tick in the background
    pub fn spawn_refresh_task(self: &Arc<Self>) -> JoinHandle<()> {
        let resolver = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(resolver.ttl.max(Duration::from_secs(1)));
            loop {
                ticker.tick().await;
                if let Err(e) = resolver.snapshot().await {
                    warn!("Background weight refresh failed: {}", e);
                }
            }
        })
    }
}
