//! Sentinel Intel Library
//!
//! Signal intelligence core: ranks incoming sentiment-scored signals by
//! priority, detects pattern shifts against a trailing baseline, and adapts
//! alerting thresholds to sentiment drift.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                    sentinel-intel (Rust Service)                    │
//! │                              :4440                                  │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────┐      │
//! │  │  Baseline       │  │  Priority       │  │  Pattern Shift  │      │
//! │  │  Estimator      │  │  Scorer         │  │  Detector       │      │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────┘      │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────┐      │
//! │  │  Threshold      │  │  Analysis       │  │  Alert          │      │
//! │  │  Adapter        │  │  Orchestrator   │  │  Emitter        │      │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────┘      │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │  SignalStore: sentiment_logs · trending_topics · system_config ·    │
//! │               alerts                                                │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Concepts
//!
//! - **Baseline**: trailing 7-day mean sentiment
//! - **Drift**: current-window mean minus baseline
//! - **Pattern shift**: regional sentiment spike, emotion surge or emerging topic

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod aggregate;
pub mod alerts;
pub mod analysis;
pub mod baseline;
pub mod error;
pub mod patterns;
pub mod routes;
pub mod scheduler;
pub mod scoring;
pub mod store;
pub mod thresholds;
pub mod types;
pub mod vocabulary;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;

use sentinel_common::config::Config;

pub use analysis::SignalAnalyzer;
pub use error::IntelError;
pub use routes::build_router;
pub use scheduler::{AnalysisScheduler, SchedulerState};
pub use store::{SignalStore, SqliteStore};
pub use types::{
    AlertRecord, AnalysisSnapshot, IntelligenceMetrics, PatternShift, PatternType, Signal,
    ThreatLevel, ThresholdConfig, TrendingTopic, UrgencyLevel,
};

/// Shared service state
pub struct IntelState {
    pub config: Config,
    pub analyzer: Arc<SignalAnalyzer>,
    pub scheduler: Arc<AnalysisScheduler>,
}

impl IntelState {
    pub fn new(config: Config, store: Arc<dyn SignalStore>) -> std::result::Result<Self, IntelError> {
        let analyzer = Arc::new(SignalAnalyzer::from_config(store, &config.intel)?);
        let scheduler = Arc::new(AnalysisScheduler::new(
            &config.intel.schedule,
            analyzer.clone(),
        )?);
        Ok(Self {
            config,
            analyzer,
            scheduler,
        })
    }
}

/// Main signal intelligence service
pub struct IntelService {
    state: Arc<IntelState>,
}

impl IntelService {
    /// Validate the configuration and open the signal store.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let db_path = config.intel_db_path();
        let store = SqliteStore::open(&db_path)
            .with_context(|| format!("Failed to open signal store at {}", db_path.display()))?;

        let state = Arc::new(IntelState::new(config, Arc::new(store))?);
        Ok(Self { state })
    }

    pub fn state(&self) -> Arc<IntelState> {
        self.state.clone()
    }

    /// Start the scheduler and serve HTTP until a shutdown signal arrives.
    pub async fn start(self) -> Result<()> {
        let config = &self.state.config;
        let port = config.intel.port;
        let host = config.intel_host().to_string();

        let scheduler = self.state.scheduler.clone();
        let scheduler_handle = tokio::spawn(async move {
            scheduler.run().await;
        });

        let app = build_router(self.state.clone());

        let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
        tracing::info!(address = %addr, "Starting HTTP server");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        self.state.scheduler.stop().await;
        if let Err(e) = scheduler_handle.await {
            tracing::warn!(error = %e, "Scheduler task ended abnormally");
        }
        tracing::info!("Sentinel Intel stopped");

        Ok(())
    }
}

/// Resolves on Ctrl+C, or SIGTERM on unix.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = sigterm.recv() => tracing::info!("Received SIGTERM, shutting down"),
                    _ = tokio::signal::ctrl_c() => tracing::info!("Received SIGINT, shutting down"),
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "SIGTERM handler unavailable, waiting for Ctrl+C");
                if tokio::signal::ctrl_c().await.is_err() {
                    std::future::pending::<()>().await;
                }
            }
        }
    }
    #[cfg(not(unix))]
    {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutting down");
        } else {
            std::future::pending::<()>().await;
        }
    }
}
