//! Storage abstraction for the signal intelligence core.
//!
//! The core never owns its data: it reads the sentiment log, the trending
//! topics table and a small key/value config store, and writes back snapshots,
//! thresholds and alerts. `SignalStore` is that read/write contract;
//! `SqliteStore` is the bundled implementation.

mod sqlite;

pub use sqlite::SqliteStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::types::{AlertRecord, RegionalObservation, Signal, TrendingTopic};

/// Config key holding the adaptive thresholds.
pub const THRESHOLDS_KEY: &str = "signal_intelligence_thresholds";

/// Config key holding the latest analysis snapshot.
pub const SNAPSHOT_KEY: &str = "signal_intelligence_results";

/// Generic query/upsert interface over the external store.
///
/// Time ranges are half-open: `since` inclusive, `until` exclusive. An absent
/// `until` leaves the range open-ended.
#[async_trait]
pub trait SignalStore: Send + Sync {
    /// Signals created at or after `since`, most recent first, at most `limit`.
    async fn recent_signals(&self, since: DateTime<Utc>, limit: usize) -> Result<Vec<Signal>>;

    /// Mean of non-null sentiment scores created at or after `since`.
    /// `None` when the window holds no scored rows.
    async fn mean_sentiment_since(&self, since: DateTime<Utc>) -> Result<Option<f64>>;

    /// Region-tagged, scored signals in `[since, until)`.
    async fn regional_sentiment(
        &self,
        since: DateTime<Utc>,
        until: Option<DateTime<Utc>>,
    ) -> Result<Vec<RegionalObservation>>;

    /// Emotion tag lists of signals with a non-null tone in `[since, until)`.
    async fn emotion_tones(
        &self,
        since: DateTime<Utc>,
        until: Option<DateTime<Utc>>,
    ) -> Result<Vec<Vec<String>>>;

    /// Topics first detected at or after `since`, by volume descending.
    async fn emerging_topics(&self, since: DateTime<Utc>, limit: usize)
        -> Result<Vec<TrendingTopic>>;

    async fn get_config(&self, key: &str) -> Result<Option<serde_json::Value>>;

    /// Insert or overwrite the value stored under `key`.
    async fn upsert_config(&self, key: &str, value: &serde_json::Value) -> Result<()>;

    async fn insert_alert(&self, alert: &AlertRecord) -> Result<()>;
}
