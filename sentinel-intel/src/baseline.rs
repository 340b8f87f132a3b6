//! Trailing-window baseline sentiment.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::debug;

use crate::error::Result;
use crate::store::SignalStore;

/// Default trailing window for the baseline mean.
pub const DEFAULT_BASELINE_DAYS: i64 = 7;

/// Mean sentiment over a trailing window, the reference point for drift.
pub struct BaselineEstimator {
    store: Arc<dyn SignalStore>,
    window_days: i64,
}

impl BaselineEstimator {
    pub fn new(store: Arc<dyn SignalStore>, window_days: i64) -> Self {
        Self { store, window_days }
    }

    pub fn window_days(&self) -> i64 {
        self.window_days
    }

    /// Baseline as of now.
    pub async fn estimate(&self) -> Result<f64> {
        self.estimate_at(Utc::now()).await
    }

    /// Mean of all non-null scores created in `[now - window, ...)`; 0 when empty.
    pub async fn estimate_at(&self, now: DateTime<Utc>) -> Result<f64> {
        let since = now - Duration::days(self.window_days);
        let baseline = self.store.mean_sentiment_since(since).await?.unwrap_or(0.0);
        debug!(baseline, window_days = self.window_days, "Computed baseline sentiment");
        Ok(baseline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;
    use crate::types::Signal;

    #[tokio::test]
    async fn test_empty_window_is_neutral() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let estimator = BaselineEstimator::new(store, DEFAULT_BASELINE_DAYS);
        assert_eq!(estimator.estimate().await.unwrap(), 0.0);
    }

    #[tokio::test]
    async fn test_only_window_rows_count() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let now = Utc::now();
        store
            .insert_signals(&[
                Signal::new("a", "a", "x", now - Duration::days(1), -0.6),
                Signal::new("b", "b", "x", now - Duration::days(3), 0.0),
                Signal::new("c", "c", "x", now - Duration::days(10), 0.9),
            ])
            .await
            .unwrap();

        let estimator = BaselineEstimator::new(store.clone(), 7);
        let baseline = estimator.estimate_at(now).await.unwrap();
        assert!((baseline + 0.3).abs() < 1e-9);

        let wide = BaselineEstimator::new(store, 30);
        let baseline = wide.estimate_at(now).await.unwrap();
        assert!((baseline - 0.1).abs() < 1e-9);
    }
}
