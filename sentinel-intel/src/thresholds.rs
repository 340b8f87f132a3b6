//! Drift-driven adaptation of the global alerting thresholds.

use chrono::{DateTime, Utc};
use std::ops::RangeInclusive;
use std::sync::Arc;
use tracing::info;

use crate::error::{IntelError, Result};
use crate::store::{SignalStore, THRESHOLDS_KEY};
use crate::types::ThresholdConfig;

pub const URGENCY_RANGE: RangeInclusive<f64> = 0.5..=0.9;
pub const RELEVANCE_RANGE: RangeInclusive<f64> = 0.4..=0.8;
pub const SENSITIVITY_RANGE: RangeInclusive<f64> = 0.2..=0.5;

/// Multiplier applied to every threshold for a given drift.
///
/// Large swings tighten thresholds, a quiet period relaxes them. Zero drift
/// means nothing was observed and leaves them untouched.
pub fn adjustment_factor(drift: f64) -> f64 {
    let magnitude = drift.abs();
    if magnitude == 0.0 {
        1.0
    } else if magnitude > 0.5 {
        0.8
    } else if magnitude > 0.3 {
        0.9
    } else if magnitude < 0.1 {
        1.1
    } else {
        1.0
    }
}

fn clamp_to(value: f64, range: &RangeInclusive<f64>) -> f64 {
    value.clamp(*range.start(), *range.end())
}

/// Scale `current` by the drift factor and clamp into the safe ranges.
pub fn adapt(current: &ThresholdConfig, drift: f64, now: DateTime<Utc>) -> ThresholdConfig {
    let factor = adjustment_factor(drift);
    ThresholdConfig {
        urgency_threshold: clamp_to(current.urgency_threshold * factor, &URGENCY_RANGE),
        relevance_threshold: clamp_to(current.relevance_threshold * factor, &RELEVANCE_RANGE),
        pattern_sensitivity: clamp_to(current.pattern_sensitivity * factor, &SENSITIVITY_RANGE),
        last_updated: Some(now),
        drift_factor: factor,
    }
}

/// Reads and rewrites the persisted [`ThresholdConfig`].
pub struct ThresholdAdapter {
    store: Arc<dyn SignalStore>,
}

impl ThresholdAdapter {
    pub fn new(store: Arc<dyn SignalStore>) -> Self {
        Self { store }
    }

    /// Active thresholds, or the defaults when none are stored.
    pub async fn current(&self) -> Result<ThresholdConfig> {
        let Some(value) = self.store.get_config(THRESHOLDS_KEY).await? else {
            return Ok(ThresholdConfig::default());
        };

        Ok(serde_json::from_value(value)?)
    }

    pub async fn update(&self, drift: f64) -> Result<ThresholdConfig> {
        self.update_at(drift, Utc::now()).await
    }

    /// Adapt to `drift` and persist the result as the active configuration.
    pub async fn update_at(&self, drift: f64, now: DateTime<Utc>) -> Result<ThresholdConfig> {
        if !drift.is_finite() {
            return Err(IntelError::InvalidRequest(format!(
                "current_drift must be a finite number, got {}",
                drift
            )));
        }

        let current = self.current().await?;
        let updated = adapt(&current, drift, now);
        self.store
            .upsert_config(THRESHOLDS_KEY, &serde_json::to_value(&updated)?)
            .await?;

        info!(
            drift,
            factor = updated.drift_factor,
            urgency = updated.urgency_threshold,
            relevance = updated.relevance_threshold,
            sensitivity = updated.pattern_sensitivity,
            "Thresholds adapted"
        );
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;

    fn adapter() -> ThresholdAdapter {
        ThresholdAdapter::new(Arc::new(SqliteStore::open_in_memory().unwrap()))
    }

    #[test]
    fn test_adjustment_factor_bands() {
        assert_eq!(adjustment_factor(0.0), 1.0);
        assert_eq!(adjustment_factor(0.05), 1.1);
        assert_eq!(adjustment_factor(-0.05), 1.1);
        assert_eq!(adjustment_factor(0.1), 1.0);
        assert_eq!(adjustment_factor(0.3), 1.0);
        assert_eq!(adjustment_factor(0.31), 0.9);
        assert_eq!(adjustment_factor(-0.5), 0.9);
        assert_eq!(adjustment_factor(0.51), 0.8);
        assert_eq!(adjustment_factor(-1.2), 0.8);
    }

    #[test]
    fn test_adapt_clamps_into_safe_ranges() {
        let now = Utc::now();
        let mut config = ThresholdConfig::default();
        for _ in 0..20 {
            config = adapt(&config, 0.9, now);
        }
        assert_eq!(config.urgency_threshold, 0.5);
        assert_eq!(config.relevance_threshold, 0.4);
        assert_eq!(config.pattern_sensitivity, 0.2);

        for _ in 0..20 {
            config = adapt(&config, 0.01, now);
        }
        assert_eq!(config.urgency_threshold, 0.9);
        assert_eq!(config.relevance_threshold, 0.8);
        assert_eq!(config.pattern_sensitivity, 0.5);
        assert_eq!(config.drift_factor, 1.1);
    }

    #[tokio::test]
    async fn test_defaults_when_nothing_stored() {
        let current = adapter().current().await.unwrap();
        assert_eq!(current, ThresholdConfig::default());
    }

    #[tokio::test]
    async fn test_zero_drift_is_idempotent() {
        let adapter = adapter();
        let first = adapter.update(0.0).await.unwrap();
        let second = adapter.update(0.0).await.unwrap();

        for config in [&first, &second] {
            assert_eq!(config.urgency_threshold, 0.7);
            assert_eq!(config.relevance_threshold, 0.6);
            assert_eq!(config.pattern_sensitivity, 0.3);
            assert_eq!(config.drift_factor, 1.0);
            assert!(config.last_updated.is_some());
        }
    }

    #[tokio::test]
    async fn test_update_persists_and_compounds() {
        let adapter = adapter();
        let first = adapter.update(0.6).await.unwrap();
        assert!((first.urgency_threshold - 0.56).abs() < 1e-9);
        let stored = adapter.current().await.unwrap();
        assert!((stored.urgency_threshold - first.urgency_threshold).abs() < 1e-12);
        assert_eq!(stored.last_updated, first.last_updated);

        let second = adapter.update(0.4).await.unwrap();
        assert!((second.urgency_threshold - 0.504).abs() < 1e-9);
        assert!((second.pattern_sensitivity - 0.216).abs() < 1e-9);
        assert_eq!(second.drift_factor, 0.9);
    }

    #[tokio::test]
    async fn test_corrupt_stored_thresholds_fail_update() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let corrupt = serde_json::json!({ "urgency_threshold": "high" });
        store.upsert_config(THRESHOLDS_KEY, &corrupt).await.unwrap();

        let adapter = ThresholdAdapter::new(store.clone());
        let err = adapter.update(0.0).await.unwrap_err();
        assert!(matches!(err, IntelError::Serialization(_)));
        assert!(adapter.current().await.is_err());

        let untouched = store.get_config(THRESHOLDS_KEY).await.unwrap();
        assert_eq!(untouched, Some(corrupt));
    }

    #[tokio::test]
    async fn test_non_finite_drift_rejected() {
        let adapter = adapter();
        let err = adapter.update(f64::NAN).await.unwrap_err();
        assert!(matches!(err, IntelError::InvalidRequest(_)));
        assert_eq!(adapter.current().await.unwrap().last_updated, None);
    }
}
