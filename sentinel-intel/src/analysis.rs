//! Analysis orchestration.
//!
//! One run is strictly sequential:
//!
//! 1. Fetch the recent signal window (most recent first, capped)
//! 2. Estimate the trailing baseline
//! 3. Compute current mean sentiment and drift
//! 4. Score and annotate every fetched signal
//! 5. Rank and keep the top N
//! 6. Detect pattern shifts
//! 7. Assemble metrics
//! 8. Persist the snapshot (overwrite by key)
//!
//! Any store failure before the snapshot write aborts the run, so a failed run
//! never leaves a partial snapshot behind.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

use sentinel_common::config::{AnalysisConfig, IntelConfig};

use crate::aggregate::GroupStats;
use crate::alerts::AlertEmitter;
use crate::baseline::BaselineEstimator;
use crate::error::{IntelError, Result};
use crate::patterns::PatternShiftDetector;
use crate::scoring::PriorityScorer;
use crate::store::{SignalStore, SNAPSHOT_KEY};
use crate::thresholds::ThresholdAdapter;
use crate::types::{
    AlertRecord, AnalysisSnapshot, IntelligenceMetrics, Signal, ThresholdConfig, UrgencyLevel,
};

/// Orchestrates analysis runs and the standalone alert/threshold entry points.
pub struct SignalAnalyzer {
    store: Arc<dyn SignalStore>,
    scorer: PriorityScorer,
    baseline: BaselineEstimator,
    detector: PatternShiftDetector,
    thresholds: ThresholdAdapter,
    alerts: AlertEmitter,
    config: AnalysisConfig,
    /// Lowest urgency pushed to alerts after a run; `None` disables auto-alerting
    auto_alert: Option<UrgencyLevel>,
    use_adaptive_thresholds: bool,
}

impl SignalAnalyzer {
    /// Analyzer with default windows, no auto-alerting and fixed thresholds.
    pub fn new(store: Arc<dyn SignalStore>) -> Self {
        Self::with_config(store, AnalysisConfig::default())
    }

    pub fn with_config(store: Arc<dyn SignalStore>, config: AnalysisConfig) -> Self {
        Self {
            scorer: PriorityScorer::default(),
            baseline: BaselineEstimator::new(store.clone(), config.baseline_days),
            detector: PatternShiftDetector::new(store.clone()),
            thresholds: ThresholdAdapter::new(store.clone()),
            alerts: AlertEmitter::new(store.clone()),
            store,
            config,
            auto_alert: None,
            use_adaptive_thresholds: false,
        }
    }

    /// Build from the service configuration.
    pub fn from_config(store: Arc<dyn SignalStore>, config: &IntelConfig) -> Result<Self> {
        let auto_alert = if config.auto_alert.enabled {
            let level = config
                .auto_alert
                .min_urgency
                .parse::<UrgencyLevel>()
                .map_err(|e| IntelError::Config(sentinel_common::Error::Config(e)))?;
            Some(level)
        } else {
            None
        };

        Ok(Self::with_config(store, config.analysis.clone())
            .with_auto_alert(auto_alert)
            .with_adaptive_thresholds(config.use_adaptive_thresholds))
    }

    pub fn with_auto_alert(mut self, min_urgency: Option<UrgencyLevel>) -> Self {
        self.auto_alert = min_urgency;
        self
    }

    pub fn with_adaptive_thresholds(mut self, enabled: bool) -> Self {
        self.use_adaptive_thresholds = enabled;
        self
    }

    pub fn with_scorer(mut self, scorer: PriorityScorer) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub async fn analyze(&self) -> Result<AnalysisSnapshot> {
        self.analyze_at(Utc::now()).await
    }

    /// Run the full pipeline as of `now`.
    pub async fn analyze_at(&self, now: DateTime<Utc>) -> Result<AnalysisSnapshot> {
        let run_id = uuid::Uuid::new_v4().to_string();
        let since = now - Duration::hours(self.config.recent_window_hours);

        let mut signals = self
            .store
            .recent_signals(since, self.config.fetch_limit)
            .await?;
        let baseline = self.baseline.estimate_at(now).await?;

        let current_mean = GroupStats::from_values(signals.iter().map(|s| s.sentiment_score))
            .mean()
            .unwrap_or(0.0);
        let drift = current_mean - baseline;

        for signal in &mut signals {
            self.scorer
                .annotate(signal, baseline, self.config.spike_threshold);
        }

        let in_effect = self.thresholds_in_effect().await?;
        let high_priority_signals = signals
            .iter()
            .filter(|s| s.priority_score.unwrap_or(0.0) >= in_effect.urgency_threshold)
            .count();
        let total_signals_processed = signals.len();

        // stable: ties keep fetch order
        signals.sort_by(|a, b| {
            let a = a.priority_score.unwrap_or(0.0);
            let b = b.priority_score.unwrap_or(0.0);
            b.total_cmp(&a)
        });
        signals.truncate(self.config.top_n);

        let pattern_shifts = self.detector.detect(now).await;

        let snapshot = AnalysisSnapshot {
            run_id,
            intelligence_metrics: IntelligenceMetrics {
                total_signals_processed,
                high_priority_signals,
                pattern_shifts_detected: pattern_shifts.len(),
                baseline_sentiment: baseline,
                current_sentiment_drift: drift,
                urgency_threshold: in_effect.urgency_threshold,
                relevance_threshold: in_effect.relevance_threshold,
            },
            top_signals: signals,
            pattern_shifts,
            analysis_timestamp: now,
        };

        self.store
            .upsert_config(SNAPSHOT_KEY, &serde_json::to_value(&snapshot)?)
            .await?;

        info!(
            run_id = %snapshot.run_id,
            processed = total_signals_processed,
            high_priority = high_priority_signals,
            shifts = snapshot.pattern_shifts.len(),
            baseline,
            drift,
            "Analysis run completed"
        );

        if let Some(min_urgency) = self.auto_alert {
            match self
                .alerts
                .emit_qualifying(&snapshot.top_signals, min_urgency)
                .await
            {
                Ok(count) => debug!(run_id = %snapshot.run_id, count, "Auto alerts emitted"),
                Err(e) => warn!(run_id = %snapshot.run_id, error = %e, "Auto alert emission failed"),
            }
        }

        Ok(snapshot)
    }

    /// The thresholds this run reports and counts against.
    async fn thresholds_in_effect(&self) -> Result<ThresholdConfig> {
        if self.use_adaptive_thresholds {
            self.thresholds.current().await
        } else {
            Ok(ThresholdConfig::default())
        }
    }

    /// The last persisted snapshot, if any run has completed.
    pub async fn latest_snapshot(&self) -> Result<Option<AnalysisSnapshot>> {
        match self.store.get_config(SNAPSHOT_KEY).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Insert one alert summarizing `signal`.
    ///
    /// A signal without derived fields is scored against the current baseline first.
    pub async fn push_to_alerts(&self, signal: &Signal) -> Result<AlertRecord> {
        if signal.is_scored() {
            return self.alerts.emit(signal).await;
        }

        let baseline = self.baseline.estimate().await?;
        let mut scored = signal.clone();
        self.scorer
            .annotate(&mut scored, baseline, self.config.spike_threshold);
        self.alerts.emit(&scored).await
    }

    /// Adapt and persist thresholds for an explicit drift value.
    pub async fn update_thresholds(&self, current_drift: f64) -> Result<ThresholdConfig> {
        self.thresholds.update(current_drift).await
    }

    pub async fn current_thresholds(&self) -> Result<ThresholdConfig> {
        self.thresholds.current().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;
    use crate::types::ThreatLevel;

    fn setup() -> (Arc<SqliteStore>, SignalAnalyzer) {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let analyzer = SignalAnalyzer::new(store.clone());
        (store, analyzer)
    }

    #[tokio::test]
    async fn test_empty_window_reports_negative_baseline_drift() {
        let (store, analyzer) = setup();
        let now = Utc::now();
        store
            .insert_signal(&Signal::new("old", "old", "x", now - Duration::days(2), 0.4))
            .await
            .unwrap();

        let snapshot = analyzer.analyze_at(now).await.unwrap();
        let m = &snapshot.intelligence_metrics;
        assert_eq!(m.total_signals_processed, 0);
        assert_eq!(m.high_priority_signals, 0);
        assert!((m.baseline_sentiment - 0.4).abs() < 1e-9);
        assert!((m.current_sentiment_drift + 0.4).abs() < 1e-9);
        assert!(snapshot.top_signals.is_empty());
    }

    #[tokio::test]
    async fn test_top_n_and_high_priority_count() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let analyzer = SignalAnalyzer::with_config(
            store.clone(),
            AnalysisConfig {
                top_n: 2,
                ..AnalysisConfig::default()
            },
        );
        let now = Utc::now();
        let signals: Vec<Signal> = [
            ("a", ThreatLevel::Low),
            ("b", ThreatLevel::Critical),
            ("c", ThreatLevel::Medium),
        ]
        .into_iter()
        .enumerate()
        .map(|(i, (id, level))| {
            Signal::new(id, id, "x", now - Duration::minutes(10 + i as i64), -0.9)
                .with_threat_level(level)
        })
        .collect();
        store.insert_signals(&signals).await.unwrap();

        let snapshot = analyzer.analyze_at(now).await.unwrap();
        let ids: Vec<&str> = snapshot.top_signals.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);
        assert_eq!(snapshot.intelligence_metrics.total_signals_processed, 3);
        // baseline equals every sentiment, so nothing spikes
        assert!(snapshot.top_signals.iter().all(|s| s.spike_indicator == Some(false)));
        assert_eq!(snapshot.intelligence_metrics.urgency_threshold, 0.7);
    }

    #[tokio::test]
    async fn test_push_scores_unscored_signal() {
        let (store, analyzer) = setup();
        let signal = Signal::new("p", "Checkpoint clash", "web", Utc::now(), -0.95)
            .with_threat_level(ThreatLevel::Critical)
            .with_emotions(["rage"]);

        let alert = analyzer.push_to_alerts(&signal).await.unwrap();
        // 0.4 + 0.3·0.95 + 0.2·0.5 + 0.1·0.8 = 0.865
        assert_eq!(alert.severity, UrgencyLevel::Critical);
        assert_eq!(store.list_alerts(5).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_adaptive_thresholds_reported_when_enabled() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let analyzer = SignalAnalyzer::new(store.clone()).with_adaptive_thresholds(true);
        analyzer.update_thresholds(0.8).await.unwrap();

        let snapshot = analyzer.analyze().await.unwrap();
        assert!((snapshot.intelligence_metrics.urgency_threshold - 0.56).abs() < 1e-9);
        assert!((snapshot.intelligence_metrics.relevance_threshold - 0.48).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_from_config_rejects_bad_urgency() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let mut config = IntelConfig::default();
        config.auto_alert.enabled = true;
        config.auto_alert.min_urgency = "extreme".into();
        assert!(SignalAnalyzer::from_config(store, &config).is_err());
    }
}
