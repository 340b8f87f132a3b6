//! Pattern shift detection.
//!
//! Compares a short recent window (last hour) against a trailing baseline
//! window (the 23 hours before it) for three independent families:
//!
//! - **Sentiment spikes**: per-region mean sentiment moves by more than 0.3
//! - **Emotion surges**: an emotion's share of signals exceeds 10% and doubles
//! - **Topic emergence**: a newly detected topic with volume above 10
//!
//! A store failure inside one family is logged and that family is skipped;
//! the other families still run.

use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::aggregate::{frequencies, group_stats};
use crate::error::Result;
use crate::store::SignalStore;
use crate::types::{PatternShift, PatternType, RegionalObservation, TrendingTopic};
use crate::vocabulary::normalize;

/// Detection constants.
#[derive(Debug, Clone)]
pub struct DetectionParams {
    pub recent_window: Duration,
    pub baseline_window: Duration,
    /// Minimum recent observations per region
    pub min_regional_samples: usize,
    /// Absolute mean-sentiment delta that counts as a spike
    pub sentiment_delta: f64,
    pub spike_confidence_cap: f64,
    /// Minimum recent share of signals carrying an emotion
    pub min_emotion_frequency: f64,
    /// Recent frequency must exceed this multiple of the baseline frequency
    pub emotion_surge_ratio: f64,
    /// Stand-in for a missing or tiny baseline frequency
    pub emotion_frequency_floor: f64,
    pub surge_confidence_cap: f64,
    pub topic_limit: usize,
    pub min_topic_volume: f64,
    pub topic_confidence_cap: f64,
    /// Volume that maps to full topic confidence before capping
    pub topic_volume_scale: f64,
}

impl Default for DetectionParams {
    fn default() -> Self {
        Self {
            recent_window: Duration::hours(1),
            baseline_window: Duration::hours(24),
            min_regional_samples: 3,
            sentiment_delta: 0.3,
            spike_confidence_cap: 0.95,
            min_emotion_frequency: 0.1,
            emotion_surge_ratio: 2.0,
            emotion_frequency_floor: 0.01,
            surge_confidence_cap: 0.9,
            topic_limit: 5,
            min_topic_volume: 10.0,
            topic_confidence_cap: 0.85,
            topic_volume_scale: 50.0,
        }
    }
}

/// Detects significant shifts against the trailing baseline.
pub struct PatternShiftDetector {
    store: Arc<dyn SignalStore>,
    params: DetectionParams,
}

impl PatternShiftDetector {
    pub fn new(store: Arc<dyn SignalStore>) -> Self {
        Self::with_params(store, DetectionParams::default())
    }

    pub fn with_params(store: Arc<dyn SignalStore>, params: DetectionParams) -> Self {
        Self { store, params }
    }

    pub fn params(&self) -> &DetectionParams {
        &self.params
    }

    /// Run every family; never fails as a whole.
    pub async fn detect(&self, now: DateTime<Utc>) -> Vec<PatternShift> {
        let mut shifts = Vec::new();

        let families = [
            PatternType::SentimentSpike,
            PatternType::EmotionSurge,
            PatternType::TopicEmergence,
        ];
        for family in families {
            let result = match family {
                PatternType::SentimentSpike => self.detect_sentiment_spikes(now).await,
                PatternType::EmotionSurge => self.detect_emotion_surges(now).await,
                PatternType::TopicEmergence => self.detect_emerging_topics(now).await,
                PatternType::RegionalAnomaly => continue,
            };

            match result {
                Ok(found) => {
                    debug!(family = family.as_str(), count = found.len(), "Pattern family evaluated");
                    shifts.extend(found);
                }
                Err(e) => {
                    warn!(family = family.as_str(), error = %e, "Pattern family failed, skipping");
                }
            }
        }

        shifts
    }

    fn recent_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.params.recent_window
    }

    fn baseline_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.params.baseline_window
    }

    pub async fn detect_sentiment_spikes(&self, now: DateTime<Utc>) -> Result<Vec<PatternShift>> {
        let recent_start = self.recent_start(now);
        let recent = self.store.regional_sentiment(recent_start, None).await?;
        let baseline = self
            .store
            .regional_sentiment(self.baseline_start(now), Some(recent_start))
            .await?;
        Ok(self.sentiment_spikes(&recent, &baseline, now))
    }

    pub async fn detect_emotion_surges(&self, now: DateTime<Utc>) -> Result<Vec<PatternShift>> {
        let recent_start = self.recent_start(now);
        let recent = self.store.emotion_tones(recent_start, None).await?;
        let baseline = self
            .store
            .emotion_tones(self.baseline_start(now), Some(recent_start))
            .await?;
        Ok(self.emotion_surges(&recent, &baseline, now))
    }

    pub async fn detect_emerging_topics(&self, now: DateTime<Utc>) -> Result<Vec<PatternShift>> {
        let topics = self
            .store
            .emerging_topics(self.recent_start(now), self.params.topic_limit)
            .await?;
        Ok(self.emerging_topics(&topics, now))
    }

    /// Regions present in both windows with enough recent samples and a large mean delta.
    pub fn sentiment_spikes(
        &self,
        recent: &[RegionalObservation],
        baseline: &[RegionalObservation],
        now: DateTime<Utc>,
    ) -> Vec<PatternShift> {
        let recent_groups = group_stats(recent.iter().map(|o| (o.region.as_str(), o.sentiment_score)));
        let baseline_groups =
            group_stats(baseline.iter().map(|o| (o.region.as_str(), o.sentiment_score)));

        let mut shifts = Vec::new();
        for (region, stats) in &recent_groups {
            if stats.count < self.params.min_regional_samples {
                continue;
            }
            let (Some(recent_mean), Some(baseline_mean)) = (
                stats.mean(),
                baseline_groups.get(region).and_then(|b| b.mean()),
            ) else {
                continue;
            };

            let change = recent_mean - baseline_mean;
            if change.abs() > self.params.sentiment_delta {
                let confidence = (change.abs() * 2.0).min(self.params.spike_confidence_cap);
                let mut shift = PatternShift::new(
                    PatternType::SentimentSpike,
                    region,
                    baseline_mean,
                    recent_mean,
                    change,
                    confidence,
                    now,
                );
                shift.region = Some((*region).to_string());
                shifts.push(shift);
            }
        }
        shifts
    }

    /// Emotions whose recent share is both material and at least double the baseline share.
    pub fn emotion_surges(
        &self,
        recent: &[Vec<String>],
        baseline: &[Vec<String>],
        now: DateTime<Utc>,
    ) -> Vec<PatternShift> {
        // each signal counts at most once per emotion
        let tags = |rows: &[Vec<String>]| -> Vec<String> {
            rows.iter()
                .flat_map(|row| row.iter().map(|tag| normalize(tag)).collect::<BTreeSet<_>>())
                .collect()
        };
        let recent_freq = frequencies(tags(recent), recent.len());
        let baseline_freq = frequencies(tags(baseline), baseline.len());

        let floor = self.params.emotion_frequency_floor;
        let mut shifts = Vec::new();
        for (emotion, &freq) in &recent_freq {
            let base = baseline_freq.get(emotion).copied().unwrap_or(floor);
            if freq > self.params.min_emotion_frequency && freq > self.params.emotion_surge_ratio * base {
                let ratio = freq / base.max(floor);
                let confidence = (freq * 3.0).min(self.params.surge_confidence_cap);
                let mut shift = PatternShift::new(
                    PatternType::EmotionSurge,
                    emotion,
                    base,
                    freq,
                    ratio,
                    confidence,
                    now,
                );
                shift.emotion = Some(emotion.clone());
                shifts.push(shift);
            }
        }
        shifts
    }

    /// Newly detected topics whose volume clears the significance bar.
    pub fn emerging_topics(&self, topics: &[TrendingTopic], now: DateTime<Utc>) -> Vec<PatternShift> {
        topics
            .iter()
            .take(self.params.topic_limit)
            .filter(|t| t.volume_score > self.params.min_topic_volume)
            .map(|t| {
                let confidence =
                    (t.volume_score / self.params.topic_volume_scale).min(self.params.topic_confidence_cap);
                let mut shift = PatternShift::new(
                    PatternType::TopicEmergence,
                    &t.topic,
                    0.0,
                    t.volume_score,
                    t.volume_score,
                    confidence,
                    now,
                );
                shift.topic = Some(t.topic.clone());
                shift
            })
            .collect()
    }
}
