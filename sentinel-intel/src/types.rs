//! Domain types for signal intelligence.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Threat & Urgency
// ============================================================================

/// Externally assigned severity attached to a signal by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreatLevel {
    Low,
    Medium,
    High,
    Critical,
    /// Missing or unrecognized label
    #[default]
    #[serde(other)]
    Unknown,
}

impl ThreatLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
            Self::Unknown => "unknown",
        }
    }

    /// Parse a stored label; anything unrecognized maps to `Unknown`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "low" => Self::Low,
            "medium" => Self::Medium,
            "high" => Self::High,
            "critical" => Self::Critical,
            _ => Self::Unknown,
        }
    }
}

/// Categorical tier derived from a priority score.
///
/// Variants are declared in ascending order so `Ord` compares severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UrgencyLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl UrgencyLevel {
    /// Step function over the priority score: 0.8 / 0.6 / 0.4 breakpoints.
    pub fn from_score(score: f64) -> Self {
        if score >= 0.8 {
            Self::Critical
        } else if score >= 0.6 {
            Self::High
        } else if score >= 0.4 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for UrgencyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UrgencyLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            other => Err(format!("unknown urgency level: {}", other)),
        }
    }
}

// ============================================================================
// Signal
// ============================================================================

/// One sentiment-scored unit of observed content.
///
/// Rows are produced by the upstream classification pipeline. The derived
/// fields at the bottom are filled in memory during an analysis run and are
/// only ever persisted as part of a results snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub id: String,
    pub content: String,
    pub platform: String,
    #[serde(default)]
    pub author_handle: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Conventionally in [-1, 1]; a missing score reads as neutral
    #[serde(default)]
    pub sentiment_score: f64,
    #[serde(default)]
    pub confidence_score: f64,
    #[serde(default)]
    pub threat_level: ThreatLevel,
    #[serde(default)]
    pub region_detected: Option<String>,
    #[serde(default)]
    pub emotional_tone: Option<Vec<String>>,
    #[serde(default)]
    pub keywords_detected: Option<Vec<String>>,
    #[serde(default)]
    pub author_influence_score: Option<f64>,
    #[serde(default)]
    pub engagement_metrics: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urgency_level: Option<UrgencyLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_from_baseline: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic_relevance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spike_indicator: Option<bool>,
}

impl Signal {
    /// Create a raw, unscored signal.
    pub fn new(
        id: impl Into<String>,
        content: impl Into<String>,
        platform: impl Into<String>,
        created_at: DateTime<Utc>,
        sentiment_score: f64,
    ) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            platform: platform.into(),
            author_handle: None,
            created_at,
            sentiment_score,
            confidence_score: 0.0,
            threat_level: ThreatLevel::Unknown,
            region_detected: None,
            emotional_tone: None,
            keywords_detected: None,
            author_influence_score: None,
            engagement_metrics: None,
            priority_score: None,
            urgency_level: None,
            change_from_baseline: None,
            topic_relevance: None,
            spike_indicator: None,
        }
    }

    pub fn with_threat_level(mut self, level: ThreatLevel) -> Self {
        self.threat_level = level;
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region_detected = Some(region.into());
        self
    }

    pub fn with_emotions<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.emotional_tone = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_keywords<I, T>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.keywords_detected = Some(keywords.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_author(mut self, handle: impl Into<String>, influence: f64) -> Self {
        self.author_handle = Some(handle.into());
        self.author_influence_score = Some(influence);
        self
    }

    /// Whether the derived priority fields have been computed.
    pub fn is_scored(&self) -> bool {
        self.priority_score.is_some() && self.urgency_level.is_some()
    }
}

// ============================================================================
// Pattern Shifts
// ============================================================================

/// Family of a detected deviation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    SentimentSpike,
    EmotionSurge,
    TopicEmergence,
    RegionalAnomaly,
}

impl PatternType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SentimentSpike => "sentiment_spike",
            Self::EmotionSurge => "emotion_surge",
            Self::TopicEmergence => "topic_emergence",
            Self::RegionalAnomaly => "regional_anomaly",
        }
    }
}

/// A detected, significant deviation from the trailing baseline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternShift {
    pub id: String,
    pub pattern_type: PatternType,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub emotion: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
    pub baseline_value: f64,
    pub current_value: f64,
    pub change_magnitude: f64,
    /// In [0, 1]
    pub confidence: f64,
    pub detected_at: DateTime<Utc>,
}

impl PatternShift {
    /// Build a shift whose id encodes its family, label, and detection time.
    pub(crate) fn new(
        pattern_type: PatternType,
        label: &str,
        baseline_value: f64,
        current_value: f64,
        change_magnitude: f64,
        confidence: f64,
        detected_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: format!(
                "{}_{}_{}",
                pattern_type.as_str(),
                label.to_ascii_lowercase().replace(char::is_whitespace, "-"),
                detected_at.timestamp_millis()
            ),
            pattern_type,
            region: None,
            emotion: None,
            topic: None,
            baseline_value,
            current_value,
            change_magnitude,
            confidence: confidence.clamp(0.0, 1.0),
            detected_at,
        }
    }
}

/// One region-tagged sentiment observation.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionalObservation {
    pub region: String,
    pub sentiment_score: f64,
}

/// A row from the trending-topics table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendingTopic {
    pub id: String,
    pub topic: String,
    pub volume_score: f64,
    pub first_detected: DateTime<Utc>,
    #[serde(default)]
    pub sentiment_average: Option<f64>,
}

// ============================================================================
// Thresholds & Metrics
// ============================================================================

/// Persisted adaptive thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    pub urgency_threshold: f64,
    pub relevance_threshold: f64,
    pub pattern_sensitivity: f64,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
    /// Adjustment factor applied by the most recent adaptation
    #[serde(default = "default_drift_factor")]
    pub drift_factor: f64,
}

fn default_drift_factor() -> f64 {
    1.0
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            urgency_threshold: 0.7,
            relevance_threshold: 0.6,
            pattern_sensitivity: 0.3,
            last_updated: None,
            drift_factor: 1.0,
        }
    }
}

/// Run-level summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntelligenceMetrics {
    pub total_signals_processed: usize,
    pub high_priority_signals: usize,
    pub pattern_shifts_detected: usize,
    pub baseline_sentiment: f64,
    pub current_sentiment_drift: f64,
    pub urgency_threshold: f64,
    pub relevance_threshold: f64,
}

/// Cached results of one analysis run.
///
/// Stored under a single key and overwritten by every run; the last writer wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSnapshot {
    pub run_id: String,
    pub top_signals: Vec<Signal>,
    pub pattern_shifts: Vec<PatternShift>,
    pub intelligence_metrics: IntelligenceMetrics,
    pub analysis_timestamp: DateTime<Utc>,
}

// ============================================================================
// Alerts
// ============================================================================

/// Insert-only alert record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub severity: UrgencyLevel,
    pub title: String,
    pub description: String,
    pub affected_regions: Vec<String>,
    pub sentiment_data: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urgency_breakpoints() {
        assert_eq!(UrgencyLevel::from_score(0.0), UrgencyLevel::Low);
        assert_eq!(UrgencyLevel::from_score(0.399), UrgencyLevel::Low);
        assert_eq!(UrgencyLevel::from_score(0.4), UrgencyLevel::Medium);
        assert_eq!(UrgencyLevel::from_score(0.6), UrgencyLevel::High);
        assert_eq!(UrgencyLevel::from_score(0.79), UrgencyLevel::High);
        assert_eq!(UrgencyLevel::from_score(0.8), UrgencyLevel::Critical);
        assert_eq!(UrgencyLevel::from_score(1.0), UrgencyLevel::Critical);
    }

    #[test]
    fn test_urgency_is_monotonic() {
        let mut previous = UrgencyLevel::Low;
        for step in 0..=100 {
            let level = UrgencyLevel::from_score(step as f64 / 100.0);
            assert!(level >= previous);
            previous = level;
        }
    }

    #[test]
    fn test_threat_level_unknown_labels() {
        let level: ThreatLevel = serde_json::from_str("\"severe\"").unwrap();
        assert_eq!(level, ThreatLevel::Unknown);
        assert_eq!(ThreatLevel::from_label(" HIGH "), ThreatLevel::High);
        assert_eq!(ThreatLevel::from_label(""), ThreatLevel::Unknown);
    }

    #[test]
    fn test_signal_deserializes_with_minimal_fields() {
        let json = serde_json::json!({
            "id": "sig-1",
            "content": "Fuel queues again",
            "platform": "twitter",
            "created_at": "2026-10-19T10:00:00Z",
            "sentiment_score": -0.4,
            "threat_level": "medium"
        });
        let signal: Signal = serde_json::from_value(json).unwrap();
        assert_eq!(signal.threat_level, ThreatLevel::Medium);
        assert!(signal.emotional_tone.is_none());
        assert!(!signal.is_scored());

        let out = serde_json::to_value(&signal).unwrap();
        assert!(out.get("priority_score").is_none());
    }

    #[test]
    fn test_pattern_shift_id_and_confidence_clamp() {
        let now = Utc::now();
        let shift = PatternShift::new(PatternType::TopicEmergence, "Fuel Prices", 0.0, 60.0, 60.0, 1.4, now);
        assert!(shift.id.starts_with("topic_emergence_fuel-prices_"));
        assert_eq!(shift.confidence, 1.0);
    }
}
