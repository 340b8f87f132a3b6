//! Composite priority scoring for individual signals.
//!
//! ```text
//! priority = 0.4·urgency_weight + 0.3·|sentiment − baseline|
//!          + 0.2·topic_relevance + 0.1·emotion_intensity
//! ```
//!
//! The result is clamped to [0, 1] and mapped onto an urgency tier.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::types::{Signal, ThreatLevel, UrgencyLevel};
use crate::vocabulary::{normalize, Vocabulary};

/// Formula weights.
pub const URGENCY_WEIGHT: f64 = 0.4;
pub const BASELINE_DELTA_WEIGHT: f64 = 0.3;
pub const RELEVANCE_WEIGHT: f64 = 0.2;
pub const EMOTION_WEIGHT: f64 = 0.1;

/// Absolute sentiment above which the urgency weight is boosted.
const EXTREME_SENTIMENT: f64 = 0.7;
const EXTREME_SENTIMENT_BOOST: f64 = 0.2;

const BASE_RELEVANCE: f64 = 0.5;
const KEYWORD_RELEVANCE_BOOST: f64 = 0.4;
const INFLUENCE_RELEVANCE_BOOST: f64 = 0.2;
const INFLUENTIAL_AUTHOR: f64 = 0.7;

const BASE_EMOTION_INTENSITY: f64 = 0.5;
const MIXED_EMOTION_INTENSITY: f64 = 0.7;
const HIGH_EMOTION_INTENSITY: f64 = 0.8;

/// Starting urgency weight for a threat level.
pub fn threat_weight(level: ThreatLevel) -> f64 {
    match level {
        ThreatLevel::Critical => 1.0,
        ThreatLevel::High => 0.8,
        ThreatLevel::Medium => 0.6,
        ThreatLevel::Low => 0.4,
        ThreatLevel::Unknown => 0.2,
    }
}

/// Scoring output for one signal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriorityAssessment {
    pub priority_score: f64,
    pub urgency_level: UrgencyLevel,
    pub change_from_baseline: f64,
    pub topic_relevance: f64,
    pub urgency_weight: f64,
    pub emotion_intensity: f64,
}

/// Pure scorer; holds only the reference vocabularies.
#[derive(Debug, Clone, Default)]
pub struct PriorityScorer {
    vocabulary: Vocabulary,
}

impl PriorityScorer {
    pub fn new(vocabulary: Vocabulary) -> Self {
        Self { vocabulary }
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn score(&self, signal: &Signal, baseline: f64) -> PriorityAssessment {
        let change_from_baseline = (signal.sentiment_score - baseline).abs();
        let urgency_weight = self.urgency_weight(signal);
        let topic_relevance = self.topic_relevance(signal);
        let emotion_intensity = self.emotion_intensity(signal);

        let raw = URGENCY_WEIGHT * urgency_weight
            + BASELINE_DELTA_WEIGHT * change_from_baseline
            + RELEVANCE_WEIGHT * topic_relevance
            + EMOTION_WEIGHT * emotion_intensity;
        // |sentiment − baseline| reaches 2 at opposite extremes
        let priority_score = if raw.is_finite() { raw.clamp(0.0, 1.0) } else { 0.0 };

        PriorityAssessment {
            priority_score,
            urgency_level: UrgencyLevel::from_score(priority_score),
            change_from_baseline,
            topic_relevance,
            urgency_weight,
            emotion_intensity,
        }
    }

    /// Score `signal` and write the derived fields onto it.
    pub fn annotate(&self, signal: &mut Signal, baseline: f64, spike_threshold: f64) -> PriorityAssessment {
        let assessment = self.score(signal, baseline);
        signal.priority_score = Some(assessment.priority_score);
        signal.urgency_level = Some(assessment.urgency_level);
        signal.change_from_baseline = Some(assessment.change_from_baseline);
        signal.topic_relevance = Some(assessment.topic_relevance);
        signal.spike_indicator = Some(assessment.change_from_baseline > spike_threshold);
        assessment
    }

    fn urgency_weight(&self, signal: &Signal) -> f64 {
        let mut weight = threat_weight(signal.threat_level);
        if signal.sentiment_score.abs() > EXTREME_SENTIMENT {
            weight = (weight + EXTREME_SENTIMENT_BOOST).min(1.0);
        }
        weight
    }

    fn topic_relevance(&self, signal: &Signal) -> f64 {
        let mut relevance = BASE_RELEVANCE;

        if let Some(keywords) = &signal.keywords_detected {
            if self.vocabulary.matches_any_keyword(keywords.as_slice()) {
                relevance = (relevance + KEYWORD_RELEVANCE_BOOST).min(1.0);
            }
        }

        if signal.author_influence_score.unwrap_or(0.0) > INFLUENTIAL_AUTHOR {
            relevance = (relevance + INFLUENCE_RELEVANCE_BOOST).min(1.0);
        }

        relevance
    }

    fn emotion_intensity(&self, signal: &Signal) -> f64 {
        let Some(tags) = &signal.emotional_tone else {
            return BASE_EMOTION_INTENSITY;
        };

        if tags.iter().any(|tag| self.vocabulary.is_high_intensity(tag)) {
            return HIGH_EMOTION_INTENSITY;
        }

        let distinct: HashSet<String> = tags.iter().map(|tag| normalize(tag)).collect();
        if distinct.len() > 2 {
            MIXED_EMOTION_INTENSITY
        } else {
            BASE_EMOTION_INTENSITY
        }
    }
}
