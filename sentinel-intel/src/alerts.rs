//! Alert records summarizing individual signals.

use chrono::{DateTime, Utc};
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use crate::error::Result;
use crate::store::SignalStore;
use crate::types::{AlertRecord, Signal, UrgencyLevel};

/// Longest description carried into an alert, in characters.
const MAX_DESCRIPTION_CHARS: usize = 500;

/// Summarize a scored signal as an alert record.
///
/// Severity is the signal's urgency level; an unscored signal reads as `low`.
pub fn build_alert(signal: &Signal, now: DateTime<Utc>) -> AlertRecord {
    let severity = signal.urgency_level.unwrap_or(UrgencyLevel::Low);

    let title = format!(
        "{} priority signal detected on {}",
        severity.as_str().to_uppercase(),
        signal.platform
    );

    let mut description: String = signal.content.chars().take(MAX_DESCRIPTION_CHARS).collect();
    if signal.content.chars().count() > MAX_DESCRIPTION_CHARS {
        description.push('…');
    }

    AlertRecord {
        severity,
        title,
        description,
        affected_regions: signal.region_detected.iter().cloned().collect(),
        sentiment_data: json!({
            "signal_id": signal.id,
            "sentiment_score": signal.sentiment_score,
            "priority_score": signal.priority_score,
            "change_from_baseline": signal.change_from_baseline,
            "threat_level": signal.threat_level.as_str(),
            "emotional_tone": signal.emotional_tone,
            "author_handle": signal.author_handle,
        }),
        created_at: now,
    }
}

/// Writes alert records to the store's alert sink.
pub struct AlertEmitter {
    store: Arc<dyn SignalStore>,
}

impl AlertEmitter {
    pub fn new(store: Arc<dyn SignalStore>) -> Self {
        Self { store }
    }

    pub async fn emit(&self, signal: &Signal) -> Result<AlertRecord> {
        let alert = build_alert(signal, Utc::now());
        self.store.insert_alert(&alert).await?;
        info!(
            signal_id = %signal.id,
            severity = alert.severity.as_str(),
            "Alert emitted"
        );
        Ok(alert)
    }

    /// Emit one alert per signal at or above `min_urgency`; returns how many were written.
    ///
    /// Stops at the first failed insert.
    pub async fn emit_qualifying(&self, signals: &[Signal], min_urgency: UrgencyLevel) -> Result<usize> {
        let mut emitted = 0;
        for signal in signals
            .iter()
            .filter(|s| s.urgency_level.is_some_and(|level| level >= min_urgency))
        {
            self.emit(signal).await?;
            emitted += 1;
        }
        Ok(emitted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;
    use crate::types::ThreatLevel;

    fn scored(id: &str, level: UrgencyLevel) -> Signal {
        let mut signal = Signal::new(id, "Roads blocked near the market", "twitter", Utc::now(), -0.8)
            .with_threat_level(ThreatLevel::High)
            .with_region("Lagos");
        signal.priority_score = Some(0.75);
        signal.urgency_level = Some(level);
        signal
    }

    #[test]
    fn test_build_alert_fields() {
        let alert = build_alert(&scored("s1", UrgencyLevel::High), Utc::now());
        assert_eq!(alert.severity, UrgencyLevel::High);
        assert_eq!(alert.title, "HIGH priority signal detected on twitter");
        assert_eq!(alert.description, "Roads blocked near the market");
        assert_eq!(alert.affected_regions, vec!["Lagos".to_string()]);
        assert_eq!(alert.sentiment_data["signal_id"], "s1");
        assert_eq!(alert.sentiment_data["threat_level"], "high");
    }

    #[test]
    fn test_long_content_truncated() {
        let mut signal = scored("s2", UrgencyLevel::Low);
        signal.content = "é".repeat(MAX_DESCRIPTION_CHARS + 20);
        signal.region_detected = None;

        let alert = build_alert(&signal, Utc::now());
        assert_eq!(alert.description.chars().count(), MAX_DESCRIPTION_CHARS + 1);
        assert!(alert.affected_regions.is_empty());
    }

    #[tokio::test]
    async fn test_emit_qualifying_filters_by_urgency() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let emitter = AlertEmitter::new(store.clone());
        let signals = vec![
            scored("a", UrgencyLevel::Critical),
            scored("b", UrgencyLevel::High),
            scored("c", UrgencyLevel::Medium),
            Signal::new("d", "unscored", "web", Utc::now(), 0.0),
        ];

        let emitted = emitter.emit_qualifying(&signals, UrgencyLevel::High).await.unwrap();
        assert_eq!(emitted, 2);

        let alerts = store.list_alerts(10).await.unwrap();
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].severity, UrgencyLevel::High);
        assert_eq!(alerts[1].severity, UrgencyLevel::Critical);
    }
}
