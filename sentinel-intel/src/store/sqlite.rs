//! SQLite-backed signal store.
//!
//! Mirrors the hosted tables the core reads and writes:
//! - `sentiment_logs`: classified signals
//! - `trending_topics`: topic volume with first-detection time
//! - `system_config`: key/value upsert store (thresholds, snapshots)
//! - `alerts`: insert-only alert sink

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::SignalStore;
use crate::error::{IntelError, Result};
use crate::types::{AlertRecord, RegionalObservation, Signal, ThreatLevel, TrendingTopic, UrgencyLevel};

// ============================================================================
// Database Schema
// ============================================================================

const CREATE_TABLES_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS sentiment_logs (
    id TEXT PRIMARY KEY,
    content TEXT NOT NULL,
    platform TEXT NOT NULL,
    author_handle TEXT,
    created_at TEXT NOT NULL,
    sentiment_score REAL,
    confidence_score REAL,
    threat_level TEXT,
    region_detected TEXT,
    emotional_tone TEXT,
    keywords_detected TEXT,
    author_influence_score REAL,
    engagement_metrics TEXT
);

CREATE INDEX IF NOT EXISTS idx_sentiment_logs_created
ON sentiment_logs(created_at DESC);

CREATE INDEX IF NOT EXISTS idx_sentiment_logs_region
ON sentiment_logs(region_detected, created_at);

CREATE TABLE IF NOT EXISTS trending_topics (
    id TEXT PRIMARY KEY,
    topic TEXT NOT NULL,
    volume_score REAL NOT NULL,
    first_detected TEXT NOT NULL,
    sentiment_average REAL
);

CREATE INDEX IF NOT EXISTS idx_trending_topics_first_detected
ON trending_topics(first_detected DESC);

CREATE TABLE IF NOT EXISTS system_config (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS alerts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    severity TEXT NOT NULL,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    affected_regions TEXT NOT NULL,
    sentiment_data TEXT NOT NULL,
    created_at TEXT NOT NULL
);
"#;

const SIGNAL_COLUMNS: &str = "id, content, platform, author_handle, created_at, sentiment_score, \
     confidence_score, threat_level, region_detected, emotional_tone, keywords_detected, \
     author_influence_score, engagement_metrics";

/// Upper bound used for open-ended ranges; sorts after every stored timestamp.
const OPEN_END: &str = "9999-12-31T23:59:59.999999Z";

/// Fixed-width UTC timestamp so text comparison matches time order.
fn ts(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn until_bound(until: Option<DateTime<Utc>>) -> String {
    until.as_ref().map(ts).unwrap_or_else(|| OPEN_END.to_string())
}

fn conversion_error(
    idx: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn timestamp_column(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

fn json_column<T: DeserializeOwned>(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Option<T>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|json| serde_json::from_str(&json).map_err(|e| conversion_error(idx, e)))
        .transpose()
}

fn to_json<T: serde::Serialize>(value: &Option<T>) -> Result<Option<String>> {
    value
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(IntelError::from)
}

// ============================================================================
// SQLite Store
// ============================================================================

/// Local SQLite implementation of [`SignalStore`].
pub struct SqliteStore {
    /// rusqlite::Connection is Send but not Sync, so it sits behind a Mutex
    db: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl SqliteStore {
    /// Open (or create) the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| IntelError::DataAccess(format!("creating {}: {}", parent.display(), e)))?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        conn.execute_batch(CREATE_TABLES_SQL)?;

        info!(db_path = %path.display(), "Initialized signal store");

        Ok(Self {
            db: Arc::new(Mutex::new(conn)),
            path: Some(path.to_path_buf()),
        })
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(CREATE_TABLES_SQL)?;
        Ok(Self {
            db: Arc::new(Mutex::new(conn)),
            path: None,
        })
    }

    /// Database path, `None` for in-memory stores.
    pub fn db_path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    // ========================================================================
    // Ingest (upstream pipeline side)
    // ========================================================================

    /// Insert or replace one classified signal. Derived fields are not stored.
    pub async fn insert_signal(&self, signal: &Signal) -> Result<()> {
        let emotional_tone = to_json(&signal.emotional_tone)?;
        let keywords = to_json(&signal.keywords_detected)?;
        let engagement = to_json(&signal.engagement_metrics)?;

        let db = self.db.lock().await;
        db.execute(
            r#"
            INSERT OR REPLACE INTO sentiment_logs
            (id, content, platform, author_handle, created_at, sentiment_score, confidence_score,
             threat_level, region_detected, emotional_tone, keywords_detected,
             author_influence_score, engagement_metrics)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
            params![
                signal.id,
                signal.content,
                signal.platform,
                signal.author_handle,
                ts(&signal.created_at),
                signal.sentiment_score,
                signal.confidence_score,
                signal.threat_level.as_str(),
                signal.region_detected,
                emotional_tone,
                keywords,
                signal.author_influence_score,
                engagement,
            ],
        )?;
        Ok(())
    }

    /// Insert several signals, returning how many were written.
    pub async fn insert_signals(&self, signals: &[Signal]) -> Result<usize> {
        for signal in signals {
            self.insert_signal(signal).await?;
        }
        debug!(count = signals.len(), "Inserted signals");
        Ok(signals.len())
    }

    /// Insert a signal row whose sentiment score is NULL (not yet classified).
    pub async fn insert_unscored_signal(
        &self,
        id: &str,
        content: &str,
        platform: &str,
        created_at: DateTime<Utc>,
    ) -> Result<()> {
        let db = self.db.lock().await;
        db.execute(
            "INSERT OR REPLACE INTO sentiment_logs (id, content, platform, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![id, content, platform, ts(&created_at)],
        )?;
        Ok(())
    }

    pub async fn insert_topic(&self, topic: &TrendingTopic) -> Result<()> {
        let db = self.db.lock().await;
        db.execute(
            r#"
            INSERT OR REPLACE INTO trending_topics
            (id, topic, volume_score, first_detected, sentiment_average)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                topic.id,
                topic.topic,
                topic.volume_score,
                ts(&topic.first_detected),
                topic.sentiment_average,
            ],
        )?;
        Ok(())
    }

    /// Most recent alerts first.
    pub async fn list_alerts(&self, limit: usize) -> Result<Vec<AlertRecord>> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(
            "SELECT severity, title, description, affected_regions, sentiment_data, created_at
             FROM alerts ORDER BY id DESC LIMIT ?1",
        )?;
        let alerts = stmt
            .query_map(params![limit as i64], Self::row_to_alert)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(alerts)
    }

    fn row_to_signal(row: &rusqlite::Row) -> rusqlite::Result<Signal> {
        let threat_label: Option<String> = row.get(7)?;

        Ok(Signal {
            id: row.get(0)?,
            content: row.get(1)?,
            platform: row.get(2)?,
            author_handle: row.get(3)?,
            created_at: timestamp_column(row, 4)?,
            sentiment_score: row.get::<_, Option<f64>>(5)?.unwrap_or(0.0),
            confidence_score: row.get::<_, Option<f64>>(6)?.unwrap_or(0.0),
            threat_level: threat_label
                .as_deref()
                .map(ThreatLevel::from_label)
                .unwrap_or_default(),
            region_detected: row.get(8)?,
            emotional_tone: json_column(row, 9)?,
            keywords_detected: json_column(row, 10)?,
            author_influence_score: row.get(11)?,
            engagement_metrics: json_column(row, 12)?,
            priority_score: None,
            urgency_level: None,
            change_from_baseline: None,
            topic_relevance: None,
            spike_indicator: None,
        })
    }

    fn row_to_topic(row: &rusqlite::Row) -> rusqlite::Result<TrendingTopic> {
        Ok(TrendingTopic {
            id: row.get(0)?,
            topic: row.get(1)?,
            volume_score: row.get(2)?,
            first_detected: timestamp_column(row, 3)?,
            sentiment_average: row.get(4)?,
        })
    }

    fn row_to_alert(row: &rusqlite::Row) -> rusqlite::Result<AlertRecord> {
        let severity: String = row.get(0)?;
        let severity = severity.parse::<UrgencyLevel>().map_err(|e| {
            conversion_error(0, std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })?;

        Ok(AlertRecord {
            severity,
            title: row.get(1)?,
            description: row.get(2)?,
            affected_regions: json_column(row, 3)?.unwrap_or_default(),
            sentiment_data: json_column(row, 4)?.unwrap_or(serde_json::Value::Null),
            created_at: timestamp_column(row, 5)?,
        })
    }
}

#[async_trait]
impl SignalStore for SqliteStore {
    async fn recent_signals(&self, since: DateTime<Utc>, limit: usize) -> Result<Vec<Signal>> {
        let db = self.db.lock().await;
        let sql = format!(
            "SELECT {} FROM sentiment_logs WHERE created_at >= ?1
             ORDER BY created_at DESC, rowid DESC LIMIT ?2",
            SIGNAL_COLUMNS
        );
        let mut stmt = db.prepare(&sql)?;
        let signals = stmt
            .query_map(params![ts(&since), limit as i64], Self::row_to_signal)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        debug!(count = signals.len(), since = %since, "Fetched recent signals");
        Ok(signals)
    }

    async fn mean_sentiment_since(&self, since: DateTime<Utc>) -> Result<Option<f64>> {
        let db = self.db.lock().await;
        let mean: Option<f64> = db.query_row(
            "SELECT AVG(sentiment_score) FROM sentiment_logs
             WHERE sentiment_score IS NOT NULL AND created_at >= ?1",
            params![ts(&since)],
            |row| row.get(0),
        )?;
        Ok(mean)
    }

    async fn regional_sentiment(
        &self,
        since: DateTime<Utc>,
        until: Option<DateTime<Utc>>,
    ) -> Result<Vec<RegionalObservation>> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(
            "SELECT region_detected, sentiment_score FROM sentiment_logs
             WHERE region_detected IS NOT NULL AND sentiment_score IS NOT NULL
               AND created_at >= ?1 AND created_at < ?2",
        )?;
        let observations = stmt
            .query_map(params![ts(&since), until_bound(until)], |row| {
                Ok(RegionalObservation {
                    region: row.get(0)?,
                    sentiment_score: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(observations)
    }

    async fn emotion_tones(
        &self,
        since: DateTime<Utc>,
        until: Option<DateTime<Utc>>,
    ) -> Result<Vec<Vec<String>>> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(
            "SELECT emotional_tone FROM sentiment_logs
             WHERE emotional_tone IS NOT NULL AND created_at >= ?1 AND created_at < ?2",
        )?;
        let tones = stmt
            .query_map(params![ts(&since), until_bound(until)], |row| {
                json_column::<Vec<String>>(row, 0).map(Option::unwrap_or_default)
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tones)
    }

    async fn emerging_topics(
        &self,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<TrendingTopic>> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(
            "SELECT id, topic, volume_score, first_detected, sentiment_average
             FROM trending_topics WHERE first_detected >= ?1
             ORDER BY volume_score DESC LIMIT ?2",
        )?;
        let topics = stmt
            .query_map(params![ts(&since), limit as i64], Self::row_to_topic)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(topics)
    }

    async fn get_config(&self, key: &str) -> Result<Option<serde_json::Value>> {
        let db = self.db.lock().await;
        let raw: Option<String> = db
            .query_row(
                "SELECT value FROM system_config WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;

        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn upsert_config(&self, key: &str, value: &serde_json::Value) -> Result<()> {
        let json = serde_json::to_string(value)?;
        let db = self.db.lock().await;
        db.execute(
            r#"
            INSERT INTO system_config (key, value, updated_at) VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
            params![key, json, ts(&Utc::now())],
        )?;

        debug!(key, "Upserted config value");
        Ok(())
    }

    async fn insert_alert(&self, alert: &AlertRecord) -> Result<()> {
        let regions = serde_json::to_string(&alert.affected_regions)?;
        let data = serde_json::to_string(&alert.sentiment_data)?;

        let db = self.db.lock().await;
        db.execute(
            r#"
            INSERT INTO alerts
            (severity, title, description, affected_regions, sentiment_data, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                alert.severity.as_str(),
                alert.title,
                alert.description,
                regions,
                data,
                ts(&alert.created_at),
            ],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::tempdir;

    fn signal(id: &str, minutes_ago: i64, sentiment: f64) -> Signal {
        Signal::new(
            id,
            format!("content {}", id),
            "twitter",
            Utc::now() - Duration::minutes(minutes_ago),
            sentiment,
        )
    }

    #[tokio::test]
    async fn test_open_creates_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("signals.db");
        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.db_path(), Some(path.as_path()));
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_signal_round_trip() {
        let store = SqliteStore::open_in_memory().unwrap();
        let original = signal("s1", 5, -0.6)
            .with_threat_level(ThreatLevel::High)
            .with_region("Lagos")
            .with_emotions(["anger", "fear"])
            .with_keywords(["fuel"])
            .with_author("@reporter", 0.8);
        store.insert_signal(&original).await.unwrap();

        let fetched = store
            .recent_signals(Utc::now() - Duration::hours(1), 10)
            .await
            .unwrap();
        assert_eq!(fetched.len(), 1);
        let got = &fetched[0];
        assert_eq!(got.id, "s1");
        assert_eq!(got.threat_level, ThreatLevel::High);
        assert_eq!(got.region_detected.as_deref(), Some("Lagos"));
        assert_eq!(got.emotional_tone.as_ref().unwrap().len(), 2);
        assert_eq!(got.author_influence_score, Some(0.8));
        assert_eq!(
            got.created_at.timestamp_micros(),
            original.created_at.timestamp_micros()
        );
    }

    #[tokio::test]
    async fn test_recent_signals_order_window_and_limit() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .insert_signals(&[
                signal("old", 300, 0.1),
                signal("a", 30, 0.1),
                signal("b", 10, 0.1),
                signal("c", 60, 0.1),
            ])
            .await
            .unwrap();

        let since = Utc::now() - Duration::hours(2);
        let all = store.recent_signals(since, 100).await.unwrap();
        let ids: Vec<_> = all.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);

        let limited = store.recent_signals(since, 2).await.unwrap();
        assert_eq!(limited.len(), 2);
    }

    #[tokio::test]
    async fn test_mean_sentiment_ignores_nulls() {
        let store = SqliteStore::open_in_memory().unwrap();
        let since = Utc::now() - Duration::days(7);
        assert_eq!(store.mean_sentiment_since(since).await.unwrap(), None);

        store
            .insert_signals(&[signal("a", 10, -0.4), signal("b", 20, 0.2)])
            .await
            .unwrap();
        store
            .insert_unscored_signal("c", "pending", "facebook", Utc::now())
            .await
            .unwrap();

        let mean = store.mean_sentiment_since(since).await.unwrap().unwrap();
        assert!((mean + 0.1).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_regional_and_emotion_windows() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .insert_signals(&[
                signal("r1", 10, -0.5).with_region("Kano").with_emotions(["fear"]),
                signal("r2", 120, 0.3).with_region("Kano"),
                signal("r3", 15, 0.0),
            ])
            .await
            .unwrap();

        let now = Utc::now();
        let recent = store
            .regional_sentiment(now - Duration::hours(1), None)
            .await
            .unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].region, "Kano");

        let earlier = store
            .regional_sentiment(now - Duration::hours(24), Some(now - Duration::hours(1)))
            .await
            .unwrap();
        assert_eq!(earlier.len(), 1);
        assert_eq!(earlier[0].sentiment_score, 0.3);

        let tones = store
            .emotion_tones(now - Duration::hours(1), None)
            .await
            .unwrap();
        assert_eq!(tones, vec![vec!["fear".to_string()]]);
    }

    #[tokio::test]
    async fn test_emerging_topics_ranked() {
        let store = SqliteStore::open_in_memory().unwrap();
        let now = Utc::now();
        for (id, volume, minutes_ago) in [("t1", 12.0, 10), ("t2", 40.0, 20), ("t3", 99.0, 180)] {
            store
                .insert_topic(&TrendingTopic {
                    id: id.into(),
                    topic: format!("topic {}", id),
                    volume_score: volume,
                    first_detected: now - Duration::minutes(minutes_ago),
                    sentiment_average: None,
                })
                .await
                .unwrap();
        }

        let topics = store
            .emerging_topics(now - Duration::hours(1), 5)
            .await
            .unwrap();
        let ids: Vec<_> = topics.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["t2", "t1"]);
    }

    #[tokio::test]
    async fn test_config_upsert_overwrites() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(store.get_config("k").await.unwrap().is_none());

        store
            .upsert_config("k", &serde_json::json!({"v": 1}))
            .await
            .unwrap();
        store
            .upsert_config("k", &serde_json::json!({"v": 2}))
            .await
            .unwrap();

        let value = store.get_config("k").await.unwrap().unwrap();
        assert_eq!(value["v"], 2);
    }

    #[tokio::test]
    async fn test_alert_insert_and_list() {
        let store = SqliteStore::open_in_memory().unwrap();
        let alert = AlertRecord {
            severity: UrgencyLevel::Critical,
            title: "CRITICAL priority signal detected".into(),
            description: "Protest escalating".into(),
            affected_regions: vec!["Abuja".into()],
            sentiment_data: serde_json::json!({"sentiment_score": -0.9}),
            created_at: Utc::now(),
        };
        store.insert_alert(&alert).await.unwrap();

        let alerts = store.list_alerts(10).await.unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].severity, UrgencyLevel::Critical);
        assert_eq!(alerts[0].affected_regions, vec!["Abuja".to_string()]);
        assert_eq!(alerts[0].sentiment_data["sentiment_score"], -0.9);
    }
}
