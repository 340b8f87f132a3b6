//! Configuration management for Sentinel services.
//!
//! All Sentinel services share a unified configuration file at `~/.sentinel/config.json`.
//!
//! # Configuration Priority
//!
//! 1. Environment variables (SENTINEL_* prefix)
//! 2. Explicit config file values
//! 3. Default values
//!
//! # Environment Variable Mapping
//!
//! - `SENTINEL_PORT` → intel.port
//! - `SENTINEL_BIND_ADDRESS` → network.bind
//! - `SENTINEL_DB_PATH` → intel.db_path
//! - `SENTINEL_SCHEDULE` → intel.schedule.cron (also enables the scheduler)
//! - `SENTINEL_LOG_LEVEL` → observability.log_level
//! - `SENTINEL_LOG_FORMAT` → observability.log_format

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Get the configuration directory path.
pub fn config_dir() -> PathBuf {
    directories::UserDirs::new().map_or_else(
        || PathBuf::from(".sentinel"),
        |dirs| dirs.home_dir().join(".sentinel"),
    )
}

/// Get the configuration file path.
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

// ============================================================================
// Network Configuration
// ============================================================================

/// Global network configuration.
///
/// Default bind is `127.0.0.1` (local only). Set to `0.0.0.0` to allow remote access.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_bind_address")]
    pub bind: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind: default_bind_address(),
        }
    }
}

fn default_bind_address() -> String {
    "127.0.0.1".into()
}

// ============================================================================
// Observability
// ============================================================================

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Base log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Output format: "json" or "pretty"
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "pretty".into()
}

// ============================================================================
// Signal Intelligence
// ============================================================================

/// Signal intelligence service configuration.
///
/// ```json
/// {
///   "intel": {
///     "port": 4440,
///     "db_path": "/var/lib/sentinel/signals.db",
///     "analysis": { "recent_window_hours": 2, "fetch_limit": 100 },
///     "schedule": { "enabled": true, "cron": "0 */15 * * * *" },
///     "auto_alert": { "enabled": true, "min_urgency": "critical" }
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntelConfig {
    /// HTTP port
    #[serde(default = "default_intel_port")]
    pub port: u16,

    /// HTTP host. Falls back to `network.bind` when unset.
    #[serde(default)]
    pub host: Option<String>,

    /// SQLite database path. Defaults to `~/.sentinel/signals.db`.
    #[serde(default)]
    pub db_path: Option<PathBuf>,

    #[serde(default)]
    pub analysis: AnalysisConfig,

    #[serde(default)]
    pub schedule: ScheduleConfig,

    #[serde(default)]
    pub auto_alert: AutoAlertConfig,

    /// Feed the persisted adaptive thresholds into each analysis run.
    /// When false the run reports and applies the built-in defaults.
    #[serde(default)]
    pub use_adaptive_thresholds: bool,
}

impl Default for IntelConfig {
    fn default() -> Self {
        Self {
            port: default_intel_port(),
            host: None,
            db_path: None,
            analysis: AnalysisConfig::default(),
            schedule: ScheduleConfig::default(),
            auto_alert: AutoAlertConfig::default(),
            use_adaptive_thresholds: false,
        }
    }
}

fn default_intel_port() -> u16 {
    4440
}

/// Window sizes and limits for one analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Signals created within this many hours are analyzed
    #[serde(default = "default_recent_window_hours")]
    pub recent_window_hours: i64,

    /// Maximum number of signals fetched per run
    #[serde(default = "default_fetch_limit")]
    pub fetch_limit: usize,

    /// Number of ranked signals kept in the snapshot
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Trailing window for the baseline mean
    #[serde(default = "default_baseline_days")]
    pub baseline_days: i64,

    /// Baseline delta above which a signal is flagged as a spike
    #[serde(default = "default_spike_threshold")]
    pub spike_threshold: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            recent_window_hours: default_recent_window_hours(),
            fetch_limit: default_fetch_limit(),
            top_n: default_top_n(),
            baseline_days: default_baseline_days(),
            spike_threshold: default_spike_threshold(),
        }
    }
}

fn default_recent_window_hours() -> i64 {
    2
}

fn default_fetch_limit() -> usize {
    100
}

fn default_top_n() -> usize {
    10
}

fn default_baseline_days() -> i64 {
    7
}

fn default_spike_threshold() -> f64 {
    0.5
}

/// Cron schedule for periodic analysis runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Six-field cron expression (sec min hour day month weekday)
    #[serde(default = "default_schedule_cron")]
    pub cron: String,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            cron: default_schedule_cron(),
        }
    }
}

fn default_schedule_cron() -> String {
    "0 */15 * * * *".into()
}

/// Automatic alert emission after a successful analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoAlertConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Lowest urgency level pushed to alerts (low, medium, high, critical)
    #[serde(default = "default_min_urgency")]
    pub min_urgency: String,
}

impl Default for AutoAlertConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            min_urgency: default_min_urgency(),
        }
    }
}

fn default_min_urgency() -> String {
    "critical".into()
}

// ============================================================================
// Root Configuration
// ============================================================================

/// Root configuration shared by Sentinel services.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub intel: IntelConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from the default path, falling back to defaults.
    pub fn load() -> Result<Self> {
        let path = config_path();
        if !path.exists() {
            tracing::info!("Config file not found, using defaults");
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Load configuration with environment variable overrides applied.
    pub fn load_with_env() -> Result<Self> {
        let mut config = Self::load()?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(port) = std::env::var("SENTINEL_PORT") {
            if let Ok(p) = port.parse() {
                self.intel.port = p;
            }
        }
        if let Ok(bind) = std::env::var("SENTINEL_BIND_ADDRESS") {
            self.network.bind = bind;
        }
        if let Ok(path) = std::env::var("SENTINEL_DB_PATH") {
            self.intel.db_path = Some(PathBuf::from(path));
        }
        if let Ok(expr) = std::env::var("SENTINEL_SCHEDULE") {
            self.intel.schedule.cron = expr;
            self.intel.schedule.enabled = true;
        }
        if let Ok(level) = std::env::var("SENTINEL_LOG_LEVEL") {
            self.observability.log_level = level;
        }
        if let Ok(format) = std::env::var("SENTINEL_LOG_FORMAT") {
            self.observability.log_format = format;
        }
    }

    /// Host the intelligence service binds to.
    pub fn intel_host(&self) -> &str {
        self.intel.host.as_deref().unwrap_or(&self.network.bind)
    }

    /// Resolved database path for the signal store.
    pub fn intel_db_path(&self) -> PathBuf {
        self.intel
            .db_path
            .clone()
            .unwrap_or_else(|| config_dir().join("signals.db"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.intel.port, 4440);
        assert_eq!(config.intel_host(), "127.0.0.1");
        assert_eq!(config.intel.analysis.fetch_limit, 100);
        assert_eq!(config.intel.analysis.top_n, 10);
        assert_eq!(config.intel.analysis.baseline_days, 7);
        assert!(!config.intel.schedule.enabled);
        assert!(!config.intel.use_adaptive_thresholds);
        assert!(config.intel_db_path().ends_with("signals.db"));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: Config = serde_json::from_str(
            r#"{"intel": {"port": 5000, "analysis": {"top_n": 3}}}"#,
        )
        .unwrap();
        assert_eq!(config.intel.port, 5000);
        assert_eq!(config.intel.analysis.top_n, 3);
        assert_eq!(config.intel.analysis.recent_window_hours, 2);
        assert_eq!(config.observability.log_format, "pretty");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"{{"network": {{"bind": "0.0.0.0"}}, "intel": {{"host": "10.0.0.5", "db_path": "/tmp/s.db"}}}}"#
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.network.bind, "0.0.0.0");
        assert_eq!(config.intel_host(), "10.0.0.5");
        assert_eq!(config.intel_db_path(), PathBuf::from("/tmp/s.db"));
    }

    #[test]
    fn test_load_from_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "not json").unwrap();
        assert!(Config::load_from(&path).is_err());
    }
}
