//! Configuration validation for Sentinel services.
//!
//! Rejects values that would make an analysis run meaningless before the
//! service starts accepting requests.

use cron::Schedule;
use std::str::FromStr;

use crate::config::{AnalysisConfig, AutoAlertConfig, Config, ObservabilityConfig, ScheduleConfig};
use crate::error::Error;

/// Configuration validation error.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid port {port}: must be between 1 and 65535")]
    InvalidPort { port: u16, field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Multiple validation errors: {0:?}")]
    Multiple(Vec<ValidationError>),
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Trait for validatable configuration sections.
pub trait Validate {
    /// Validate this configuration section.
    fn validate(&self) -> ValidationResult<()>;
}

/// Urgency names accepted by `auto_alert.min_urgency`.
pub const URGENCY_NAMES: &[&str] = &["low", "medium", "high", "critical"];

impl Config {
    /// Validate the entire configuration.
    pub fn validate(&self) -> crate::Result<()> {
        let mut errors = Vec::new();

        if self.intel.port == 0 {
            errors.push(ValidationError::InvalidPort {
                port: 0,
                field: "intel.port".into(),
            });
        }

        let sections: [&dyn Validate; 4] = [
            &self.intel.analysis,
            &self.intel.schedule,
            &self.intel.auto_alert,
            &self.observability,
        ];
        for section in sections {
            if let Err(e) = section.validate() {
                errors.push(e);
            }
        }

        if errors.is_empty() {
            Ok(())
        } else if errors.len() == 1 {
            Err(Error::Validation(errors.remove(0)))
        } else {
            Err(Error::Validation(ValidationError::Multiple(errors)))
        }
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.into(),
        reason: reason.into(),
    }
}

impl Validate for AnalysisConfig {
    fn validate(&self) -> ValidationResult<()> {
        if self.recent_window_hours <= 0 {
            return Err(invalid("intel.analysis.recent_window_hours", "must be positive"));
        }
        if self.baseline_days <= 0 {
            return Err(invalid("intel.analysis.baseline_days", "must be positive"));
        }
        if self.fetch_limit == 0 {
            return Err(invalid("intel.analysis.fetch_limit", "must be at least 1"));
        }
        if self.top_n == 0 {
            return Err(invalid("intel.analysis.top_n", "must be at least 1"));
        }
        if !(0.0..=2.0).contains(&self.spike_threshold) {
            return Err(invalid(
                "intel.analysis.spike_threshold",
                "must be within [0, 2]",
            ));
        }
        Ok(())
    }
}

impl Validate for ScheduleConfig {
    fn validate(&self) -> ValidationResult<()> {
        if self.enabled {
            Schedule::from_str(&self.cron)
                .map_err(|e| invalid("intel.schedule.cron", e.to_string()))?;
        }
        Ok(())
    }
}

impl Validate for AutoAlertConfig {
    fn validate(&self) -> ValidationResult<()> {
        if !URGENCY_NAMES.contains(&self.min_urgency.as_str()) {
            return Err(invalid(
                "intel.auto_alert.min_urgency",
                format!("expected one of {:?}", URGENCY_NAMES),
            ));
        }
        Ok(())
    }
}

impl Validate for ObservabilityConfig {
    fn validate(&self) -> ValidationResult<()> {
        if !matches!(self.log_format.as_str(), "json" | "pretty") {
            return Err(invalid(
                "observability.log_format",
                "expected \"json\" or \"pretty\"",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_zero_fetch_limit_rejected() {
        let mut config = Config::default();
        config.intel.analysis.fetch_limit = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("fetch_limit"));
    }

    #[test]
    fn test_bad_cron_only_checked_when_enabled() {
        let mut config = Config::default();
        config.intel.schedule.cron = "every now and then".into();
        assert!(config.validate().is_ok());

        config.intel.schedule.enabled = true;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_multiple_errors_collected() {
        let mut config = Config::default();
        config.intel.port = 0;
        config.observability.log_format = "xml".into();
        config.intel.auto_alert.min_urgency = "severe".into();
        match config.validate().unwrap_err() {
            Error::Validation(ValidationError::Multiple(errors)) => assert_eq!(errors.len(), 3),
            other => panic!("expected multiple errors, got {other}"),
        }
    }
}
