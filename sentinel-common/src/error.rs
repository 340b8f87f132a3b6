//! Error types shared across Sentinel services.

use thiserror::Error;

use crate::validation::ValidationError;

/// Result type alias using the Sentinel error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Configuration errors surfaced before a service starts serving.
#[derive(Error, Debug)]
pub enum Error {
    /// A setting could not be interpreted
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration failed validation
    #[error("Invalid configuration: {0}")]
    Validation(#[from] ValidationError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_converts() {
        let err: Error = ValidationError::InvalidValue {
            field: "intel.analysis.top_n".into(),
            reason: "must be at least 1".into(),
        }
        .into();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(
            err.to_string(),
            "Invalid configuration: Invalid value for intel.analysis.top_n: must be at least 1"
        );
    }

    #[test]
    fn test_config_error_display() {
        let err = Error::Config("unknown urgency level: severe".into());
        assert_eq!(
            err.to_string(),
            "Configuration error: unknown urgency level: severe"
        );
    }
}
