//! Sentinel Common - Shared configuration, logging, and error types.
//!
//! This crate provides:
//! - Configuration types and loading
//! - Configuration validation
//! - Configuration error type
//! - Logging setup

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod logging;
pub mod validation;

pub use config::{
    AnalysisConfig, AutoAlertConfig, Config, IntelConfig, NetworkConfig, ObservabilityConfig,
    ScheduleConfig,
};
pub use error::{Error, Result};
pub use validation::{Validate, ValidationError, ValidationResult};

