//! Shared domain model and configuration for sovscan.
//!
//! Holds the batch-scan domain types (scans, questions, iterations, settings
//! snapshots), the [`ScanStore`] trait that the orchestration engine uses to
//! talk to durable storage, and env-driven application configuration.

mod app_config;
mod config;
mod scan;
mod settings;
mod store;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use scan::{
    BatchScan, BatchScanQuestion, IterationRecord, IterationStatus, NewIteration, NewScan,
    PauseReason, Provider, ProviderStats, QuestionRollup, QuestionStatus, ScanStatus, Sentiment,
    SentimentCounts,
};
pub use settings::{load_scan_definition, ProviderSettings, ScanDefinition, SettingsSnapshot};
pub use store::{ScanStore, StoreError};

use thiserror::Error;

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid scan definition: {0}")]
    Validation(String),
}
