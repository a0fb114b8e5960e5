//! Error taxonomy for the monitoring core
//!
//! Three closed kinds, each with a structured payload:
//! - Acquisition: the health source could not produce a report
//! - Delivery: one transport attempt failed (retried by the engine)
//! - Configuration: secrets or settings are unusable, fatal at startup

use std::path::PathBuf;

/// The health source failed to produce raw report text
#[derive(Debug, thiserror::Error)]
pub enum AcquisitionError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} did not finish within {secs}s")]
    Timeout { program: String, secs: u64 },
    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },
}

/// A single delivery attempt failed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    #[error("failed to execute request: {0}")]
    Network(String),
    #[error("request failed with status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("failed to build request: {0}")]
    Request(String),
}

impl From<reqwest::Error> for DeliveryError {
    fn from(err: reqwest::Error) -> Self {
        // The URL embeds the bot token
        let err = err.without_url();
        if err.is_builder() {
            DeliveryError::Request(err.to_string())
        } else {
            DeliveryError::Network(err.to_string())
        }
    }
}

/// Configuration could not be loaded or validated
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found, a template was written to {path}; fill in telegram.token and telegram.chat_id and restart")]
    TemplateCreated { path: PathBuf },
    #[error("could not determine a configuration directory")]
    NoConfigDir,
    #[error("error reading config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("error writing config file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("error parsing config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("`{0}` is missing or empty")]
    MissingSecret(&'static str),
    #[error("`{0}` still holds the template placeholder")]
    PlaceholderSecret(&'static str),
    #[error("invalid setting `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Umbrella over the three kinds so callers can branch on kind
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error(transparent)]
    Acquisition(#[from] AcquisitionError),
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
    #[error(transparent)]
    Configuration(#[from] ConfigError),
}
