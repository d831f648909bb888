// src/errors.rs

//! Crate-wide error type and helpers.
//!
//! Every failure of the per-event pipeline maps onto one of the variants
//! below. The event boundary in [`crate::engine::pipeline`] turns them into
//! log lines; none of them ever stop the listener.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FunsizeError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Malformed event: {0}")]
    MalformedEvent(String),

    #[error("Release lookup failed: {0}")]
    LookupFailure(String),

    #[error("Encryption failed: {0}")]
    EncryptionFailure(String),

    #[error("Invalid task graph: {0}")]
    InvalidGraph(String),

    #[error("Graph submission failed: {0}")]
    SubmissionFailure(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FunsizeError {
    /// Short label used as the `error.kind` field in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            FunsizeError::ConfigError(_) => "config",
            FunsizeError::IoError(_) => "io",
            FunsizeError::TomlError(_) => "toml",
            FunsizeError::MalformedEvent(_) => "malformed_event",
            FunsizeError::LookupFailure(_) => "lookup",
            FunsizeError::EncryptionFailure(_) => "encryption",
            FunsizeError::InvalidGraph(_) => "invalid_graph",
            FunsizeError::SubmissionFailure(_) => "submission",
            FunsizeError::Other(_) => "other",
        }
    }
}

pub type Result<T> = std::result::Result<T, FunsizeError>;
