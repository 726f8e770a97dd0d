//! Error types for Rhythm Flux
//!
//! Messy activity data never produces an error: unparseable times, missing
//! fields and contradictory sleeps degrade to exclusions inside the engine.
//! Errors are reserved for malformed payloads and invalid configuration.

use thiserror::Error;

/// Errors that can occur during computation
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Date parse error: {0}")]
    DateParseError(String),

    #[error("Invalid engine configuration: {0}")]
    InvalidConfig(String),
}
