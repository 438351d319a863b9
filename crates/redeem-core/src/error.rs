//! Error types for the redeem core library.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Core error type for reward dispatch.
#[derive(Error, Debug)]
pub enum RedeemError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to create cache file {path}: {source}")]
    CacheCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write cache file {path}: {source}")]
    CacheWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to link {link} to {target}: {source}")]
    CacheLink {
        link: PathBuf,
        target: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to launch {action}: {source}")]
    ActionSpawn {
        action: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Action {action} exited with {status}")]
    ActionFailed { action: String, status: String },

    #[error("Action {action} exceeded timeout of {timeout:?}")]
    ActionTimeout { action: String, timeout: Duration },

    #[error("Action task failed to join: {0}")]
    ActionJoin(String),

    #[error("Lighting error: {0}")]
    Lighting(String),

    #[error("Discovery error: {0}")]
    Discovery(String),

    #[error("Bulb not found on the network: {0}")]
    MissingBulb(String),
}

/// Result type alias for redeem operations.
pub type Result<T> = std::result::Result<T, RedeemError>;
