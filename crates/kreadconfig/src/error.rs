//! Error handling for the kreadconfig binary.

use std::result;

use thiserror::Error;

/// Convenient result type for kreadconfig operations.
pub type Result<T> = result::Result<T, Error>;

/// Errors that can occur while reading a config.
#[derive(Debug, Error)]
pub enum Error {
    /// The config could not be opened or a group name was invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] kconfig::Error),
    /// Rendering the JSON dump failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// Neither `--key` nor `--json` was given.
    #[error("No key supplied; pass --key or --json")]
    NoKey,
}
