//! Error handling for the kwriteconfig binary.

use std::result;

use thiserror::Error;

/// Convenient result type for kwriteconfig operations.
pub type Result<T> = result::Result<T, Error>;

/// Errors that can occur while writing a config.
#[derive(Debug, Error)]
pub enum Error {
    /// The config could not be opened, written or a group name was invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] kconfig::Error),
    /// The config file cannot be written by this process.
    #[error("{file} is not writable")]
    NotWritable {
        /// Config name as given on the command line.
        file: String,
    },
    /// The entry is locked by an administrator.
    #[error("{group}/{key} is immutable")]
    Immutable {
        /// Group path.
        group: String,
        /// Key that was refused.
        key: String,
    },
    /// A bool value that does not parse.
    #[error("Not a boolean: {0}")]
    BadBool(String),
}

impl Error {
    /// Process exit status for this error: 2 for refused writes, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NotWritable { .. } | Self::Immutable { .. } => 2,
            _ => 1,
        }
    }
}
