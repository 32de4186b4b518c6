//! Error and diagnostic types for the configuration engine.
//!
//! Only structurally fatal conditions become an [`Error`]. Everything else the
//! engine tolerates (bad lines, unwritable files) is recorded as a
//! [`Diagnostic`] and logged, and the caller gets an empty or default result.

use std::{
    fmt,
    io,
    path::{Path, PathBuf},
    result::Result as StdResult,
};

use thiserror::Error;

/// Convenience alias for results produced by this crate.
pub type Result<T> = StdResult<T, Error>;

/// Errors surfaced to callers of the engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// A file could not be read or written.
    #[error("{}", render_io(.path.as_deref(), .message))]
    Io {
        /// File the operation touched, when known.
        path: Option<PathBuf>,
        /// Human-readable error message.
        message: String,
    },
    /// A group path or key does not satisfy the naming rules.
    #[error("malformed path '{path}': {reason}")]
    MalformedPath {
        /// The offending path, rendered with `/` separators.
        path: String,
        /// Which rule was broken.
        reason: String,
    },
    /// A named config has no writable source the locator can produce.
    #[error("no config source could be located for '{name}'")]
    NoSource {
        /// Config name that was requested.
        name: String,
    },
}

impl Error {
    /// Build an I/O error for `path` from a standard I/O error.
    pub fn io(path: &Path, err: &io::Error) -> Self {
        Self::Io {
            path: Some(path.to_path_buf()),
            message: err.to_string(),
        }
    }

    /// Build a malformed-path error.
    pub fn malformed(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Access the file path attached to this error, if any.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Io { path, .. } => path.as_deref(),
            Self::MalformedPath { .. } | Self::NoSource { .. } => None,
        }
    }
}

/// Format an I/O error message with its optional path.
fn render_io(path: Option<&Path>, message: &str) -> String {
    match path {
        Some(p) => format!("I/O error at {}: {}", p.display(), message),
        None => format!("I/O error: {}", message),
    }
}

/// Non-fatal conditions recorded while parsing or writing configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A line was skipped because it could not be parsed.
    Parse {
        /// Source file, or `None` for in-memory text.
        path: Option<PathBuf>,
        /// 1-based line number.
        line: usize,
        /// What was wrong with the line.
        message: String,
    },
    /// A source could not be read or the writable source could not be written.
    BackendUnavailable {
        /// File that was unavailable.
        path: PathBuf,
        /// Underlying error text.
        message: String,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse {
                path: Some(p),
                line,
                message,
            } => write!(f, "{}:{}: {}", p.display(), line, message),
            Self::Parse {
                path: None,
                line,
                message,
            } => write!(f, "line {}: {}", line, message),
            Self::BackendUnavailable { path, message } => {
                write!(f, "{} unavailable: {}", path.display(), message)
            }
        }
    }
}
