//! Unified error type for the bookforge pipeline.
//!
//! All library crates funnel their failures into [`Error`]. The generation
//! client inspects [`Error::is_transient`] to decide whether a failed engine
//! call is worth retrying.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Unified error type covering all failure modes in bookforge.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested entity could not be found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g. "chunk", "chapter").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// Input data failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The series configuration is missing or invalid.
    #[error("Config error: {0}")]
    Config(String),

    /// A database operation failed.
    #[error("Database error: {source}")]
    Database {
        /// The underlying database error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// An external tool could not be started or misbehaved.
    #[error("Tool error [{tool}]: {message}")]
    Tool {
        /// Name of the tool that failed.
        tool: String,
        /// Human-readable error description.
        message: String,
    },

    /// The generation engine exited with a non-zero status.
    #[error("Engine exited with {status}: {stderr}")]
    EngineExit {
        /// Exit status as reported by the OS.
        status: String,
        /// Captured standard error.
        stderr: String,
    },

    /// The generation engine did not finish within its deadline.
    #[error("Engine timed out after {0:?}")]
    EngineTimeout(Duration),

    /// Engine output could not be parsed.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Another run holds the chapter lock.
    #[error("Chapter is locked by {owner} ({})", path.display())]
    Locked {
        /// Path of the lock file.
        path: PathBuf,
        /// Contents of the lock file (the owning pid).
        owner: String,
    },

    /// A pipeline step failed.
    #[error("Pipeline error [{step}]: {message}")]
    Pipeline {
        /// The pipeline step that failed.
        step: String,
        /// Human-readable error description.
        message: String,
    },

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether a retry of the same engine call could plausibly succeed.
    ///
    /// Only a non-zero engine exit and a timeout qualify. Spawn failures,
    /// parse errors and everything else are permanent.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::EngineExit { .. } | Error::EngineTimeout(_))
    }

    /// Convenience constructor for [`Error::NotFound`].
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        Error::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Convenience constructor for [`Error::Database`].
    pub fn database(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Error::Database {
            source: source.into(),
        }
    }

    /// Convenience constructor for [`Error::Tool`].
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::EngineExit`].
    pub fn engine_exit(status: impl fmt::Display, stderr: impl Into<String>) -> Self {
        Error::EngineExit {
            status: status.to_string(),
            stderr: stderr.into(),
        }
    }

    /// Convenience constructor for [`Error::Pipeline`].
    pub fn pipeline(step: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Pipeline {
            step: step.into(),
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Parse(e.to_string())
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
