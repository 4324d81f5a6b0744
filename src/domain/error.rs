//! Domain-level error types for logbundle.
//!
//! All errors are typed with `thiserror` and provide meaningful context
//! without exposing internal details to end users.

use std::path::PathBuf;
use thiserror::Error;

/// Application-level errors for catalog, configuration and transfer plumbing.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration or environment error.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// IO operation failed.
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// An acquisition command exited unsuccessfully.
    #[error("Command '{command}' failed: {message}")]
    Command { command: String, message: String },

    /// Archive packaging failed.
    #[error("Archive error: {message}")]
    Archive {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl AppError {
    /// Create an IO error with context.
    pub fn io(message: impl Into<String>, err: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source: Some(err),
        }
    }

    /// Create an archive error from any packaging failure.
    pub fn archive(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Archive {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

/// Result type alias using `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Fatal outcomes of an export job.
///
/// The caller only ever sees `finished(false)`; the variant is logged so the
/// diagnosis survives in the tracing output. Item-level acquisition failures
/// are not part of this taxonomy - they are logged and skipped.
#[derive(Error, Debug)]
pub enum ExportError {
    /// Parent directory of the output path is missing or not writable.
    #[error("Output directory for {0} is not writable")]
    OutputUnwritable(PathBuf),

    /// An existing file at the output path could not be removed.
    #[error("Existing output file {0} could not be removed")]
    OutputCollision(PathBuf),

    /// The requested token list resolved to no buckets.
    #[error("No log categories were requested")]
    EmptyPlan,

    /// The shared cancellation flag was observed set.
    #[error("Export was canceled")]
    Canceled,

    /// The packaging step did not produce the expected archive.
    #[error("Archiving failed: {0}")]
    ArchiveFailure(#[from] AppError),
}
