//! Centralized error types for mail2issue.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the mail2issue library.
///
/// Decoding a message never fails: malformed mail degrades the output
/// instead. The variants below come from configuration, the filesystem, and
/// the collaborators that consume the decoded record.
#[derive(Error, Debug)]
pub enum MailError {
    /// I/O error with the associated file path.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The specified input file does not exist.
    #[error("Email file not found: {0}")]
    FileNotFound(PathBuf),

    /// A setting required by the requested operation is absent.
    #[error("Missing required configuration: {0}")]
    MissingConfig(String),

    /// The configuration file exists but could not be used.
    #[error("Invalid configuration in '{path}': {reason}")]
    InvalidConfig { path: PathBuf, reason: String },

    /// One MIME part could not be decoded. Only that part is dropped.
    #[error("Could not decode attachment '{filename}': {reason}")]
    AttachmentDecode { filename: String, reason: String },

    /// The image host rejected or failed an upload.
    #[error("Upload of '{filename}' failed: {reason}")]
    Upload { filename: String, reason: String },

    /// The issue tracker could not create the issue.
    #[error("Issue tracker error: {0}")]
    Tracker(String),

    /// The chat notifier could not deliver the message.
    #[error("Notification error: {0}")]
    Notify(String),

    /// Serializing a record to JSON failed.
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias for `Result<T, MailError>`.
pub type Result<T> = std::result::Result<T, MailError>;

impl MailError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Allow `?` on `std::io::Error` when no path context is available
/// (reading stdin, mostly).
impl From<std::io::Error> for MailError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            path: PathBuf::from("<stdin>"),
            source,
        }
    }
}
