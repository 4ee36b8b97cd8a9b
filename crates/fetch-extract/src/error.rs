//! Error types for download and extraction operations.

use crate::classify::ContainerKind;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for extraction operations.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Source file not found at the specified path.
    #[error("Source file does not exist: {}", .0.display())]
    NotFound(PathBuf),

    /// The file extension maps to no supported container kind.
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// The codec or the filesystem failed while materializing entries.
    #[error("{kind} extraction failed: {source}")]
    Extraction {
        /// Container kind of the strategy that failed
        kind: ContainerKind,
        /// Underlying codec or I/O fault
        #[source]
        source: std::io::Error,
    },

    /// An I/O error occurred outside of a strategy (validation, task join).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExtractError {
    pub(crate) fn extraction(kind: ContainerKind, source: impl Into<std::io::Error>) -> Self {
        Self::Extraction {
            kind,
            source: source.into(),
        }
    }
}

/// Reasons an archive entry name is refused.
#[derive(Debug, Error)]
pub enum SecurityError {
    /// Path traversal attempt detected (e.g., "../../../etc/passwd").
    #[error("Path traversal attempt: {0}")]
    PathTraversal(String),

    /// Absolute path not allowed in archive entries.
    #[error("Absolute path not allowed: {0}")]
    AbsolutePath(String),
}

/// Errors raised while downloading a resource.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The URL could not be parsed.
    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The HTTP client failed (connection, TLS, body stream).
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("Download of {url} failed with status {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    /// Writing the staging file or creating the destination failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
