//! Error types for linkpost.
//!
//! Library crates use [`LinkpostError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all linkpost operations.
#[derive(Debug, thiserror::Error)]
pub enum LinkpostError {
    /// Configuration loading, validation, or destination composition error.
    #[error("config error: {message}")]
    Config { message: String },

    /// The source endpoint does not have the shape the feed expects.
    #[error("invalid source endpoint {endpoint:?}: {reason}")]
    InvalidSource { endpoint: String, reason: String },

    /// Retrieving the source collection failed.
    #[error("failed to fetch collection from {endpoint:?}: {source}")]
    Fetch {
        endpoint: String,
        #[source]
        source: Box<LinkpostError>,
    },

    /// Processing of a single record failed.
    #[error("item {index}: {source}")]
    Item {
        index: usize,
        #[source]
        source: Box<LinkpostError>,
    },

    /// Network/HTTP error.
    #[error("network error: {0}")]
    Network(String),

    /// Link traversal or resolution error.
    #[error("link error: {0}")]
    Link(String),

    /// JSON or content parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Resource download error.
    #[error("download error: {0}")]
    Download(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// HTML-to-Markdown conversion error.
    #[error("conversion error: {0}")]
    Conversion(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, LinkpostError>;

impl LinkpostError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create an invalid-source error for `endpoint`.
    pub fn invalid_source(endpoint: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSource {
            endpoint: endpoint.into(),
            reason: reason.into(),
        }
    }

    /// Wrap the cause of a failed collection fetch.
    pub fn fetch(endpoint: impl Into<String>, source: LinkpostError) -> Self {
        Self::Fetch {
            endpoint: endpoint.into(),
            source: Box::new(source),
        }
    }

    /// Wrap a per-record failure with the record's sequence index.
    pub fn item(index: usize, source: LinkpostError) -> Self {
        Self::Item {
            index,
            source: Box::new(source),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error aborts a whole run rather than a single item.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Config { .. } | Self::InvalidSource { .. } | Self::Fetch { .. }
        )
    }
}
