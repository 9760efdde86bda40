//! Error types for nestex
//!
//! This module provides the error handling for the library:
//! - A top-level [`Error`] returned by fallible public operations
//! - Extraction-specific errors ([`ExtractionError`]) with file context
//! - Machine-readable error codes for embedding applications
//!
//! Most anomalies met during a traversal are *not* errors: they are recorded as
//! warnings (see [`crate::warnings`]) and the traversal continues. An `Error`
//! escaping [`crate::ExtractionEngine::handle_file`] means the run itself could
//! not continue.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for nestex operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for nestex
///
/// Each variant includes contextual information to help diagnose issues.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The setting key that caused the error (e.g., "MAX_DEPTH")
        key: Option<String>,
    },

    /// Extraction-related error (classification, analysis, unpacking)
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// External tool execution failed (7z, unar, pea)
    #[error("external tool error: {0}")]
    ExternalTool(String),

    /// Operation not supported (missing capability, not implemented, etc.)
    #[error("not supported: {0}")]
    NotSupported(String),
}

impl Error {
    /// Shorthand for a configuration error tied to a setting key
    pub(crate) fn config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }

    /// Machine-readable error code (e.g., "config_error", "extraction_failed")
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Extraction(e) => match e {
                ExtractionError::ExtractionFailed { .. } => "extraction_failed",
                ExtractionError::PathTraversal { .. } => "path_traversal",
                ExtractionError::ClassificationFailed { .. } => "classification_failed",
                ExtractionError::SizeRetrievalFailed { .. } => "size_retrieval_failed",
                ExtractionError::DestinationUnavailable { .. } => "destination_unavailable",
                ExtractionError::UnreadableInput { .. } => "unreadable_input",
            },
            Error::Io(_) => "io_error",
            Error::Serialization(_) => "serialization_error",
            Error::ExternalTool(_) => "external_tool_error",
            Error::NotSupported(_) => "not_supported",
        }
    }
}

/// Errors raised while classifying, analysing or unpacking a single file
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The unpacking tool reported an error
    #[error("extraction failed for {archive}: {reason}")]
    ExtractionFailed {
        /// The archive that failed to extract
        archive: PathBuf,
        /// The reason extraction failed
        reason: String,
    },

    /// An extracted entry resolved outside of the destination directory
    #[error("path traversal detected in {archive}: {path} is outside the destination")]
    PathTraversal {
        /// The archive that produced the offending entry
        archive: PathBuf,
        /// The offending path after canonicalization
        path: PathBuf,
    },

    /// The file could not be read for type detection
    #[error("could not classify {path}: {reason}")]
    ClassificationFailed {
        /// The file that could not be classified
        path: PathBuf,
        /// The underlying reason
        reason: String,
    },

    /// The tool could not list the archive to estimate its uncompressed size
    #[error("could not retrieve uncompressed size of {archive}: {reason}")]
    SizeRetrievalFailed {
        /// The archive being analysed
        archive: PathBuf,
        /// The underlying reason
        reason: String,
    },

    /// A destination directory could not be prepared
    #[error("destination {path} unavailable: {reason}")]
    DestinationUnavailable {
        /// The destination directory
        path: PathBuf,
        /// The underlying reason
        reason: String,
    },

    /// A root input could not be read or fingerprinted
    #[error("cannot read input {path}: {reason}")]
    UnreadableInput {
        /// The input path
        path: PathBuf,
        /// The underlying reason
        reason: String,
    },
}
