//! Structured warnings collected during extraction
//!
//! Anomalies that do not stop a traversal (budget rejections, missing tools,
//! failed deletions, ...) are recorded here instead of being returned as
//! errors. The log is append-only and keeps occurrence order; the same code
//! may appear many times for different files.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Machine-readable warning codes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WarningCode {
    /// Post-extraction delete of the archive file failed
    DeletionFailed,
    /// The selected tool's extract operation reported an error
    ExtractionFailed,
    /// Single-archive size budget exceeded
    MaxArchiveSizeBytes,
    /// Nesting depth budget exceeded
    MaxDepth,
    /// Cumulative run budget exceeded
    MaxTotalSizeBytes,
    /// Compression ratio below the safety floor
    MinArchiveRatio,
    /// Projected free space below the floor
    MinDiskFreeSpace,
    /// Format recognised, but the tool that handles it is not installed
    MissingArchiver,
    /// Format recognised, but no known tool supports it
    NoArchiver,
    /// Pre-flight size estimate unavailable
    SizeRetrievalFailed,
    /// Deletion skipped because of a protected extension
    SkipDeleteExtension,
    /// Deletion skipped because of a protected MIME type
    SkipDeleteMimetype,
    /// Content already tracked under another path
    DuplicateContent,
    /// File could not be read for fingerprinting or classification
    ClassificationFailed,
    /// Archive listing shows encrypted entries
    PasswordProtectedDetected,
    /// Every entry is encrypted, extraction skipped
    PasswordProtectedSkipped,
}

impl WarningCode {
    /// Every code, in declaration order
    pub const ALL: [WarningCode; 16] = [
        WarningCode::DeletionFailed,
        WarningCode::ExtractionFailed,
        WarningCode::MaxArchiveSizeBytes,
        WarningCode::MaxDepth,
        WarningCode::MaxTotalSizeBytes,
        WarningCode::MinArchiveRatio,
        WarningCode::MinDiskFreeSpace,
        WarningCode::MissingArchiver,
        WarningCode::NoArchiver,
        WarningCode::SizeRetrievalFailed,
        WarningCode::SkipDeleteExtension,
        WarningCode::SkipDeleteMimetype,
        WarningCode::DuplicateContent,
        WarningCode::ClassificationFailed,
        WarningCode::PasswordProtectedDetected,
        WarningCode::PasswordProtectedSkipped,
    ];

    /// The wire name of the code
    pub fn as_str(self) -> &'static str {
        match self {
            WarningCode::DeletionFailed => "DELETION_FAILED",
            WarningCode::ExtractionFailed => "EXTRACTION_FAILED",
            WarningCode::MaxArchiveSizeBytes => "MAX_ARCHIVE_SIZE_BYTES",
            WarningCode::MaxDepth => "MAX_DEPTH",
            WarningCode::MaxTotalSizeBytes => "MAX_TOTAL_SIZE_BYTES",
            WarningCode::MinArchiveRatio => "MIN_ARCHIVE_RATIO",
            WarningCode::MinDiskFreeSpace => "MIN_DISK_FREE_SPACE",
            WarningCode::MissingArchiver => "MISSING_ARCHIVER",
            WarningCode::NoArchiver => "NO_ARCHIVER",
            WarningCode::SizeRetrievalFailed => "SIZE_RETRIEVAL_FAILED",
            WarningCode::SkipDeleteExtension => "SKIP_DELETE_EXTENSION",
            WarningCode::SkipDeleteMimetype => "SKIP_DELETE_MIMETYPE",
            WarningCode::DuplicateContent => "DUPLICATE_CONTENT",
            WarningCode::ClassificationFailed => "CLASSIFICATION_FAILED",
            WarningCode::PasswordProtectedDetected => "PASSWORD_PROTECTED_DETECTED",
            WarningCode::PasswordProtectedSkipped => "PASSWORD_PROTECTED_SKIPPED",
        }
    }
}

impl std::fmt::Display for WarningCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for WarningCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        WarningCode::ALL
            .into_iter()
            .find(|code| code.as_str() == upper)
            .ok_or_else(|| format!("unknown warning code: {s}"))
    }
}

/// One recorded anomaly
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExtractionWarning {
    /// What happened
    pub code: WarningCode,
    /// The file the warning is about
    pub path: PathBuf,
    /// Human-readable context
    pub message: String,
}

impl std::fmt::Display for ExtractionWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {} ({})", self.code, self.message, self.path.display())
    }
}

/// Ordered, append-only warning log
#[derive(Debug, Default)]
pub struct WarningSink {
    entries: Vec<ExtractionWarning>,
}

impl WarningSink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a warning and emit it as a log event
    pub fn record(&mut self, code: WarningCode, path: &Path, message: impl Into<String>) {
        let message = message.into();
        warn!(%code, ?path, "{}", message);
        self.entries.push(ExtractionWarning {
            code,
            path: path.to_path_buf(),
            message,
        });
    }

    /// All warnings in occurrence order
    pub fn entries(&self) -> &[ExtractionWarning] {
        &self.entries
    }

    /// Number of recorded warnings
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether at least one warning with `code` was recorded
    pub fn contains(&self, code: WarningCode) -> bool {
        self.entries.iter().any(|w| w.code == code)
    }

    /// Remove and return every recorded warning
    pub fn drain(&mut self) -> Vec<ExtractionWarning> {
        std::mem::take(&mut self.entries)
    }
}
