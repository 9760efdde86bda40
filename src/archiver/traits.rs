//! Traits and types for archive unpacking tools

use crate::types::FileClass;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Result of listing an archive without extracting it
#[must_use]
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveAnalysis {
    /// Sum of the uncompressed sizes of all readable entries
    pub uncompressed_size: u64,
    /// Number of file entries (directories excluded)
    pub total_entries: usize,
    /// Number of file entries that require a password
    pub encrypted_entries: usize,
}

/// How much of an archive is password protected
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EncryptionStatus {
    /// No encrypted entries
    None,
    /// Some, but not all, entries are encrypted
    Partial,
    /// Every entry is encrypted
    All,
}

impl ArchiveAnalysis {
    /// Classify the archive's password protection
    pub fn encryption(&self) -> EncryptionStatus {
        if self.encrypted_entries == 0 {
            EncryptionStatus::None
        } else if self.encrypted_entries >= self.total_entries {
            EncryptionStatus::All
        } else {
            EncryptionStatus::Partial
        }
    }
}

/// A regular file produced by an extraction
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtractedEntry {
    /// Location of the file inside the destination directory
    pub path: PathBuf,
    /// On-disk size in bytes
    pub size: u64,
}

/// Capabilities of an unpacking tool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiverCapabilities {
    /// Can report the uncompressed size without extracting
    pub can_analyze: bool,
    /// Can extract archives
    pub can_extract: bool,
}

/// Archive formats a tool declares support for
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FormatSupport {
    /// Lowercased MIME types
    pub mime_types: Vec<String>,
    /// Lowercased extensions without the dot
    pub extensions: Vec<String>,
}

impl FormatSupport {
    /// Build from static lists
    pub fn from_lists(mime_types: &[&str], extensions: &[&str]) -> Self {
        Self {
            mime_types: mime_types.iter().map(|m| m.to_lowercase()).collect(),
            extensions: extensions.iter().map(|e| e.to_lowercase()).collect(),
        }
    }

    /// Whether the MIME type is declared
    pub fn has_mime(&self, mime: &str) -> bool {
        self.mime_types.iter().any(|m| m.eq_ignore_ascii_case(mime))
    }

    /// Whether the extension is declared
    pub fn has_extension(&self, extension: &str) -> bool {
        !extension.is_empty()
            && self
                .extensions
                .iter()
                .any(|e| e.eq_ignore_ascii_case(extension))
    }

    /// Whether a classified file matches by MIME or by extension
    pub fn supports(&self, class: &FileClass) -> bool {
        self.has_mime(&class.mime) || self.has_extension(&class.extension)
    }

    /// Add every format of `other` that is not yet present
    pub fn merge(&mut self, other: &FormatSupport) {
        for mime in &other.mime_types {
            if !self.has_mime(mime) {
                self.mime_types.push(mime.clone());
            }
        }
        for ext in &other.extensions {
            if !self.has_extension(ext) {
                self.extensions.push(ext.clone());
            }
        }
    }
}

/// Interface of an archive unpacking tool
///
/// Implementations wrap an external binary (7z, unar, pea) or an in-process
/// decoder. Every method blocks the calling thread.
pub trait Archiver: Send + Sync {
    /// List the archive and report its uncompressed size and encryption
    ///
    /// # Errors
    ///
    /// Returns `Error::NotSupported` when the tool cannot analyse archives, or
    /// an extraction error when listing failed.
    fn analyze(&self, archive: &Path) -> crate::Result<ArchiveAnalysis>;

    /// Unpack `archive` into `destination` and report every produced file
    ///
    /// `destination` exists and is empty when this is called.
    fn extract(&self, archive: &Path, destination: &Path) -> crate::Result<Vec<ExtractedEntry>>;

    /// Query capabilities of this tool
    fn capabilities(&self) -> ArchiverCapabilities;

    /// Formats this tool handles
    fn formats(&self) -> &FormatSupport;

    /// Human-readable name for logging and reports
    fn name(&self) -> &str;

    /// Uncompressed size without extracting, `None` when unknown
    fn estimate_uncompressed_size(&self, archive: &Path) -> Option<u64> {
        if !self.capabilities().can_analyze {
            return None;
        }
        self.analyze(archive).ok().map(|a| a.uncompressed_size)
    }
}
