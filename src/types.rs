//! Core types for nestex

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::archiver::ArchiveAnalysis;

/// Content fingerprint: lowercase hex SHA-256 of a file's full byte stream
///
/// Two files share a fingerprint if and only if they are bit-identical, which
/// makes it the key of the tracked-file registry.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Wrap an already computed hex digest
    pub fn new(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    /// Get the hex digest
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Fingerprint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Result of classifying a file by content and name
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileClass {
    /// Short description of the detected kind (e.g., "archive", "text", "data")
    pub file_type: String,
    /// Detected MIME type
    pub mime: String,
    /// Lowercased file extension without the dot (empty when absent)
    pub extension: String,
    /// Whether the file is in a known archive format
    pub is_archive: bool,
}

impl FileClass {
    /// Classification used when a file could not be read
    pub fn unknown(extension: impl Into<String>) -> Self {
        Self {
            file_type: "unknown".to_string(),
            mime: "application/octet-stream".to_string(),
            extension: extension.into(),
            is_archive: false,
        }
    }
}

/// One entry per distinct piece of content met during extraction
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrackedFile {
    /// Content fingerprint, unique within the registry
    pub fingerprint: Fingerprint,
    /// Location at which the content was first seen
    pub path: PathBuf,
    /// On-disk size in bytes
    pub size: u64,
    /// Short description of the detected kind
    #[serde(rename = "type")]
    pub file_type: String,
    /// Detected MIME type
    pub mime: String,
    /// Lowercased extension without the dot
    pub extension: String,
    /// Whether the content was classified as an archive
    pub is_archive: bool,
    /// Full descendant weight, set once after a successful extraction
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted_size: Option<u64>,
    /// `size / extracted_size`, set together with `extracted_size`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compression_ratio: Option<f64>,
    /// Whether the archive bytes were removed after extraction
    pub deleted: bool,
    /// Archive that produced this file, `None` for a root
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_fingerprint: Option<Fingerprint>,
    /// Nesting level at which the content was first seen (root = 0)
    pub depth: u32,
    /// Name of the tool that unpacked this archive
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archiver: Option<String>,
    /// Pre-flight listing result, when the tool could analyse the archive
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<ArchiveAnalysis>,
    /// Further paths at which the same content was met
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub duplicate_paths: Vec<PathBuf>,
}

impl TrackedFile {
    /// Build a fresh registry entry from a classification
    pub(crate) fn new(
        fingerprint: Fingerprint,
        path: PathBuf,
        size: u64,
        class: FileClass,
        parent_fingerprint: Option<Fingerprint>,
        depth: u32,
    ) -> Self {
        Self {
            fingerprint,
            path,
            size,
            file_type: class.file_type,
            mime: class.mime,
            extension: class.extension,
            is_archive: class.is_archive,
            extracted_size: None,
            compression_ratio: None,
            deleted: false,
            parent_fingerprint,
            depth,
            archiver: None,
            analysis: None,
            duplicate_paths: Vec::new(),
        }
    }

    /// Record the outcome of a successful extraction
    ///
    /// Returns `false` without changing anything when the entry is not an
    /// archive or the values were already set.
    pub(crate) fn finish_extraction(&mut self, extracted_size: u64) -> bool {
        if !self.is_archive || self.extracted_size.is_some() {
            return false;
        }
        self.extracted_size = Some(extracted_size);
        self.compression_ratio = if extracted_size > 0 {
            Some(self.size as f64 / extracted_size as f64)
        } else {
            None
        };
        true
    }
}

/// Totals of the most recent `handle_file` run
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Root file of the run
    pub root: PathBuf,
    /// Bytes of new content written to disk during the run
    pub total_extracted_bytes: u64,
    /// Number of archives successfully unpacked
    pub archives_extracted: usize,
    /// Deepest nesting level visited
    pub max_depth_reached: u32,
    /// Number of warnings recorded during the run
    pub warnings: usize,
}
