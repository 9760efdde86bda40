//! In-process 7z archiver

use super::catalog::ArchiverKind;
use super::shared::{collect_extracted_entries, extraction_failed, size_retrieval_failed};
use super::traits::{ArchiveAnalysis, Archiver, ArchiverCapabilities, ExtractedEntry, FormatSupport};
use crate::error::Result;
use sevenz_rust::{Password, SevenZReader};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, info};

/// Archiver for 7z files decoded with `sevenz-rust`
///
/// Always available. Archives that need a password fail both analysis and
/// extraction, which leaves the external `7z` tool as the way to detect
/// per-entry encryption.
pub struct SevenZArchiver {
    formats: FormatSupport,
}

impl SevenZArchiver {
    /// Create the archiver with its default format list
    pub fn new() -> Self {
        Self {
            formats: ArchiverKind::BuiltinSevenZip.formats(),
        }
    }
}

impl Default for SevenZArchiver {
    fn default() -> Self {
        Self::new()
    }
}

impl Archiver for SevenZArchiver {
    fn analyze(&self, archive_path: &Path) -> Result<ArchiveAnalysis> {
        let file = File::open(archive_path).map_err(|e| {
            size_retrieval_failed(archive_path, format!("failed to open 7z archive: {}", e))
        })?;
        let len = file
            .metadata()
            .map_err(|e| size_retrieval_failed(archive_path, format!("failed to stat 7z archive: {}", e)))?
            .len();

        let reader = SevenZReader::new(BufReader::new(file), len, Password::empty()).map_err(|e| {
            size_retrieval_failed(archive_path, format!("failed to read 7z headers: {}", e))
        })?;

        let mut analysis = ArchiveAnalysis::default();
        for entry in reader.archive().files.iter().filter(|f| !f.is_directory()) {
            analysis.total_entries += 1;
            analysis.uncompressed_size = analysis.uncompressed_size.saturating_add(entry.size());
        }

        debug!(
            ?archive_path,
            uncompressed_size = analysis.uncompressed_size,
            entries = analysis.total_entries,
            "7z analysis complete"
        );
        Ok(analysis)
    }

    fn extract(&self, archive_path: &Path, dest_path: &Path) -> Result<Vec<ExtractedEntry>> {
        debug!(?archive_path, ?dest_path, "attempting 7z extraction");

        sevenz_rust::decompress_file(archive_path, dest_path).map_err(|e| {
            extraction_failed(archive_path, format!("failed to extract 7z archive: {}", e))
        })?;

        // Validate that all extracted files are within dest_path (path traversal protection)
        let entries = collect_extracted_entries(archive_path, dest_path)?;

        info!(
            ?archive_path,
            extracted_count = entries.len(),
            "7z extraction successful"
        );
        Ok(entries)
    }

    fn capabilities(&self) -> ArchiverCapabilities {
        ArchiverCapabilities {
            can_analyze: true,
            can_extract: true,
        }
    }

    fn formats(&self) -> &FormatSupport {
        &self.formats
    }

    fn name(&self) -> &str {
        "builtin-7z"
    }
}
