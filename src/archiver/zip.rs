//! In-process ZIP archiver

use super::catalog::ArchiverKind;
use super::shared::{collect_extracted_entries, extraction_failed, size_retrieval_failed};
use super::traits::{ArchiveAnalysis, Archiver, ArchiverCapabilities, ExtractedEntry, FormatSupport};
use crate::error::{Error, ExtractionError, Result};
use std::fs::File;
use std::path::Path;
use tracing::{debug, info};
use ::zip::ZipArchive;
use ::zip::result::ZipError;

/// Archiver for ZIP and ZIP-based formats (jar, apk, docx, ...)
///
/// Always available. Entries that need a password are counted during
/// analysis and skipped during extraction.
pub struct ZipArchiver {
    formats: FormatSupport,
}

impl ZipArchiver {
    /// Create the archiver with its default format list
    pub fn new() -> Self {
        Self {
            formats: ArchiverKind::BuiltinZip.formats(),
        }
    }

    fn open(archive_path: &Path) -> std::result::Result<ZipArchive<File>, String> {
        let file = File::open(archive_path).map_err(|e| format!("failed to open ZIP archive: {}", e))?;
        ZipArchive::new(file).map_err(|e| format!("failed to read ZIP archive: {}", e))
    }

    /// Extract a single ZIP entry to disk, creating directories as needed
    fn extract_zip_entry(
        mut file: ::zip::read::ZipFile,
        dest_path: &Path,
        archive_path: &Path,
    ) -> Result<()> {
        let file_path = match file.enclosed_name() {
            Some(path) => dest_path.join(path),
            None => {
                return Err(Error::Extraction(ExtractionError::PathTraversal {
                    archive: archive_path.to_path_buf(),
                    path: dest_path.join(file.name()),
                }));
            }
        };

        if file.is_dir() {
            std::fs::create_dir_all(&file_path).map_err(|e| {
                extraction_failed(archive_path, format!("failed to create directory: {}", e))
            })?;
            return Ok(());
        }

        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                extraction_failed(
                    archive_path,
                    format!("failed to create parent directories: {}", e),
                )
            })?;
        }

        let mut outfile = File::create(&file_path).map_err(|e| {
            extraction_failed(archive_path, format!("failed to create output file: {}", e))
        })?;

        std::io::copy(&mut file, &mut outfile).map_err(|e| {
            extraction_failed(archive_path, format!("failed to extract {}: {}", file.name(), e))
        })?;

        Ok(())
    }
}

impl Default for ZipArchiver {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether opening an entry failed because it needs a password
fn is_password_error(error: &ZipError) -> bool {
    let err_str = error.to_string().to_lowercase();
    matches!(error, ZipError::UnsupportedArchive(_))
        && (err_str.contains("password") || err_str.contains("encrypted"))
}

impl Archiver for ZipArchiver {
    fn analyze(&self, archive_path: &Path) -> Result<ArchiveAnalysis> {
        let mut archive =
            Self::open(archive_path).map_err(|reason| size_retrieval_failed(archive_path, reason))?;

        let mut analysis = ArchiveAnalysis::default();

        for i in 0..archive.len() {
            let (is_dir, size) = {
                let raw = archive.by_index_raw(i).map_err(|e| {
                    size_retrieval_failed(archive_path, format!("failed to read ZIP entry: {}", e))
                })?;
                (raw.is_dir(), raw.size())
            };
            if is_dir {
                continue;
            }

            analysis.total_entries += 1;
            analysis.uncompressed_size = analysis.uncompressed_size.saturating_add(size);

            if let Err(e) = archive.by_index(i) {
                if is_password_error(&e) {
                    analysis.encrypted_entries += 1;
                } else {
                    return Err(size_retrieval_failed(
                        archive_path,
                        format!("failed to read ZIP entry: {}", e),
                    ));
                }
            }
        }

        debug!(
            ?archive_path,
            uncompressed_size = analysis.uncompressed_size,
            entries = analysis.total_entries,
            encrypted = analysis.encrypted_entries,
            "ZIP analysis complete"
        );
        Ok(analysis)
    }

    fn extract(&self, archive_path: &Path, dest_path: &Path) -> Result<Vec<ExtractedEntry>> {
        debug!(?archive_path, ?dest_path, "attempting ZIP extraction");

        let mut archive =
            Self::open(archive_path).map_err(|reason| extraction_failed(archive_path, reason))?;

        let mut skipped_encrypted = 0usize;
        for i in 0..archive.len() {
            match archive.by_index(i) {
                Ok(file) => Self::extract_zip_entry(file, dest_path, archive_path)?,
                Err(e) if is_password_error(&e) => {
                    skipped_encrypted += 1;
                }
                Err(e) => {
                    return Err(extraction_failed(
                        archive_path,
                        format!("failed to read ZIP entry: {}", e),
                    ));
                }
            }
        }

        let entries = collect_extracted_entries(archive_path, dest_path)?;
        info!(
            ?archive_path,
            extracted_count = entries.len(),
            skipped_encrypted,
            "ZIP extraction successful"
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
        "builtin-zip"
    }
}
