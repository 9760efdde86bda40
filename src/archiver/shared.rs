//! Helpers shared by every archiver implementation

use super::traits::ExtractedEntry;
use crate::error::{Error, ExtractionError, Result};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use tracing::debug;
use walkdir::WalkDir;

/// Shorthand for an `ExtractionFailed` error
pub(crate) fn extraction_failed(archive: &Path, reason: impl Into<String>) -> Error {
    Error::Extraction(ExtractionError::ExtractionFailed {
        archive: archive.to_path_buf(),
        reason: reason.into(),
    })
}

/// Shorthand for a `SizeRetrievalFailed` error
pub(crate) fn size_retrieval_failed(archive: &Path, reason: impl Into<String>) -> Error {
    Error::Extraction(ExtractionError::SizeRetrievalFailed {
        archive: archive.to_path_buf(),
        reason: reason.into(),
    })
}

/// Run an external tool to completion with stdin closed
///
/// A closed stdin turns any interactive prompt (passwords, overwrite
/// confirmation) into an immediate failure instead of a hang.
pub(crate) fn run_tool<I, S>(binary: &Path, args: I) -> Result<Output>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let output = Command::new(binary)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| {
            Error::ExternalTool(format!("Failed to execute {}: {}", binary.display(), e))
        })?;

    debug!(
        binary = %binary.display(),
        status = ?output.status.code(),
        stdout_len = output.stdout.len(),
        stderr_len = output.stderr.len(),
        "external tool finished"
    );
    Ok(output)
}

/// Scan `destination` after an extraction and report every regular file
///
/// Every path is validated to stay inside `destination`: a symlink that
/// resolves outside of it (or cannot be resolved at all) fails the whole
/// extraction with `PathTraversal`. Symlinks that stay inside are not
/// reported, the file they point to already is. Entries come back sorted by
/// path so traversal order does not depend on the filesystem.
pub(crate) fn collect_extracted_entries(
    archive: &Path,
    destination: &Path,
) -> Result<Vec<ExtractedEntry>> {
    let canonical_dest = destination.canonicalize().map_err(|e| {
        extraction_failed(
            archive,
            format!("failed to canonicalize destination path: {}", e),
        )
    })?;

    let mut entries = Vec::new();

    for entry in WalkDir::new(destination)
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry = entry
            .map_err(|e| extraction_failed(archive, format!("failed to scan output: {}", e)))?;
        let path = entry.path();

        if entry.path_is_symlink() {
            match path.canonicalize() {
                Ok(target) if target.starts_with(&canonical_dest) => {
                    debug!(?path, "skipping internal symlink");
                    continue;
                }
                Ok(target) => return Err(path_traversal(archive, target)),
                Err(_) => return Err(path_traversal(archive, path.to_path_buf())),
            }
        }

        if !entry.file_type().is_file() {
            continue;
        }

        let size = entry
            .metadata()
            .map_err(|e| extraction_failed(archive, format!("failed to stat {:?}: {}", path, e)))?
            .len();

        entries.push(ExtractedEntry {
            path: path.to_path_buf(),
            size,
        });
    }

    Ok(entries)
}

fn path_traversal(archive: &Path, path: PathBuf) -> Error {
    Error::Extraction(ExtractionError::PathTraversal {
        archive: archive.to_path_buf(),
        path,
    })
}
