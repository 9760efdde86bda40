//! File type detection
//!
//! Classification is a pure function of a file's leading bytes and its name:
//! magic bytes decide first, the extension is consulted when sniffing did not
//! find an archive.

use crate::archiver::FormatSupport;
use crate::error::{Error, ExtractionError, Result};
use crate::types::FileClass;
use infer::MatcherType;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::trace;

/// Number of leading bytes inspected for signatures and text detection
const SNIFF_LEN: usize = 8192;

/// Determines type, MIME and archive-ness of a file
pub trait FileClassifier: Send + Sync {
    /// Classify the file at `path`
    ///
    /// # Errors
    ///
    /// Returns `ExtractionError::ClassificationFailed` when the file cannot be
    /// read.
    fn classify(&self, path: &Path) -> Result<FileClass>;
}

/// Magic-byte classifier built on the `infer` crate
#[derive(Clone, Debug)]
pub struct MagicClassifier {
    known_archives: FormatSupport,
}

impl MagicClassifier {
    /// Classifier treating `known_archives` as the archive formats
    pub fn new(known_archives: FormatSupport) -> Self {
        Self { known_archives }
    }

    /// The formats this classifier reports as archives
    pub fn known_archives(&self) -> &FormatSupport {
        &self.known_archives
    }

    /// Classify in-memory leading bytes of a file named `file_name`
    pub fn classify_bytes(&self, head: &[u8], file_name: &Path) -> FileClass {
        let extension = extension_of(file_name);

        let (file_type, mime) = match infer::get(head) {
            Some(kind) => (
                matcher_label(kind.matcher_type()).to_string(),
                kind.mime_type().to_string(),
            ),
            None if head.is_empty() => ("empty".to_string(), "inode/x-empty".to_string()),
            None if looks_like_text(head) => ("text".to_string(), "text/plain".to_string()),
            None => ("data".to_string(), "application/octet-stream".to_string()),
        };

        let is_archive = self.known_archives.has_mime(&mime)
            || (!head.is_empty() && self.known_archives.has_extension(&extension));

        FileClass {
            file_type,
            mime,
            extension,
            is_archive,
        }
    }
}

impl FileClassifier for MagicClassifier {
    fn classify(&self, path: &Path) -> Result<FileClass> {
        let failed = |reason: String| {
            Error::Extraction(ExtractionError::ClassificationFailed {
                path: path.to_path_buf(),
                reason,
            })
        };

        let mut file = File::open(path).map_err(|e| failed(format!("failed to open: {}", e)))?;
        let mut buffer = vec![0u8; SNIFF_LEN];
        let mut filled = 0;
        while filled < buffer.len() {
            let n = file
                .read(&mut buffer[filled..])
                .map_err(|e| failed(format!("failed to read: {}", e)))?;
            if n == 0 {
                break;
            }
            filled += n;
        }

        let class = self.classify_bytes(&buffer[..filled], path);
        trace!(?path, mime = %class.mime, is_archive = class.is_archive, "classified");
        Ok(class)
    }
}

/// Lowercased extension without the dot, empty when absent
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

fn matcher_label(matcher: MatcherType) -> &'static str {
    match matcher {
        MatcherType::App => "application",
        MatcherType::Archive => "archive",
        MatcherType::Audio => "audio",
        MatcherType::Book => "book",
        MatcherType::Doc => "document",
        MatcherType::Font => "font",
        MatcherType::Image => "image",
        MatcherType::Text => "text",
        MatcherType::Video => "video",
        MatcherType::Custom => "custom",
    }
}

/// No NUL bytes and valid UTF-8, allowing a code point cut at the buffer end
fn looks_like_text(head: &[u8]) -> bool {
    if head.contains(&0) {
        return false;
    }
    match std::str::from_utf8(head) {
        Ok(_) => true,
        Err(e) => e.error_len().is_none() && head.len() == SNIFF_LEN,
    }
}
