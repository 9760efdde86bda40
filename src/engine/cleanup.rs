//! Post-extraction deletion of archive files

use crate::config::DeletionConfig;
use crate::types::TrackedFile;

/// What to do with an archive once its subtree is resolved
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum DeletionDecision {
    /// Deletion is turned off
    Disabled,
    /// Kept because this many entries could not be unpacked without a password
    EncryptedEntries(usize),
    /// Kept because the extension is protected
    ProtectedExtension(String),
    /// Kept because the MIME type is protected
    ProtectedMime(String),
    /// Remove the file
    Delete,
}

/// Decide the fate of an extracted archive
///
/// Archives with password protected entries are always kept. Extension rules
/// are checked before MIME rules, both case-insensitively.
pub(crate) fn deletion_decision(config: &DeletionConfig, entry: &TrackedFile) -> DeletionDecision {
    if !config.delete_archives_after_extraction {
        return DeletionDecision::Disabled;
    }

    if let Some(analysis) = &entry.analysis
        && analysis.encrypted_entries > 0
    {
        return DeletionDecision::EncryptedEntries(analysis.encrypted_entries);
    }

    if !entry.extension.is_empty()
        && config
            .skip_delete_extensions
            .iter()
            .any(|ext| ext.trim_start_matches('.').eq_ignore_ascii_case(&entry.extension))
    {
        return DeletionDecision::ProtectedExtension(entry.extension.clone());
    }

    if config
        .skip_delete_mimetypes
        .iter()
        .any(|mime| mime.eq_ignore_ascii_case(&entry.mime))
    {
        return DeletionDecision::ProtectedMime(entry.mime.clone());
    }

    DeletionDecision::Delete
}
