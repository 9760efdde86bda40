//! Depth-first traversal driven by an explicit work stack

use super::ExtractionEngine;
use super::cleanup::{DeletionDecision, deletion_decision};
use crate::archiver::{EncryptionStatus, Selection};
use crate::budget::{Admission, BudgetTracker, Candidate};
use crate::classify::extension_of;
use crate::dedup::{FileDigest, Observation, fingerprint_file};
use crate::error::{Error, ExtractionError, Result};
use crate::types::{FileClass, Fingerprint, RunSummary, TrackedFile};
use crate::utils::get_available_space;
use crate::warnings::WarningCode;
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace};

/// A file waiting to be processed
struct Node {
    path: PathBuf,
    depth: u32,
    parent: Option<Fingerprint>,
    /// Digest computed when the parent was unpacked
    digest: Option<FileDigest>,
}

/// An extracted archive whose children are still being processed
struct PendingArchive {
    fingerprint: Fingerprint,
    children: Vec<ChildRef>,
}

/// What a pending archive remembers about one produced file
struct ChildRef {
    path: PathBuf,
    size: u64,
    fingerprint: Option<Fingerprint>,
}

enum Task {
    Visit(Node),
    /// Runs once every child pushed after it has been resolved
    Finish(PendingArchive),
}

/// Per-run state
struct Run {
    budget: BudgetTracker,
    summary: RunSummary,
    extract_root: PathBuf,
}

impl ExtractionEngine {
    pub(super) fn run(&mut self, path: &Path) -> Result<()> {
        let warnings_before = self.warnings.len();
        let extract_root = self.config.extract_dir.clone();
        super::ensure_extract_dir(&extract_root)?;

        let digest = fingerprint_file(path).map_err(|e| {
            Error::Extraction(ExtractionError::UnreadableInput {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
        })?;

        info!(?path, fingerprint = %digest.fingerprint, "processing input");

        let mut run = Run {
            budget: BudgetTracker::new(self.config.budget.clone()),
            summary: RunSummary {
                root: path.to_path_buf(),
                ..RunSummary::default()
            },
            extract_root,
        };

        let mut stack = vec![Task::Visit(Node {
            path: path.to_path_buf(),
            depth: 0,
            parent: None,
            digest: Some(digest),
        })];

        while let Some(task) = stack.pop() {
            match task {
                Task::Visit(node) => self.visit(node, &mut run, &mut stack)?,
                Task::Finish(pending) => self.finish_archive(pending),
            }
        }

        run.summary.total_extracted_bytes = run.budget.ledger().total_extracted_bytes;
        run.summary.warnings = self.warnings.len() - warnings_before;

        info!(
            ?path,
            total_extracted_bytes = run.summary.total_extracted_bytes,
            archives_extracted = run.summary.archives_extracted,
            max_depth_reached = run.summary.max_depth_reached,
            warnings = run.summary.warnings,
            "input processed"
        );
        self.last_run = Some(run.summary);
        Ok(())
    }

    fn visit(&mut self, node: Node, run: &mut Run, stack: &mut Vec<Task>) -> Result<()> {
        let digest = match node.digest {
            Some(digest) => digest,
            None => match fingerprint_file(&node.path) {
                Ok(digest) => digest,
                Err(e) => {
                    self.warnings.record(
                        WarningCode::ClassificationFailed,
                        &node.path,
                        format!("failed to read file for fingerprinting: {}", e),
                    );
                    return Ok(());
                }
            },
        };
        let fingerprint = digest.fingerprint;
        run.summary.max_depth_reached = run.summary.max_depth_reached.max(node.depth);

        if let Observation::Duplicate { of } = self.dedup.observe(&fingerprint, &node.path) {
            if let Some(entry) = self.tracked.get_mut(&fingerprint)
                && entry.path != node.path
                && !entry.duplicate_paths.contains(&node.path)
            {
                entry.duplicate_paths.push(node.path.clone());
            }
            self.warnings.record(
                WarningCode::DuplicateContent,
                &node.path,
                format!("content identical to {}", of.display()),
            );
            return Ok(());
        }

        let class = match self.classifier.classify(&node.path) {
            Ok(class) => class,
            Err(e) => {
                self.warnings.record(
                    WarningCode::ClassificationFailed,
                    &node.path,
                    e.to_string(),
                );
                FileClass::unknown(extension_of(&node.path))
            }
        };

        trace!(
            path = ?node.path,
            depth = node.depth,
            mime = %class.mime,
            is_archive = class.is_archive,
            "file registered"
        );

        let is_archive = class.is_archive;
        self.tracked.insert(
            fingerprint.clone(),
            TrackedFile::new(
                fingerprint.clone(),
                node.path.clone(),
                digest.size,
                class.clone(),
                node.parent,
                node.depth,
            ),
        );

        if !is_archive {
            return Ok(());
        }

        self.expand_archive(&fingerprint, &node.path, digest.size, &class, node.depth, run, stack)
    }

    #[allow(clippy::too_many_arguments)]
    fn expand_archive(
        &mut self,
        fingerprint: &Fingerprint,
        path: &Path,
        size: u64,
        class: &FileClass,
        depth: u32,
        run: &mut Run,
        stack: &mut Vec<Task>,
    ) -> Result<()> {
        let Self {
            registry,
            tracked,
            dedup,
            warnings,
            ..
        } = self;

        run.budget.enter(depth);
        if let Some(reason) = run.budget.check_depth() {
            warnings.record(reason.code(), path, reason.to_string());
            return Ok(());
        }

        let archiver = match registry.select(class) {
            Selection::Found(archiver) => archiver,
            Selection::Missing { tools } => {
                warnings.record(
                    WarningCode::MissingArchiver,
                    path,
                    format!(
                        "{} archive needs {} which is not installed",
                        class.mime,
                        tools.join(" or ")
                    ),
                );
                return Ok(());
            }
            Selection::Unsupported => {
                warnings.record(
                    WarningCode::NoArchiver,
                    path,
                    format!(
                        "no known tool supports {} (extension '{}')",
                        class.mime, class.extension
                    ),
                );
                return Ok(());
            }
        };

        // Recorded only once the archive is unpacked; otherwise folded into
        // the warning that ends it
        let mut notes: Vec<(WarningCode, String)> = Vec::new();
        let mut estimate = None;
        if archiver.capabilities().can_analyze {
            match archiver.analyze(path) {
                Ok(analysis) => {
                    let encryption = analysis.encryption();
                    let (encrypted, total) = (analysis.encrypted_entries, analysis.total_entries);
                    estimate = Some(analysis.uncompressed_size);
                    if let Some(entry) = tracked.get_mut(fingerprint) {
                        entry.analysis = Some(analysis);
                    }

                    match encryption {
                        EncryptionStatus::All => {
                            warnings.record(
                                WarningCode::PasswordProtectedSkipped,
                                path,
                                format!("all {total} entries are password protected"),
                            );
                            return Ok(());
                        }
                        EncryptionStatus::Partial => notes.push((
                            WarningCode::PasswordProtectedDetected,
                            format!(
                                "{encrypted} of {total} entries are password protected and will be skipped"
                            ),
                        )),
                        EncryptionStatus::None => {}
                    }
                }
                Err(e) => notes.push((WarningCode::SizeRetrievalFailed, e.to_string())),
            }
        } else {
            notes.push((
                WarningCode::SizeRetrievalFailed,
                format!(
                    "{} cannot report the uncompressed size, extracting without size checks",
                    archiver.name()
                ),
            ));
        }

        let free_space = match get_available_space(&run.extract_root) {
            Ok(free) => Some(free),
            Err(e) => {
                debug!(error = %e, "free space probe failed, skipping disk check");
                None
            }
        };

        let candidate = Candidate {
            compressed_size: size,
            estimate,
            free_space,
        };
        if let Admission::Reject(reason) = run.budget.admit(&candidate) {
            warnings.record(reason.code(), path, with_notes(reason.to_string(), &notes));
            return Ok(());
        }

        let destination = run.extract_root.join(fingerprint.as_str());
        prepare_destination(&destination)?;

        debug!(
            tool = archiver.name(),
            ?path,
            ?destination,
            ?estimate,
            depth,
            "extracting archive"
        );

        let entries = match archiver.extract(path, &destination) {
            Ok(entries) => entries,
            Err(e) => {
                warnings.record(
                    WarningCode::ExtractionFailed,
                    path,
                    with_notes(e.to_string(), &notes),
                );
                return Ok(());
            }
        };

        for (code, message) in notes {
            warnings.record(code, path, message);
        }
        if let Some(entry) = tracked.get_mut(fingerprint) {
            entry.archiver = Some(archiver.name().to_string());
        }
        run.summary.archives_extracted += 1;

        let mut children = Vec::with_capacity(entries.len());
        let mut nodes = Vec::with_capacity(entries.len());
        for produced in entries {
            let digest = match fingerprint_file(&produced.path) {
                Ok(digest) => {
                    let known = dedup.contains(&digest.fingerprint);
                    run.budget
                        .commit_entry(&digest.fingerprint, digest.size, known);
                    Some(digest)
                }
                Err(e) => {
                    // Reported when the child is visited
                    trace!(path = ?produced.path, error = %e, "could not fingerprint extracted file");
                    run.budget.commit_bytes(produced.size);
                    None
                }
            };

            children.push(ChildRef {
                path: produced.path.clone(),
                size: digest.as_ref().map_or(produced.size, |d| d.size),
                fingerprint: digest.as_ref().map(|d| d.fingerprint.clone()),
            });
            nodes.push(Node {
                path: produced.path,
                depth: depth + 1,
                parent: Some(fingerprint.clone()),
                digest,
            });
        }

        stack.push(Task::Finish(PendingArchive {
            fingerprint: fingerprint.clone(),
            children,
        }));
        stack.extend(nodes.into_iter().rev().map(Task::Visit));

        Ok(())
    }

    fn finish_archive(&mut self, pending: PendingArchive) {
        let extracted_size: u64 = pending
            .children
            .iter()
            .map(|child| {
                let nested = child
                    .fingerprint
                    .as_ref()
                    .and_then(|fp| self.tracked.get(fp))
                    .filter(|entry| {
                        entry.path == child.path
                            && entry.parent_fingerprint.as_ref() == Some(&pending.fingerprint)
                    })
                    .and_then(|entry| entry.extracted_size)
                    .unwrap_or(0);
                child.size.saturating_add(nested)
            })
            .fold(0u64, u64::saturating_add);

        let Some(entry) = self.tracked.get_mut(&pending.fingerprint) else {
            return;
        };
        entry.finish_extraction(extracted_size);
        debug!(
            path = ?entry.path,
            extracted_size,
            compression_ratio = ?entry.compression_ratio,
            "archive resolved"
        );

        match deletion_decision(&self.config.deletion, entry) {
            DeletionDecision::Disabled => {}
            DeletionDecision::EncryptedEntries(count) => info!(
                path = ?entry.path,
                encrypted_entries = count,
                "archive kept, password protected entries were not extracted"
            ),
            DeletionDecision::ProtectedExtension(ext) => self.warnings.record(
                WarningCode::SkipDeleteExtension,
                &entry.path,
                format!("archive kept, extension '{ext}' is protected"),
            ),
            DeletionDecision::ProtectedMime(mime) => self.warnings.record(
                WarningCode::SkipDeleteMimetype,
                &entry.path,
                format!("archive kept, MIME type '{mime}' is protected"),
            ),
            DeletionDecision::Delete => match std::fs::remove_file(&entry.path) {
                Ok(()) => {
                    entry.deleted = true;
                    info!(path = ?entry.path, "archive deleted after extraction");
                }
                Err(e) => self.warnings.record(
                    WarningCode::DeletionFailed,
                    &entry.path,
                    format!("failed to delete archive: {}", e),
                ),
            },
        }
    }
}

/// Append the deferred notes of an archive to the message that ends it
fn with_notes(message: String, notes: &[(WarningCode, String)]) -> String {
    notes
        .iter()
        .fold(message, |acc, (_, note)| format!("{acc}; {note}"))
}

/// Give an archive an empty destination, clearing leftovers of earlier runs
fn prepare_destination(destination: &Path) -> Result<()> {
    let unavailable = |e: std::io::Error| {
        Error::Extraction(ExtractionError::DestinationUnavailable {
            path: destination.to_path_buf(),
            reason: e.to_string(),
        })
    };

    if destination.exists() {
        debug!(?destination, "clearing previous extraction");
        std::fs::remove_dir_all(destination).map_err(unavailable)?;
    }
    std::fs::create_dir_all(destination).map_err(unavailable)
}
