use super::ExtractionEngine;
use crate::archiver::{
    ArchiveAnalysis, Archiver, ArchiverCapabilities, ArchiverKind, ArchiverRegistry,
    ExtractedEntry, FormatSupport, ZipArchiver,
};
use crate::classify::{FileClassifier, MagicClassifier};
use crate::config::Config;
use crate::error::{Error, ExtractionError};
use crate::test_support::{stored_zip_bytes, write_7z, write_deflated_zip, write_encrypted_zip};
use crate::types::{FileClass, TrackedFile};
use crate::warnings::WarningCode;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Config with built-in tools only and no free-space floor
fn test_config(temp: &TempDir) -> Config {
    let mut config = Config::default();
    config.extract_dir = temp.path().join("extracted");
    config.budget.min_disk_free_space = 0;
    config.tools.search_path = false;
    config.tools.priority = vec![ArchiverKind::BuiltinZip, ArchiverKind::BuiltinSevenZip];
    config
}

fn input_path(temp: &TempDir, name: &str) -> PathBuf {
    let dir = temp.path().join("input");
    std::fs::create_dir_all(&dir).unwrap();
    dir.join(name)
}

fn write_input(temp: &TempDir, name: &str, content: &[u8]) -> PathBuf {
    let path = input_path(temp, name);
    std::fs::write(&path, content).unwrap();
    path
}

fn codes(engine: &ExtractionEngine) -> Vec<WarningCode> {
    engine.warnings().iter().map(|w| w.code).collect()
}

fn entry_at<'a>(engine: &'a ExtractionEngine, path: &Path) -> &'a TrackedFile {
    engine
        .tracked_files()
        .values()
        .find(|f| f.path == path)
        .unwrap_or_else(|| panic!("no tracked entry at {}", path.display()))
}

fn entry_named<'a>(engine: &'a ExtractionEngine, file_name: &str) -> &'a TrackedFile {
    engine
        .tracked_files()
        .values()
        .find(|f| f.path.file_name().is_some_and(|n| n == file_name))
        .unwrap_or_else(|| panic!("no tracked entry named {file_name}"))
}

/// Filesystem change a scripted archiver makes right after unpacking
#[derive(Clone, Copy)]
enum AfterExtract {
    Nothing,
    /// Swap the archive for a directory so it cannot be removed as a file
    BlockArchive,
    /// Remove a produced file but still report it
    DropEntry(&'static str),
}

/// Zip-only archiver with a scripted analysis and optional extraction failure
struct ScriptedArchiver {
    analysis: Option<ArchiveAnalysis>,
    fail_extraction: bool,
    after_extract: AfterExtract,
    inner: ZipArchiver,
    formats: FormatSupport,
}

impl ScriptedArchiver {
    fn new(analysis: Option<ArchiveAnalysis>, fail_extraction: bool) -> Self {
        Self {
            analysis,
            fail_extraction,
            after_extract: AfterExtract::Nothing,
            inner: ZipArchiver::new(),
            formats: FormatSupport::from_lists(&["application/zip"], &["zip"]),
        }
    }

    fn after_extract(mut self, step: AfterExtract) -> Self {
        self.after_extract = step;
        self
    }
}

impl Archiver for ScriptedArchiver {
    fn analyze(&self, _archive: &Path) -> crate::Result<ArchiveAnalysis> {
        self.analysis
            .clone()
            .ok_or_else(|| Error::NotSupported("scripted archiver cannot analyze".into()))
    }

    fn extract(&self, archive: &Path, destination: &Path) -> crate::Result<Vec<ExtractedEntry>> {
        if self.fail_extraction {
            std::fs::write(destination.join("partial.bin"), b"half").unwrap();
            return Err(ExtractionError::ExtractionFailed {
                archive: archive.to_path_buf(),
                reason: "unexpected end of archive".into(),
            }
            .into());
        }
        let entries = self.inner.extract(archive, destination)?;
        match self.after_extract {
            AfterExtract::Nothing => {}
            AfterExtract::BlockArchive => {
                std::fs::remove_file(archive).unwrap();
                std::fs::create_dir(archive).unwrap();
            }
            AfterExtract::DropEntry(name) => {
                for entry in entries.iter().filter(|e| e.path.ends_with(name)) {
                    std::fs::remove_file(&entry.path).unwrap();
                }
            }
        }
        Ok(entries)
    }

    fn capabilities(&self) -> ArchiverCapabilities {
        ArchiverCapabilities {
            can_analyze: self.analysis.is_some(),
            can_extract: true,
        }
    }

    fn formats(&self) -> &FormatSupport {
        &self.formats
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

fn scripted_engine(temp: &TempDir, archiver: ScriptedArchiver) -> ExtractionEngine {
    scripted_engine_with(test_config(temp), archiver)
}

fn scripted_engine_with(config: Config, archiver: ScriptedArchiver) -> ExtractionEngine {
    let mut registry = ArchiverRegistry::empty();
    registry.register(Box::new(archiver));
    let classifier = MagicClassifier::new(registry.known_formats());
    ExtractionEngine::with_components(config, registry, Box::new(classifier)).unwrap()
}

fn analysis(uncompressed_size: u64, total_entries: usize, encrypted_entries: usize) -> ArchiveAnalysis {
    ArchiveAnalysis {
        uncompressed_size,
        total_entries,
        encrypted_entries,
    }
}

/// Magic classifier that fails on one file name
struct RefusingClassifier {
    refused: &'static str,
    inner: MagicClassifier,
}

impl FileClassifier for RefusingClassifier {
    fn classify(&self, path: &Path) -> crate::Result<FileClass> {
        if path.file_name().is_some_and(|n| n == self.refused) {
            return Err(ExtractionError::ClassificationFailed {
                path: path.to_path_buf(),
                reason: "permission denied".into(),
            }
            .into());
        }
        self.inner.classify(path)
    }
}

fn refusing_engine(temp: &TempDir, refused: &'static str) -> ExtractionEngine {
    let config = test_config(temp);
    let registry = ArchiverRegistry::discover(&config.tools);
    let inner = MagicClassifier::new(registry.known_formats());
    ExtractionEngine::with_components(config, registry, Box::new(RefusingClassifier { refused, inner }))
        .unwrap()
}

/// `outer.zip` -> `inner.zip` -> `file.txt`
fn write_two_level(temp: &TempDir) -> (PathBuf, Vec<u8>) {
    let inner = stored_zip_bytes(&[("file.txt", b"payload")]);
    let outer = stored_zip_bytes(&[("inner.zip", &inner)]);
    (write_input(temp, "outer.zip", &outer), inner)
}

// ---------------------------------------------------------------------------
// Traversal
// ---------------------------------------------------------------------------

#[test]
fn plain_file_is_a_single_leaf() {
    let temp = TempDir::new().unwrap();
    let path = write_input(&temp, "notes.txt", b"just some text\n");
    let mut engine = ExtractionEngine::new(test_config(&temp)).unwrap();

    engine.handle_file(&path).unwrap();

    assert_eq!(engine.tracked_files().len(), 1);
    let entry = entry_at(&engine, &path);
    assert!(!entry.is_archive);
    assert_eq!(entry.mime, "text/plain");
    assert_eq!(entry.size, 15);
    assert_eq!(entry.depth, 0);
    assert!(entry.parent_fingerprint.is_none());
    assert!(entry.extracted_size.is_none());
    assert!(engine.warnings().is_empty());

    let summary = engine.last_run().unwrap();
    assert_eq!(summary.archives_extracted, 0);
    assert_eq!(summary.total_extracted_bytes, 0);
}

#[test]
fn nested_archives_are_resolved_depth_first() {
    let temp = TempDir::new().unwrap();
    let (path, inner_bytes) = write_two_level(&temp);
    let mut engine = ExtractionEngine::new(test_config(&temp)).unwrap();

    engine.handle_file(&path).unwrap();

    assert!(engine.warnings().is_empty(), "{:?}", engine.warnings());
    assert_eq!(engine.tracked_files().len(), 3);

    let outer = entry_at(&engine, &path);
    let inner = entry_named(&engine, "inner.zip");
    let leaf = entry_named(&engine, "file.txt");
    let inner_size = inner_bytes.len() as u64;

    assert_eq!(leaf.size, 7);
    assert_eq!(leaf.depth, 2);
    assert_eq!(leaf.parent_fingerprint.as_ref(), Some(&inner.fingerprint));

    assert_eq!(inner.depth, 1);
    assert_eq!(inner.size, inner_size);
    assert_eq!(inner.extracted_size, Some(7));
    assert_eq!(inner.parent_fingerprint.as_ref(), Some(&outer.fingerprint));

    assert_eq!(outer.extracted_size, Some(inner_size + 7));
    let ratio = outer.compression_ratio.unwrap();
    assert!((ratio - outer.size as f64 / (inner_size + 7) as f64).abs() < 1e-12);
    assert_eq!(outer.archiver.as_deref(), Some("builtin-zip"));
    assert!(!outer.deleted);

    // Each archive unpacks under its own fingerprint
    let extract_dir = temp.path().join("extracted");
    assert!(inner.path.starts_with(extract_dir.join(outer.fingerprint.as_str())));
    assert!(leaf.path.starts_with(extract_dir.join(inner.fingerprint.as_str())));

    let summary = engine.last_run().unwrap();
    assert_eq!(summary.archives_extracted, 2);
    assert_eq!(summary.max_depth_reached, 2);
    assert_eq!(summary.total_extracted_bytes, inner_size + 7);
    assert_eq!(summary.warnings, 0);
}

#[test]
fn zip_holding_a_7z_is_unpacked_with_both_decoders() {
    let temp = TempDir::new().unwrap();
    let seven = input_path(&temp, "staging.7z");
    write_7z(&seven, &[("deep.txt", b"from inside 7z")]);
    let seven_bytes = std::fs::read(&seven).unwrap();
    std::fs::remove_file(&seven).unwrap();
    let path = write_input(&temp, "mixed.zip", &stored_zip_bytes(&[("pack.7z", &seven_bytes)]));
    let mut engine = ExtractionEngine::new(test_config(&temp)).unwrap();

    engine.handle_file(&path).unwrap();

    assert!(engine.warnings().is_empty(), "{:?}", engine.warnings());
    let seven_entry = entry_named(&engine, "pack.7z");
    assert_eq!(seven_entry.mime, "application/x-7z-compressed");
    assert_eq!(seven_entry.archiver.as_deref(), Some("builtin-7z"));
    assert_eq!(seven_entry.extracted_size, Some(14));

    let deep = entry_named(&engine, "deep.txt");
    assert_eq!(deep.depth, 2);
    assert!(!deep.is_archive);
}

// ---------------------------------------------------------------------------
// Deduplication
// ---------------------------------------------------------------------------

#[test]
fn resubmitting_content_reports_duplicate() {
    let temp = TempDir::new().unwrap();
    let first = write_input(&temp, "a.txt", b"same bytes");
    let second = write_input(&temp, "b.txt", b"same bytes");
    let mut engine = ExtractionEngine::new(test_config(&temp)).unwrap();

    engine.handle_file(&first).unwrap();
    engine.handle_file(&second).unwrap();

    assert_eq!(engine.tracked_files().len(), 1);
    assert_eq!(codes(&engine), vec![WarningCode::DuplicateContent]);
    assert_eq!(engine.warnings()[0].path, second);
    assert!(engine.warnings()[0].message.contains("a.txt"));

    let entry = entry_at(&engine, &first);
    assert_eq!(entry.duplicate_paths, vec![second.clone()]);

    // Same path again is recorded once
    engine.handle_file(&second).unwrap();
    assert_eq!(entry_at(&engine, &first).duplicate_paths.len(), 1);
    assert_eq!(engine.last_run().unwrap().warnings, 1);
}

#[test]
fn duplicate_members_are_counted_once() {
    let temp = TempDir::new().unwrap();
    let path = write_input(
        &temp,
        "twins.zip",
        &stored_zip_bytes(&[("a.txt", b"twin content"), ("b.txt", b"twin content")]),
    );
    let mut engine = ExtractionEngine::new(test_config(&temp)).unwrap();

    engine.handle_file(&path).unwrap();

    assert_eq!(engine.tracked_files().len(), 2);
    assert_eq!(codes(&engine), vec![WarningCode::DuplicateContent]);

    let leaf = entry_named(&engine, "a.txt");
    assert_eq!(leaf.duplicate_paths.len(), 1);
    assert!(leaf.duplicate_paths[0].ends_with("b.txt"));

    // Both copies were written, but the budget counts the content once
    assert_eq!(entry_at(&engine, &path).extracted_size, Some(24));
    assert_eq!(engine.last_run().unwrap().total_extracted_bytes, 12);
}

#[test]
fn separate_engines_produce_identical_registries() {
    let temp = TempDir::new().unwrap();
    let (path, _) = write_two_level(&temp);

    let mut first = ExtractionEngine::new(test_config(&temp)).unwrap();
    first.handle_file(&path).unwrap();
    let mut second = ExtractionEngine::new(test_config(&temp)).unwrap();
    second.handle_file(&path).unwrap();

    assert!(second.warnings().is_empty(), "{:?}", second.warnings());
    let a: Vec<_> = first
        .tracked_files()
        .values()
        .map(|f| (f.fingerprint.clone(), f.path.clone(), f.size, f.extracted_size))
        .collect();
    let b: Vec<_> = second
        .tracked_files()
        .values()
        .map(|f| (f.fingerprint.clone(), f.path.clone(), f.size, f.extracted_size))
        .collect();
    assert_eq!(a, b);
}

// ---------------------------------------------------------------------------
// Budget
// ---------------------------------------------------------------------------

#[test]
fn oversized_archive_is_not_extracted() {
    let temp = TempDir::new().unwrap();
    let path = write_input(&temp, "big.zip", &stored_zip_bytes(&[("blob.bin", &[7u8; 4096])]));
    let mut config = test_config(&temp);
    config.budget.max_archive_size_bytes = 1024;
    let mut engine = ExtractionEngine::new(config).unwrap();

    engine.handle_file(&path).unwrap();

    assert_eq!(codes(&engine), vec![WarningCode::MaxArchiveSizeBytes]);
    assert_eq!(engine.tracked_files().len(), 1);
    let entry = entry_at(&engine, &path);
    assert!(entry.is_archive);
    assert!(entry.extracted_size.is_none());
    assert_eq!(entry.analysis.as_ref().unwrap().uncompressed_size, 4096);
    assert_eq!(engine.last_run().unwrap().archives_extracted, 0);
}

#[test]
fn depth_limit_stops_at_the_configured_level() {
    let temp = TempDir::new().unwrap();
    let c = stored_zip_bytes(&[("d.txt", b"bottom")]);
    let b = stored_zip_bytes(&[("c.zip", &c)]);
    let path = write_input(&temp, "a.zip", &stored_zip_bytes(&[("b.zip", &b)]));

    let mut config = test_config(&temp);
    config.budget.max_depth = 2;
    let mut engine = ExtractionEngine::new(config).unwrap();
    engine.handle_file(&path).unwrap();

    assert_eq!(codes(&engine), vec![WarningCode::MaxDepth]);
    assert!(engine.warnings()[0].path.ends_with("c.zip"));
    assert!(entry_named(&engine, "c.zip").extracted_size.is_none());
    assert_eq!(engine.tracked_files().len(), 3);

    let temp = TempDir::new().unwrap();
    let path = write_input(&temp, "a.zip", &stored_zip_bytes(&[("b.zip", &b)]));
    let mut config = test_config(&temp);
    config.budget.max_depth = 3;
    let mut engine = ExtractionEngine::new(config).unwrap();
    engine.handle_file(&path).unwrap();

    assert!(engine.warnings().is_empty(), "{:?}", engine.warnings());
    assert_eq!(engine.tracked_files().len(), 4);
    assert_eq!(entry_named(&engine, "d.txt").depth, 3);
}

#[test]
fn depth_limit_is_checked_before_analysis() {
    let temp = TempDir::new().unwrap();
    let (path, _) = write_two_level(&temp);
    let mut engine = scripted_engine(&temp, ScriptedArchiver::new(None, false));
    engine.apply_settings(&[("MAX_DEPTH", "1")]).unwrap();

    engine.handle_file(&path).unwrap();

    let inner = entry_named(&engine, "inner.zip");
    let inner_codes: Vec<_> = engine
        .warnings()
        .iter()
        .filter(|w| w.path == inner.path)
        .map(|w| w.code)
        .collect();
    assert_eq!(inner_codes, vec![WarningCode::MaxDepth]);
    assert_eq!(
        codes(&engine),
        vec![WarningCode::SizeRetrievalFailed, WarningCode::MaxDepth]
    );
    assert!(inner.analysis.is_none());
}

#[test]
fn encrypted_archive_past_the_depth_limit_reports_depth() {
    let temp = TempDir::new().unwrap();
    let locked = input_path(&temp, "locked.zip");
    write_encrypted_zip(&locked, "secret.txt", b"classified", b"hunter2");
    let locked_bytes = std::fs::read(&locked).unwrap();
    std::fs::remove_file(&locked).unwrap();
    let path = write_input(&temp, "outer.zip", &stored_zip_bytes(&[("locked.zip", &locked_bytes)]));
    let mut config = test_config(&temp);
    config.budget.max_depth = 1;
    let mut engine = ExtractionEngine::new(config).unwrap();

    engine.handle_file(&path).unwrap();

    assert_eq!(codes(&engine), vec![WarningCode::MaxDepth]);
    assert!(entry_named(&engine, "locked.zip").analysis.is_none());
}

#[test]
fn unknown_estimate_is_folded_into_the_rejection() {
    let temp = TempDir::new().unwrap();
    let path = write_input(&temp, "small.zip", &stored_zip_bytes(&[("x.txt", b"x")]));
    let mut config = test_config(&temp);
    config.budget.min_disk_free_space = u64::MAX;
    let mut engine = scripted_engine_with(config, ScriptedArchiver::new(None, false));

    engine.handle_file(&path).unwrap();

    assert_eq!(codes(&engine), vec![WarningCode::MinDiskFreeSpace]);
    assert!(engine.warnings()[0].message.contains("cannot report the uncompressed size"));
}

#[test]
fn highly_compressed_archive_is_rejected_by_ratio() {
    let temp = TempDir::new().unwrap();
    let path = input_path(&temp, "bomb.zip");
    write_deflated_zip(&path, &[("zeros.bin", &vec![0u8; 1024 * 1024])]);
    let mut engine = ExtractionEngine::new(test_config(&temp)).unwrap();

    engine.handle_file(&path).unwrap();

    assert_eq!(codes(&engine), vec![WarningCode::MinArchiveRatio]);
    assert!(entry_at(&engine, &path).extracted_size.is_none());

    // A lower floor lets it through
    let temp = TempDir::new().unwrap();
    let path = input_path(&temp, "bomb.zip");
    write_deflated_zip(&path, &[("zeros.bin", &vec![0u8; 1024 * 1024])]);
    let mut config = test_config(&temp);
    config.budget.min_archive_ratio = 0.0001;
    let mut engine = ExtractionEngine::new(config).unwrap();

    engine.handle_file(&path).unwrap();
    assert!(engine.warnings().is_empty(), "{:?}", engine.warnings());
    assert_eq!(entry_at(&engine, &path).extracted_size, Some(1024 * 1024));
}

#[test]
fn run_total_limit_rejects_later_siblings() {
    let temp = TempDir::new().unwrap();
    let first = stored_zip_bytes(&[("one.bin", &[1u8; 100])]);
    let second = stored_zip_bytes(&[("two.bin", &[2u8; 100])]);
    let inner_total = (first.len() + second.len()) as u64;
    let path = write_input(
        &temp,
        "pair.zip",
        &stored_zip_bytes(&[("first.zip", &first), ("second.zip", &second)]),
    );

    let mut config = test_config(&temp);
    config.budget.max_total_size_bytes = inner_total + 150;
    let mut engine = ExtractionEngine::new(config).unwrap();
    engine.handle_file(&path).unwrap();

    assert_eq!(codes(&engine), vec![WarningCode::MaxTotalSizeBytes]);
    assert!(engine.warnings()[0].path.ends_with("second.zip"));
    assert_eq!(entry_named(&engine, "first.zip").extracted_size, Some(100));
    assert!(entry_named(&engine, "second.zip").extracted_size.is_none());
    assert_eq!(engine.last_run().unwrap().total_extracted_bytes, inner_total + 100);
}

#[test]
fn free_space_floor_rejects_extraction() {
    let temp = TempDir::new().unwrap();
    let path = write_input(&temp, "small.zip", &stored_zip_bytes(&[("x.txt", b"x")]));
    let mut config = test_config(&temp);
    config.budget.min_disk_free_space = u64::MAX;
    let mut engine = ExtractionEngine::new(config).unwrap();

    engine.handle_file(&path).unwrap();

    assert_eq!(codes(&engine), vec![WarningCode::MinDiskFreeSpace]);
    assert_eq!(engine.tracked_files().len(), 1);
}

// ---------------------------------------------------------------------------
// Tool selection and failures
// ---------------------------------------------------------------------------

#[test]
fn unsupported_format_reports_no_archiver() {
    let temp = TempDir::new().unwrap();
    let path = write_input(&temp, "packed.lz", &[0x13, 0x37, 0x00, 0xff, 0x42]);
    let mut engine = ExtractionEngine::new(test_config(&temp)).unwrap();

    engine.handle_file(&path).unwrap();

    assert_eq!(codes(&engine), vec![WarningCode::NoArchiver]);
    assert!(entry_at(&engine, &path).is_archive);
}

#[test]
fn uninstalled_tool_reports_missing_archiver() {
    let temp = TempDir::new().unwrap();
    let path = write_input(&temp, "old.sit", &[0x13, 0x37, 0x00, 0xff, 0x42]);
    let mut engine = ExtractionEngine::new(test_config(&temp)).unwrap();

    engine.handle_file(&path).unwrap();

    assert_eq!(codes(&engine), vec![WarningCode::MissingArchiver]);
    assert!(engine.warnings()[0].message.contains("unar"));
}

#[test]
fn unknown_estimate_still_extracts() {
    let temp = TempDir::new().unwrap();
    let (path, inner) = write_two_level(&temp);
    let mut engine = scripted_engine(&temp, ScriptedArchiver::new(None, false));

    engine.handle_file(&path).unwrap();

    assert_eq!(
        codes(&engine),
        vec![
            WarningCode::SizeRetrievalFailed,
            WarningCode::SizeRetrievalFailed
        ]
    );
    assert_eq!(engine.tracked_files().len(), 3);
    assert_eq!(
        entry_at(&engine, &path).extracted_size,
        Some(inner.len() as u64 + 7)
    );
}

#[test]
fn extraction_failure_is_terminal_for_the_archive() {
    let temp = TempDir::new().unwrap();
    let (path, _) = write_two_level(&temp);
    let analysis = ArchiveAnalysis {
        uncompressed_size: 10,
        total_entries: 1,
        encrypted_entries: 0,
    };
    let mut engine = scripted_engine(&temp, ScriptedArchiver::new(Some(analysis), true));

    engine.handle_file(&path).unwrap();

    assert_eq!(codes(&engine), vec![WarningCode::ExtractionFailed]);
    assert_eq!(engine.tracked_files().len(), 1);
    let entry = entry_at(&engine, &path);
    assert!(entry.extracted_size.is_none());
    assert!(entry.archiver.is_none());
    assert_eq!(engine.last_run().unwrap().archives_extracted, 0);
}

#[test]
fn failed_extraction_without_estimate_warns_once() {
    let temp = TempDir::new().unwrap();
    let (path, _) = write_two_level(&temp);
    let mut engine = scripted_engine(&temp, ScriptedArchiver::new(None, true));

    engine.handle_file(&path).unwrap();

    assert_eq!(codes(&engine), vec![WarningCode::ExtractionFailed]);
    let message = &engine.warnings()[0].message;
    assert!(message.contains("unexpected end of archive"));
    assert!(message.contains("cannot report the uncompressed size"));
}

#[test]
fn unclassifiable_file_is_registered_as_unknown_leaf() {
    let temp = TempDir::new().unwrap();
    let path = write_input(
        &temp,
        "bundle.zip",
        &stored_zip_bytes(&[("odd.bin", b"\x00\x01odd"), ("fine.txt", b"fine")]),
    );
    let mut engine = refusing_engine(&temp, "odd.bin");

    engine.handle_file(&path).unwrap();

    assert_eq!(codes(&engine), vec![WarningCode::ClassificationFailed]);
    assert!(engine.warnings()[0].path.ends_with("odd.bin"));
    assert_eq!(engine.tracked_files().len(), 3);

    let odd = entry_named(&engine, "odd.bin");
    assert!(!odd.is_archive);
    assert_eq!(odd.file_type, "unknown");
    assert_eq!(odd.mime, "application/octet-stream");
    assert_eq!(odd.extension, "bin");
    assert_eq!(odd.size, 5);
    assert_eq!(entry_at(&engine, &path).extracted_size, Some(9));
}

#[test]
fn vanished_child_is_reported_and_not_registered() {
    let temp = TempDir::new().unwrap();
    let path = write_input(
        &temp,
        "bundle.zip",
        &stored_zip_bytes(&[("gone.txt", b"short-lived"), ("kept.txt", b"kept")]),
    );
    let archiver = ScriptedArchiver::new(Some(analysis(15, 2, 0)), false)
        .after_extract(AfterExtract::DropEntry("gone.txt"));
    let mut engine = scripted_engine(&temp, archiver);

    engine.handle_file(&path).unwrap();

    assert_eq!(codes(&engine), vec![WarningCode::ClassificationFailed]);
    assert!(engine.warnings()[0].path.ends_with("gone.txt"));
    assert_eq!(engine.tracked_files().len(), 2);
    assert!(
        engine
            .tracked_files()
            .values()
            .all(|f| !f.path.ends_with("gone.txt"))
    );
    // Reported size still counts towards the parent
    assert_eq!(entry_at(&engine, &path).extracted_size, Some(15));
}

#[test]
fn fully_encrypted_archive_is_skipped() {
    let temp = TempDir::new().unwrap();
    let path = input_path(&temp, "locked.zip");
    write_encrypted_zip(&path, "secret.txt", b"classified", b"hunter2");
    let mut engine = ExtractionEngine::new(test_config(&temp)).unwrap();

    engine.handle_file(&path).unwrap();

    assert_eq!(codes(&engine), vec![WarningCode::PasswordProtectedSkipped]);
    let entry = entry_at(&engine, &path);
    assert_eq!(entry.analysis.as_ref().unwrap().encrypted_entries, 1);
    assert!(entry.extracted_size.is_none());
}

#[test]
fn partially_encrypted_archive_is_extracted_with_warning() {
    let temp = TempDir::new().unwrap();
    let path = write_input(&temp, "mixed.zip", &stored_zip_bytes(&[("open.txt", b"hello")]));
    let analysis = ArchiveAnalysis {
        uncompressed_size: 10,
        total_entries: 2,
        encrypted_entries: 1,
    };
    let mut engine = scripted_engine(&temp, ScriptedArchiver::new(Some(analysis), false));

    engine.handle_file(&path).unwrap();

    assert_eq!(codes(&engine), vec![WarningCode::PasswordProtectedDetected]);
    assert_eq!(entry_at(&engine, &path).extracted_size, Some(5));
}

// ---------------------------------------------------------------------------
// Deletion
// ---------------------------------------------------------------------------

#[test]
fn extracted_archive_is_deleted_when_enabled() {
    let temp = TempDir::new().unwrap();
    let (path, _) = write_two_level(&temp);
    let mut config = test_config(&temp);
    config.deletion.delete_archives_after_extraction = true;
    let mut engine = ExtractionEngine::new(config).unwrap();

    engine.handle_file(&path).unwrap();

    assert!(engine.warnings().is_empty(), "{:?}", engine.warnings());
    assert!(!path.exists());
    assert!(entry_at(&engine, &path).deleted);
    let inner = entry_named(&engine, "inner.zip");
    assert!(inner.deleted);
    assert!(!inner.path.exists());
    assert!(entry_named(&engine, "file.txt").path.exists());
}

#[test]
fn protected_extension_keeps_archive() {
    let temp = TempDir::new().unwrap();
    let path = write_input(&temp, "setup.exe", &stored_zip_bytes(&[("readme.txt", b"hi")]));
    let mut config = test_config(&temp);
    config.deletion.delete_archives_after_extraction = true;
    let mut engine = ExtractionEngine::new(config).unwrap();

    engine.handle_file(&path).unwrap();

    assert_eq!(codes(&engine), vec![WarningCode::SkipDeleteExtension]);
    assert!(path.exists());
    let entry = entry_at(&engine, &path);
    assert!(!entry.deleted);
    assert_eq!(entry.extracted_size, Some(2));
}

#[test]
fn protected_mime_keeps_archive() {
    let temp = TempDir::new().unwrap();
    let path = write_input(&temp, "bundle.zip", &stored_zip_bytes(&[("readme.txt", b"hi")]));
    let mut config = test_config(&temp);
    config.deletion.delete_archives_after_extraction = true;
    config.deletion.skip_delete_extensions = Vec::new();
    config.deletion.skip_delete_mimetypes = vec!["application/zip".into()];
    let mut engine = ExtractionEngine::new(config).unwrap();

    engine.handle_file(&path).unwrap();

    assert_eq!(codes(&engine), vec![WarningCode::SkipDeleteMimetype]);
    assert!(path.exists());
}

#[test]
fn undeletable_archive_reports_deletion_failed() {
    let temp = TempDir::new().unwrap();
    let path = write_input(&temp, "bundle.zip", &stored_zip_bytes(&[("readme.txt", b"hi")]));
    let mut config = test_config(&temp);
    config.deletion.delete_archives_after_extraction = true;
    let archiver = ScriptedArchiver::new(Some(analysis(2, 1, 0)), false)
        .after_extract(AfterExtract::BlockArchive);
    let mut engine = scripted_engine_with(config, archiver);

    engine.handle_file(&path).unwrap();

    assert_eq!(codes(&engine), vec![WarningCode::DeletionFailed]);
    assert_eq!(engine.warnings()[0].path, path);
    let entry = entry_at(&engine, &path);
    assert!(!entry.deleted);
    assert_eq!(entry.extracted_size, Some(2));
    assert!(path.is_dir());
}

#[test]
fn partially_encrypted_archive_is_kept() {
    let temp = TempDir::new().unwrap();
    let path = write_input(&temp, "mixed.zip", &stored_zip_bytes(&[("open.txt", b"hello")]));
    let mut config = test_config(&temp);
    config.deletion.delete_archives_after_extraction = true;
    let mut engine = scripted_engine_with(
        config,
        ScriptedArchiver::new(Some(analysis(10, 2, 1)), false),
    );

    engine.handle_file(&path).unwrap();

    assert_eq!(codes(&engine), vec![WarningCode::PasswordProtectedDetected]);
    assert!(path.exists());
    let entry = entry_at(&engine, &path);
    assert!(!entry.deleted);
    assert_eq!(entry.extracted_size, Some(5));
}

#[test]
fn rejected_archive_is_never_deleted() {
    let temp = TempDir::new().unwrap();
    let path = write_input(&temp, "big.zip", &stored_zip_bytes(&[("blob.bin", &[1u8; 2048])]));
    let mut config = test_config(&temp);
    config.deletion.delete_archives_after_extraction = true;
    config.budget.max_archive_size_bytes = 100;
    let mut engine = ExtractionEngine::new(config).unwrap();

    engine.handle_file(&path).unwrap();

    assert_eq!(codes(&engine), vec![WarningCode::MaxArchiveSizeBytes]);
    assert!(path.exists());
}

// ---------------------------------------------------------------------------
// API surface
// ---------------------------------------------------------------------------

#[test]
fn unreadable_input_is_an_error() {
    let temp = TempDir::new().unwrap();
    let mut engine = ExtractionEngine::new(test_config(&temp)).unwrap();

    let err = engine
        .handle_file(&temp.path().join("does-not-exist.zip"))
        .unwrap_err();

    assert_eq!(err.error_code(), "unreadable_input");
    assert!(engine.tracked_files().is_empty());
    assert!(engine.last_run().is_none());
}

#[test]
fn apply_settings_is_all_or_nothing() {
    let temp = TempDir::new().unwrap();
    let mut engine = ExtractionEngine::new(test_config(&temp)).unwrap();

    let err = engine
        .apply_settings(&[("MAX_DEPTH", "4"), ("MIN_ARCHIVE_RATIO", "7")])
        .unwrap_err();
    assert_eq!(err.error_code(), "config_error");
    assert_eq!(engine.config().budget.max_depth, 0);

    engine
        .apply_settings(&[("max_depth", "4"), ("delete_archives_after_extraction", "true")])
        .unwrap();
    assert_eq!(engine.config().budget.max_depth, 4);
    assert!(engine.config().deletion.delete_archives_after_extraction);
}

#[test]
fn apply_settings_rebuilds_registry_on_priority_change() {
    let temp = TempDir::new().unwrap();
    let mut engine = ExtractionEngine::new(test_config(&temp)).unwrap();
    assert_eq!(engine.registry().installed(), vec!["builtin-zip", "builtin-7z"]);

    engine.apply_settings(&[("TOOL_PRIORITY", "builtin_seven_zip")]).unwrap();
    assert_eq!(engine.registry().installed(), vec!["builtin-7z"]);

    // Zips now have no installed tool
    let path = write_input(&temp, "a.zip", &stored_zip_bytes(&[("x.txt", b"x")]));
    engine.handle_file(&path).unwrap();
    assert_eq!(codes(&engine), vec![WarningCode::MissingArchiver]);
}

#[test]
fn take_warnings_drains_the_log() {
    let temp = TempDir::new().unwrap();
    let path = write_input(&temp, "packed.lz", &[0x13, 0x37, 0x00, 0xff]);
    let mut engine = ExtractionEngine::new(test_config(&temp)).unwrap();
    engine.handle_file(&path).unwrap();

    let taken = engine.take_warnings();
    assert_eq!(taken.len(), 1);
    assert!(engine.warnings().is_empty());
    assert_eq!(engine.tracked_files().len(), 1);
}

#[test]
fn default_settings_lists_every_key() {
    let settings = ExtractionEngine::default_settings();
    assert_eq!(settings.len(), crate::config::SettingKey::ALL.len());
    assert!(
        settings
            .iter()
            .any(|(k, v)| k.as_str() == "MIN_ARCHIVE_RATIO" && v == "0.005")
    );
}

#[test]
fn unwritable_extract_dir_is_an_error() {
    let temp = TempDir::new().unwrap();
    let blocker = temp.path().join("blocker");
    std::fs::write(&blocker, b"file, not dir").unwrap();
    let mut config = test_config(&temp);
    config.extract_dir = blocker.join("extracted");

    let err = ExtractionEngine::new(config).unwrap_err();
    assert_eq!(err.error_code(), "destination_unavailable");
}
