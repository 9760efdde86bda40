//! Archivers backed by external command line tools (7z, unar, pea)

use super::catalog::ArchiverKind;
use super::parser::{ExitStatus, failure_reason, parse_slt_listing};
use super::shared::{collect_extracted_entries, extraction_failed, run_tool, size_retrieval_failed};
use super::traits::{ArchiveAnalysis, Archiver, ArchiverCapabilities, ExtractedEntry, FormatSupport};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// 7z exit code for "warning, non fatal error(s)"
const SEVEN_ZIP_WARNING_EXIT: i32 = 1;

/// Archiver that shells out to an external binary
///
/// # Examples
///
/// ```no_run
/// use nestex::archiver::{Archiver, ArchiverKind, CliArchiver};
/// use std::path::Path;
///
/// // Auto-discover 7z from PATH
/// let seven_zip = CliArchiver::from_path(ArchiverKind::SevenZip)
///     .expect("7z not found in PATH");
///
/// let analysis = seven_zip.analyze(Path::new("bundle.7z"))?;
/// println!("{} bytes uncompressed", analysis.uncompressed_size);
/// # Ok::<(), nestex::Error>(())
/// ```
pub struct CliArchiver {
    kind: ArchiverKind,
    binary_path: PathBuf,
    formats: FormatSupport,
}

impl CliArchiver {
    /// Create a handler for `kind` with an explicit binary path
    ///
    /// Returns `None` when `kind` is an in-process decoder.
    pub fn new(kind: ArchiverKind, binary_path: PathBuf) -> Option<Self> {
        kind.executable()?;
        Some(Self {
            kind,
            binary_path,
            formats: kind.formats(),
        })
    }

    /// Attempt to find the tool's executable in PATH
    ///
    /// Uses the `which` crate to search for the binary.
    ///
    /// # Returns
    ///
    /// `Some(CliArchiver)` if the binary is found, `None` otherwise.
    pub fn from_path(kind: ArchiverKind) -> Option<Self> {
        let executable = kind.executable()?;
        which::which(executable)
            .ok()
            .and_then(|path| Self::new(kind, path))
    }

    /// The tool this handler drives
    pub fn kind(&self) -> ArchiverKind {
        self.kind
    }

    /// Location of the executable
    pub fn binary_path(&self) -> &Path {
        &self.binary_path
    }

    fn extract_args(&self, archive: &Path, destination: &Path) -> Vec<OsString> {
        match self.kind {
            ArchiverKind::SevenZip => {
                let mut out_dir = OsString::from("-o");
                out_dir.push(destination.as_os_str());
                vec![
                    "x".into(),
                    "-y".into(),
                    "-aoa".into(),
                    "-p".into(),
                    out_dir,
                    "--".into(),
                    archive.into(),
                ]
            }
            ArchiverKind::Unar => vec![
                "-q".into(),
                "-f".into(),
                "-o".into(),
                destination.into(),
                archive.into(),
            ],
            ArchiverKind::PeaZip => vec![
                "-ext2simple".into(),
                archive.into(),
                destination.into(),
            ],
            ArchiverKind::BuiltinZip | ArchiverKind::BuiltinSevenZip => Vec::new(),
        }
    }

    fn exit_ok(&self, output: &std::process::Output) -> bool {
        if output.status.success() {
            return true;
        }
        if self.kind == ArchiverKind::SevenZip
            && output.status.code() == Some(SEVEN_ZIP_WARNING_EXIT)
        {
            warn!(
                tool = self.name(),
                reason = %failure_reason(&output.stdout, &output.stderr, ExitStatus::Success),
                "7z reported non-fatal warnings"
            );
            return true;
        }
        false
    }
}

impl Archiver for CliArchiver {
    fn analyze(&self, archive: &Path) -> crate::Result<ArchiveAnalysis> {
        if self.kind != ArchiverKind::SevenZip {
            return Err(crate::Error::NotSupported(format!(
                "{} cannot list archive contents",
                self.name()
            )));
        }

        let args: [OsString; 4] = ["l".into(), "-slt".into(), "--".into(), archive.into()];
        let output = run_tool(&self.binary_path, args)?;

        if !self.exit_ok(&output) {
            return Err(size_retrieval_failed(
                archive,
                failure_reason(&output.stdout, &output.stderr, ExitStatus::Failure),
            ));
        }

        let analysis = parse_slt_listing(&output.stdout)
            .ok_or_else(|| size_retrieval_failed(archive, "unrecognised 7z listing output"))?;

        debug!(
            ?archive,
            uncompressed_size = analysis.uncompressed_size,
            entries = analysis.total_entries,
            encrypted = analysis.encrypted_entries,
            "7z listing parsed"
        );
        Ok(analysis)
    }

    fn extract(&self, archive: &Path, destination: &Path) -> crate::Result<Vec<ExtractedEntry>> {
        debug!(tool = self.name(), ?archive, ?destination, "running external extraction");

        let output = run_tool(&self.binary_path, self.extract_args(archive, destination))?;

        if !self.exit_ok(&output) {
            return Err(extraction_failed(
                archive,
                failure_reason(
                    &output.stdout,
                    &output.stderr,
                    ExitStatus::from(output.status.success()),
                ),
            ));
        }

        let entries = collect_extracted_entries(archive, destination)?;
        info!(
            tool = self.name(),
            ?archive,
            extracted_count = entries.len(),
            "extraction successful"
        );
        Ok(entries)
    }

    fn capabilities(&self) -> ArchiverCapabilities {
        ArchiverCapabilities {
            can_analyze: self.kind == ArchiverKind::SevenZip,
            can_extract: true,
        }
    }

    fn formats(&self) -> &FormatSupport {
        &self.formats
    }

    fn name(&self) -> &str {
        self.kind.executable().unwrap_or("cli")
    }
}
