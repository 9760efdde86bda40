//! Parser for `7z l -slt` listings and tool diagnostics

use super::traits::ArchiveAnalysis;
use std::str;

/// Exit status of an external command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// The command exited successfully (exit code 0)
    Success,
    /// The command exited with a non-zero exit code
    Failure,
}

impl ExitStatus {
    /// Returns `true` if the exit status represents success
    pub fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

impl From<bool> for ExitStatus {
    fn from(success: bool) -> Self {
        if success {
            Self::Success
        } else {
            Self::Failure
        }
    }
}

/// Line that separates the archive header from the entry blocks
const ENTRIES_SEPARATOR: &str = "----------";

/// Parse the technical listing printed by `7z l -slt`
///
/// Entry blocks follow the `----------` separator and are separated by blank
/// lines. Directory entries (`Folder = +` or a `D` attribute) are skipped.
/// An empty `Size =` value counts as zero.
///
/// # Returns
///
/// `None` when the output contains no entry section at all, which happens
/// when 7z could not open the archive.
pub fn parse_slt_listing(stdout: &[u8]) -> Option<ArchiveAnalysis> {
    let output = String::from_utf8_lossy(stdout);
    let mut lines = output.lines();

    lines.find(|line| line.trim() == ENTRIES_SEPARATOR)?;

    let mut analysis = ArchiveAnalysis::default();
    let mut entry = EntryBlock::default();

    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            entry.flush_into(&mut analysis);
            continue;
        }

        let Some((key, value)) = line.split_once(" = ").or_else(|| {
            // "Size =" with nothing after it
            line.strip_suffix(" =").map(|key| (key, ""))
        }) else {
            continue;
        };

        entry.seen = true;
        match key {
            "Size" => entry.size = value.trim().parse().unwrap_or(0),
            "Folder" => entry.is_dir |= value.trim() == "+",
            "Attributes" => entry.is_dir |= value.trim_start().starts_with('D'),
            "Encrypted" => entry.encrypted = value.trim() == "+",
            _ => {}
        }
    }
    entry.flush_into(&mut analysis);

    Some(analysis)
}

#[derive(Default)]
struct EntryBlock {
    seen: bool,
    size: u64,
    is_dir: bool,
    encrypted: bool,
}

impl EntryBlock {
    fn flush_into(&mut self, analysis: &mut ArchiveAnalysis) {
        if self.seen && !self.is_dir {
            analysis.uncompressed_size = analysis.uncompressed_size.saturating_add(self.size);
            analysis.total_entries += 1;
            if self.encrypted {
                analysis.encrypted_entries += 1;
            }
        }
        *self = EntryBlock::default();
    }
}

/// Condense tool output into a one-line failure reason
///
/// Prefers lines mentioning an error from stderr, then from stdout, and falls
/// back to the last non-empty line.
pub fn failure_reason(stdout: &[u8], stderr: &[u8], exit_status: ExitStatus) -> String {
    let error_output = str::from_utf8(stderr).unwrap_or_default();
    let output = str::from_utf8(stdout).unwrap_or_default();

    let pick = |text: &str| {
        text.lines()
            .map(str::trim)
            .find(|line| line.to_lowercase().contains("error"))
            .map(str::to_string)
    };

    let detail = pick(error_output)
        .or_else(|| pick(output))
        .or_else(|| {
            error_output
                .lines()
                .chain(output.lines())
                .map(str::trim)
                .rfind(|line| !line.is_empty())
                .map(str::to_string)
        })
        .unwrap_or_else(|| "no output".to_string());

    if exit_status.is_success() {
        detail
    } else {
        format!("tool exited with failure: {detail}")
    }
}
