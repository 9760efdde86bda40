//! Discovery of installed tools and per-file archiver selection

use super::catalog::{ArchiverKind, unsupported_formats};
use super::cli::CliArchiver;
use super::sevenz::SevenZArchiver;
use super::traits::{Archiver, FormatSupport};
use super::zip::ZipArchiver;
use crate::config::ToolsConfig;
use crate::types::FileClass;
use tracing::{debug, info, warn};

/// Outcome of looking up a tool for a classified file
pub enum Selection<'a> {
    /// An installed tool handles the format
    Found(&'a dyn Archiver),
    /// Only tools that are not installed declare the format
    Missing {
        /// Names of the tools that would handle it
        tools: Vec<String>,
    },
    /// No known tool declares the format
    Unsupported,
}

impl std::fmt::Debug for Selection<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Selection::Found(archiver) => f.debug_tuple("Found").field(&archiver.name()).finish(),
            Selection::Missing { tools } => f.debug_struct("Missing").field("tools", tools).finish(),
            Selection::Unsupported => f.write_str("Unsupported"),
        }
    }
}

/// A known tool that could not be used
#[derive(Clone, Debug)]
struct UnavailableTool {
    name: String,
    formats: FormatSupport,
}

/// Installed archivers in priority order, plus the known-but-absent ones
pub struct ArchiverRegistry {
    installed: Vec<Box<dyn Archiver>>,
    unavailable: Vec<UnavailableTool>,
}

impl ArchiverRegistry {
    /// A registry without any tool, for hosts that register their own
    pub fn empty() -> Self {
        Self {
            installed: Vec::new(),
            unavailable: Vec::new(),
        }
    }

    /// Locate every configured tool
    ///
    /// Kinds are tried in `tools.priority` order. CLI tools resolve to their
    /// explicit path when one is configured, otherwise they are searched on
    /// `PATH` (when `tools.search_path` allows it). Kinds that cannot be
    /// located, and kinds left out of the priority list, are remembered as
    /// unavailable so their formats still produce `MISSING_ARCHIVER`.
    pub fn discover(tools: &ToolsConfig) -> Self {
        let mut registry = Self::empty();

        for &kind in &tools.priority {
            match Self::locate(kind, tools) {
                Some(archiver) => {
                    info!(tool = archiver.name(), kind = %kind, "archiver available");
                    registry.installed.push(archiver);
                }
                None => {
                    warn!(kind = %kind, "MISSING_ARCHIVER: tool not found, its formats will be skipped");
                    registry.mark_unavailable(kind);
                }
            }
        }

        for kind in ArchiverKind::ALL {
            if !tools.priority.contains(&kind) {
                debug!(kind = %kind, "archiver disabled by priority list");
                registry.mark_unavailable(kind);
            }
        }

        registry
    }

    fn locate(kind: ArchiverKind, tools: &ToolsConfig) -> Option<Box<dyn Archiver>> {
        match kind {
            ArchiverKind::BuiltinZip => Some(Box::new(ZipArchiver::new())),
            ArchiverKind::BuiltinSevenZip => Some(Box::new(SevenZArchiver::new())),
            ArchiverKind::SevenZip | ArchiverKind::Unar | ArchiverKind::PeaZip => {
                let handler = match tools.explicit_path(kind) {
                    Some(path) if path.is_file() => CliArchiver::new(kind, path.to_path_buf()),
                    Some(path) => {
                        warn!(kind = %kind, ?path, "configured tool path does not exist");
                        None
                    }
                    None if tools.search_path => CliArchiver::from_path(kind),
                    None => None,
                };
                handler.map(|h| Box::new(h) as Box<dyn Archiver>)
            }
        }
    }

    fn mark_unavailable(&mut self, kind: ArchiverKind) {
        let name = kind.executable().unwrap_or(kind.as_str()).to_string();
        if self.unavailable.iter().any(|t| t.name == name) {
            return;
        }
        self.unavailable.push(UnavailableTool {
            name,
            formats: kind.formats(),
        });
    }

    /// Add a host-provided archiver with the lowest priority
    pub fn register(&mut self, archiver: Box<dyn Archiver>) {
        debug!(tool = archiver.name(), "registering archiver");
        self.installed.push(archiver);
    }

    /// Pick the tool for a classified file
    ///
    /// Among installed tools that can extract and declare the file's MIME type
    /// or extension, those able to analyse size win; ties go to the earlier
    /// entry in the priority order.
    pub fn select(&self, class: &FileClass) -> Selection<'_> {
        let best = self
            .installed
            .iter()
            .enumerate()
            .filter(|(_, a)| a.capabilities().can_extract && a.formats().supports(class))
            .min_by_key(|(index, a)| (!a.capabilities().can_analyze, *index))
            .map(|(_, a)| a.as_ref());

        if let Some(archiver) = best {
            return Selection::Found(archiver);
        }

        let tools: Vec<String> = self
            .unavailable
            .iter()
            .filter(|t| t.formats.supports(class))
            .map(|t| t.name.clone())
            .collect();

        if tools.is_empty() {
            Selection::Unsupported
        } else {
            Selection::Missing { tools }
        }
    }

    /// Every archive format known to nestex
    ///
    /// Union of what installed and unavailable tools declare plus formats no
    /// tool supports. This is the set the classifier uses for `is_archive`.
    pub fn known_formats(&self) -> FormatSupport {
        let mut known = FormatSupport::default();
        for archiver in &self.installed {
            known.merge(archiver.formats());
        }
        for tool in &self.unavailable {
            known.merge(&tool.formats);
        }
        known.merge(&unsupported_formats());
        known
    }

    /// Names of installed archivers, in priority order
    pub fn installed(&self) -> Vec<&str> {
        self.installed.iter().map(|a| a.name()).collect()
    }

    /// Names of known tools that are not available
    pub fn missing(&self) -> Vec<&str> {
        self.unavailable.iter().map(|t| t.name.as_str()).collect()
    }
}

impl std::fmt::Debug for ArchiverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiverRegistry")
            .field("installed", &self.installed())
            .field("missing", &self.missing())
            .finish()
    }
}
