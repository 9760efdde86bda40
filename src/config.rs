//! Configuration types for nestex
//!
//! A [`Config`] is an immutable value handed to the engine at construction.
//! Changing settings never mutates a live configuration: [`Config::with_settings`]
//! validates a list of `(key, value)` pairs and returns a new `Config`.
//!
//! Layering (lowest to highest precedence): built-in defaults, a JSON file
//! ([`Config::from_json_file`]), environment variables
//! ([`Config::with_env_overrides`]), explicit settings.

use crate::archiver::ArchiverKind;
use crate::error::{Error, Result};
use crate::utils::{format_file_size, parse_file_size};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default environment variable prefix (`NESTEX_MAX_DEPTH`, ...)
pub const ENV_PREFIX: &str = "NESTEX";

const GIB: u64 = 1024 * 1024 * 1024;

/// Resource limits for one extraction run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BudgetConfig {
    /// Largest uncompressed size accepted for a single archive (default: 10 GiB)
    #[serde(default = "default_max_archive_size")]
    pub max_archive_size_bytes: u64,

    /// Largest cumulative size written during one run (default: 100 GiB)
    #[serde(default = "default_max_total_size")]
    pub max_total_size_bytes: u64,

    /// Lowest accepted `compressed / uncompressed` ratio (default: 0.005)
    ///
    /// An archive that expands more than 200x is treated as a bomb candidate.
    #[serde(default = "default_min_archive_ratio")]
    pub min_archive_ratio: f64,

    /// Free space that must remain on the extraction volume (default: 1 GiB)
    #[serde(default = "default_min_disk_free_space")]
    pub min_disk_free_space: u64,

    /// Maximum nesting depth; archives at this depth are not unpacked (0 = unlimited)
    #[serde(default)]
    pub max_depth: u32,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            max_archive_size_bytes: default_max_archive_size(),
            max_total_size_bytes: default_max_total_size(),
            min_archive_ratio: default_min_archive_ratio(),
            min_disk_free_space: default_min_disk_free_space(),
            max_depth: 0,
        }
    }
}

/// Post-extraction deletion of archive files
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionConfig {
    /// Delete archive bytes after a successful extraction (default: false)
    #[serde(default)]
    pub delete_archives_after_extraction: bool,

    /// Extensions (without dot) whose archives are never deleted
    #[serde(default = "default_skip_delete_extensions")]
    pub skip_delete_extensions: Vec<String>,

    /// MIME types whose archives are never deleted
    #[serde(default = "default_skip_delete_mimetypes")]
    pub skip_delete_mimetypes: Vec<String>,
}

impl Default for DeletionConfig {
    fn default() -> Self {
        Self {
            delete_archives_after_extraction: false,
            skip_delete_extensions: default_skip_delete_extensions(),
            skip_delete_mimetypes: default_skip_delete_mimetypes(),
        }
    }
}

/// External tool paths and selection order
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Path to 7z executable (auto-detected if None)
    #[serde(default)]
    pub sevenzip_path: Option<PathBuf>,

    /// Path to unar executable (auto-detected if None)
    #[serde(default)]
    pub unar_path: Option<PathBuf>,

    /// Path to pea executable (auto-detected if None)
    #[serde(default)]
    pub peazip_path: Option<PathBuf>,

    /// Whether to search PATH for external binaries if explicit paths not set (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,

    /// Tie-break order between tools of equal capability, first wins
    ///
    /// Tools missing from the list are never used.
    #[serde(default = "default_priority")]
    pub priority: Vec<ArchiverKind>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            sevenzip_path: None,
            unar_path: None,
            peazip_path: None,
            search_path: true,
            priority: default_priority(),
        }
    }
}

impl ToolsConfig {
    /// Explicitly configured binary for an external tool kind
    pub fn explicit_path(&self, kind: ArchiverKind) -> Option<&Path> {
        match kind {
            ArchiverKind::SevenZip => self.sevenzip_path.as_deref(),
            ArchiverKind::Unar => self.unar_path.as_deref(),
            ArchiverKind::PeaZip => self.peazip_path.as_deref(),
            ArchiverKind::BuiltinZip | ArchiverKind::BuiltinSevenZip => None,
        }
    }
}

/// Main configuration for [`ExtractionEngine`](crate::ExtractionEngine)
///
/// Sub-configs are flattened, so the JSON form is a single flat object:
///
/// ```json
/// { "extract_dir": "out", "max_depth": 5, "delete_archives_after_extraction": true }
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Root under which every archive gets its own extraction subtree (default: "./extracted")
    #[serde(default = "default_extract_dir")]
    pub extract_dir: PathBuf,

    /// Resource limits
    #[serde(flatten)]
    pub budget: BudgetConfig,

    /// Post-extraction deletion
    #[serde(flatten)]
    pub deletion: DeletionConfig,

    /// External tool discovery
    #[serde(flatten)]
    pub tools: ToolsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            extract_dir: default_extract_dir(),
            budget: BudgetConfig::default(),
            deletion: DeletionConfig::default(),
            tools: ToolsConfig::default(),
        }
    }
}

/// Keys accepted by [`Config::with_settings`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SettingKey {
    /// `budget.max_archive_size_bytes`, human sizes accepted
    MaxArchiveSizeBytes,
    /// `budget.max_total_size_bytes`, human sizes accepted
    MaxTotalSizeBytes,
    /// `budget.min_archive_ratio`, a float in `[0, 1]`
    MinArchiveRatio,
    /// `budget.min_disk_free_space`, human sizes accepted
    MinDiskFreeSpace,
    /// `budget.max_depth`, 0 = unlimited
    MaxDepth,
    /// `deletion.delete_archives_after_extraction`
    DeleteArchivesAfterExtraction,
    /// `deletion.skip_delete_extensions`, comma-separated
    SkipDeleteExtensions,
    /// `deletion.skip_delete_mimetypes`, comma-separated
    SkipDeleteMimetypes,
    /// `extract_dir`
    ExtractDir,
    /// `tools.priority`, comma-separated tool names
    ToolPriority,
}

impl SettingKey {
    /// Every key, in display order
    pub const ALL: [SettingKey; 10] = [
        SettingKey::MaxArchiveSizeBytes,
        SettingKey::MaxTotalSizeBytes,
        SettingKey::MinArchiveRatio,
        SettingKey::MinDiskFreeSpace,
        SettingKey::MaxDepth,
        SettingKey::DeleteArchivesAfterExtraction,
        SettingKey::SkipDeleteExtensions,
        SettingKey::SkipDeleteMimetypes,
        SettingKey::ExtractDir,
        SettingKey::ToolPriority,
    ];

    /// Canonical upper-case name
    pub fn as_str(self) -> &'static str {
        match self {
            SettingKey::MaxArchiveSizeBytes => "MAX_ARCHIVE_SIZE_BYTES",
            SettingKey::MaxTotalSizeBytes => "MAX_TOTAL_SIZE_BYTES",
            SettingKey::MinArchiveRatio => "MIN_ARCHIVE_RATIO",
            SettingKey::MinDiskFreeSpace => "MIN_DISK_FREE_SPACE",
            SettingKey::MaxDepth => "MAX_DEPTH",
            SettingKey::DeleteArchivesAfterExtraction => "DELETE_ARCHIVES_AFTER_EXTRACTION",
            SettingKey::SkipDeleteExtensions => "SKIP_DELETE_EXTENSIONS",
            SettingKey::SkipDeleteMimetypes => "SKIP_DELETE_MIMETYPES",
            SettingKey::ExtractDir => "EXTRACT_DIR",
            SettingKey::ToolPriority => "TOOL_PRIORITY",
        }
    }
}

impl std::fmt::Display for SettingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SettingKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let upper = s.trim().to_ascii_uppercase().replace('-', "_");
        SettingKey::ALL
            .into_iter()
            .find(|key| key.as_str() == upper)
            .ok_or_else(|| Error::config(s, format!("unknown setting: {s}")))
    }
}

impl Config {
    /// Return a copy of this configuration with `settings` applied
    ///
    /// Keys are case-insensitive [`SettingKey`] names. The whole list is
    /// validated; on error `self` is untouched and nothing is applied.
    ///
    /// # Examples
    ///
    /// ```
    /// use nestex::Config;
    ///
    /// let config = Config::default()
    ///     .with_settings(&[("MAX_ARCHIVE_SIZE_BYTES", "5G"), ("max_depth", "3")])
    ///     .unwrap();
    /// assert_eq!(config.budget.max_archive_size_bytes, 5 * 1024 * 1024 * 1024);
    /// assert_eq!(config.budget.max_depth, 3);
    /// ```
    pub fn with_settings<K, V>(&self, settings: &[(K, V)]) -> Result<Config>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut next = self.clone();
        for (key, value) in settings {
            let key: SettingKey = key.as_ref().parse()?;
            next.set(key, value.as_ref())?;
        }
        next.validate()?;
        Ok(next)
    }

    /// Current value of every setting, rendered the way `with_settings` accepts it
    pub fn settings(&self) -> Vec<(SettingKey, String)> {
        SettingKey::ALL
            .into_iter()
            .map(|key| (key, self.render(key)))
            .collect()
    }

    /// Load a configuration from a JSON file, filling gaps with defaults
    pub fn from_json_file(path: &Path) -> Result<Config> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `<PREFIX>_<KEY>` environment variables on top of this configuration
    ///
    /// Unset variables are ignored; set ones go through the same validation as
    /// [`Config::with_settings`].
    pub fn with_env_overrides(&self, prefix: &str) -> Result<Config> {
        let overrides: Vec<(&'static str, String)> = SettingKey::ALL
            .into_iter()
            .filter_map(|key| {
                std::env::var(format!("{prefix}_{}", key.as_str()))
                    .ok()
                    .map(|value| (key.as_str(), value))
            })
            .collect();
        self.with_settings(&overrides)
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<()> {
        let ratio = self.budget.min_archive_ratio;
        if !ratio.is_finite() || !(0.0..=1.0).contains(&ratio) {
            return Err(Error::config(
                SettingKey::MinArchiveRatio.as_str(),
                format!("min_archive_ratio must be between 0.0 and 1.0, got {ratio}"),
            ));
        }
        if self.extract_dir.as_os_str().is_empty() {
            return Err(Error::config(
                SettingKey::ExtractDir.as_str(),
                "extract_dir must not be empty",
            ));
        }
        Ok(())
    }

    fn set(&mut self, key: SettingKey, value: &str) -> Result<()> {
        let with_key = |e: Error| match e {
            Error::Config { message, .. } => Error::config(key.as_str(), message),
            other => other,
        };

        match key {
            SettingKey::MaxArchiveSizeBytes => {
                self.budget.max_archive_size_bytes = parse_file_size(value).map_err(with_key)?;
            }
            SettingKey::MaxTotalSizeBytes => {
                self.budget.max_total_size_bytes = parse_file_size(value).map_err(with_key)?;
            }
            SettingKey::MinDiskFreeSpace => {
                self.budget.min_disk_free_space = parse_file_size(value).map_err(with_key)?;
            }
            SettingKey::MinArchiveRatio => {
                self.budget.min_archive_ratio = value.trim().parse().map_err(|_| {
                    Error::config(key.as_str(), format!("{value} is not a number"))
                })?;
            }
            SettingKey::MaxDepth => {
                self.budget.max_depth = value.trim().parse().map_err(|_| {
                    Error::config(
                        key.as_str(),
                        format!("{value} is not a non-negative integer"),
                    )
                })?;
            }
            SettingKey::DeleteArchivesAfterExtraction => {
                self.deletion.delete_archives_after_extraction = parse_bool(value)
                    .ok_or_else(|| {
                        Error::config(key.as_str(), format!("{value} is not a boolean"))
                    })?;
            }
            SettingKey::SkipDeleteExtensions => {
                self.deletion.skip_delete_extensions = split_list(value)
                    .map(|ext| ext.trim_start_matches('.').to_lowercase())
                    .collect();
            }
            SettingKey::SkipDeleteMimetypes => {
                self.deletion.skip_delete_mimetypes =
                    split_list(value).map(|mime| mime.to_lowercase()).collect();
            }
            SettingKey::ExtractDir => {
                self.extract_dir = PathBuf::from(value.trim());
            }
            SettingKey::ToolPriority => {
                let mut priority = Vec::new();
                for name in split_list(value) {
                    let kind: ArchiverKind = name
                        .parse()
                        .map_err(|e: String| Error::config(key.as_str(), e))?;
                    if !priority.contains(&kind) {
                        priority.push(kind);
                    }
                }
                self.tools.priority = priority;
            }
        }
        Ok(())
    }

    fn render(&self, key: SettingKey) -> String {
        match key {
            SettingKey::MaxArchiveSizeBytes => format_file_size(self.budget.max_archive_size_bytes),
            SettingKey::MaxTotalSizeBytes => format_file_size(self.budget.max_total_size_bytes),
            SettingKey::MinDiskFreeSpace => format_file_size(self.budget.min_disk_free_space),
            SettingKey::MinArchiveRatio => self.budget.min_archive_ratio.to_string(),
            SettingKey::MaxDepth => self.budget.max_depth.to_string(),
            SettingKey::DeleteArchivesAfterExtraction => {
                self.deletion.delete_archives_after_extraction.to_string()
            }
            SettingKey::SkipDeleteExtensions => self.deletion.skip_delete_extensions.join(","),
            SettingKey::SkipDeleteMimetypes => self.deletion.skip_delete_mimetypes.join(","),
            SettingKey::ExtractDir => self.extract_dir.display().to_string(),
            SettingKey::ToolPriority => self
                .tools
                .priority
                .iter()
                .map(|kind| kind.as_str())
                .collect::<Vec<_>>()
                .join(","),
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|item| !item.is_empty())
}

fn default_extract_dir() -> PathBuf {
    PathBuf::from("extracted")
}

fn default_max_archive_size() -> u64 {
    10 * GIB
}

fn default_max_total_size() -> u64 {
    100 * GIB
}

fn default_min_archive_ratio() -> f64 {
    0.005
}

fn default_min_disk_free_space() -> u64 {
    GIB
}

fn default_true() -> bool {
    true
}

fn default_priority() -> Vec<ArchiverKind> {
    vec![
        ArchiverKind::SevenZip,
        ArchiverKind::BuiltinZip,
        ArchiverKind::BuiltinSevenZip,
        ArchiverKind::Unar,
        ArchiverKind::PeaZip,
    ]
}

fn default_skip_delete_extensions() -> Vec<String> {
    [
        "exe", "msi", "msp", "dll", "apk", "ipa", "jar", "war", "ear", "deb", "rpm", "appimage",
        "appx", "appxbundle", "msix", "msixbundle", "crx", "xpi", "docx", "docm", "xlsx", "xlsm",
        "pptx", "pptm", "odt", "ods", "odp", "epub",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_skip_delete_mimetypes() -> Vec<String> {
    [
        "application/x-dosexec",
        "application/vnd.microsoft.portable-executable",
        "application/x-msdownload",
        "application/x-ole-storage",
        "application/java-archive",
        "application/vnd.android.package-archive",
        "application/vnd.debian.binary-package",
        "application/x-rpm",
        "application/x-chrome-extension",
        "application/x-xpinstall",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "application/vnd.oasis.opendocument.text",
        "application/vnd.oasis.opendocument.spreadsheet",
        "application/vnd.oasis.opendocument.presentation",
        "application/epub+zip",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
