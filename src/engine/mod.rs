//! Recursive extraction engine
//!
//! [`ExtractionEngine::handle_file`] takes one input file and resolves it
//! depth-first: every archive met along the way is classified, admitted by the
//! budget, unpacked into `<extract_dir>/<fingerprint>` and its contents are
//! processed the same way before any sibling is touched. Each distinct content
//! ends up as one [`TrackedFile`]; anomalies end up as warnings.
//!
//! State persists across `handle_file` calls on the same engine, so feeding
//! the same content twice yields a `DUPLICATE_CONTENT` warning the second time.
//!
//! # Examples
//!
//! ```no_run
//! use nestex::{Config, ExtractionEngine};
//! use std::path::Path;
//!
//! let config = Config::default().with_settings(&[("EXTRACT_DIR", "/tmp/out"), ("MAX_DEPTH", "5")])?;
//! let mut engine = ExtractionEngine::new(config)?;
//! engine.handle_file(Path::new("bundle.zip"))?;
//!
//! for file in engine.tracked_files().values() {
//!     println!("{} {} archive={}", file.fingerprint, file.path.display(), file.is_archive);
//! }
//! for warning in engine.warnings() {
//!     eprintln!("{warning}");
//! }
//! # Ok::<(), nestex::Error>(())
//! ```

mod cleanup;
mod traversal;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

use crate::archiver::ArchiverRegistry;
use crate::classify::{FileClassifier, MagicClassifier};
use crate::config::{Config, SettingKey};
use crate::dedup::DedupIndex;
use crate::error::{Error, ExtractionError, Result};
use crate::types::{Fingerprint, RunSummary, TrackedFile};
use crate::warnings::{ExtractionWarning, WarningSink};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

/// Recursive, budget-aware archive extractor
pub struct ExtractionEngine {
    config: Config,
    registry: ArchiverRegistry,
    classifier: Box<dyn FileClassifier>,
    /// Whether registry and classifier came from discovery (and may be rebuilt)
    discovered: bool,
    tracked: BTreeMap<Fingerprint, TrackedFile>,
    dedup: DedupIndex,
    warnings: WarningSink,
    last_run: Option<RunSummary>,
}

impl ExtractionEngine {
    /// Create an engine with discovered tools and the magic-byte classifier
    ///
    /// Locates the configured tools, derives the classifier's archive formats
    /// from them and creates `extract_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error when the configuration is invalid or `extract_dir`
    /// cannot be created.
    pub fn new(config: Config) -> Result<Self> {
        let registry = ArchiverRegistry::discover(&config.tools);
        let classifier = MagicClassifier::new(registry.known_formats());
        let mut engine = Self::with_components(config, registry, Box::new(classifier))?;
        engine.discovered = true;
        Ok(engine)
    }

    /// Create an engine from explicitly built components
    ///
    /// Use this to plug in host-registered archivers or a different
    /// classifier. Changing `TOOL_PRIORITY` later does not rebuild them.
    pub fn with_components(
        config: Config,
        registry: ArchiverRegistry,
        classifier: Box<dyn FileClassifier>,
    ) -> Result<Self> {
        config.validate()?;
        ensure_extract_dir(&config.extract_dir)?;

        info!(
            extract_dir = ?config.extract_dir,
            installed = ?registry.installed(),
            missing = ?registry.missing(),
            "extraction engine ready"
        );

        Ok(Self {
            config,
            registry,
            classifier,
            discovered: false,
            tracked: BTreeMap::new(),
            dedup: DedupIndex::new(),
            warnings: WarningSink::new(),
            last_run: None,
        })
    }

    /// Process one input file and everything nested inside it
    ///
    /// # Errors
    ///
    /// Fails when the input cannot be read, or when `extract_dir` or a
    /// per-archive destination cannot be created. Entries and warnings
    /// collected before the failure are kept. Every other anomaly is recorded
    /// as a warning and the run continues.
    pub fn handle_file(&mut self, path: &Path) -> Result<()> {
        self.run(path)
    }

    /// Every distinct content met so far, ordered by fingerprint
    pub fn tracked_files(&self) -> &BTreeMap<Fingerprint, TrackedFile> {
        &self.tracked
    }

    /// Look up one entry
    pub fn tracked_file(&self, fingerprint: &Fingerprint) -> Option<&TrackedFile> {
        self.tracked.get(fingerprint)
    }

    /// Warnings recorded so far, in occurrence order
    pub fn warnings(&self) -> &[ExtractionWarning] {
        self.warnings.entries()
    }

    /// Remove and return every recorded warning
    pub fn take_warnings(&mut self) -> Vec<ExtractionWarning> {
        self.warnings.drain()
    }

    /// Totals of the most recent completed `handle_file`
    pub fn last_run(&self) -> Option<&RunSummary> {
        self.last_run.as_ref()
    }

    /// The active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The archivers this engine selects from
    pub fn registry(&self) -> &ArchiverRegistry {
        &self.registry
    }

    /// Every setting at its built-in default
    pub fn default_settings() -> Vec<(SettingKey, String)> {
        Config::default().settings()
    }

    /// Validate `settings` and swap in the resulting configuration
    ///
    /// On error the active configuration is left untouched. For engines built
    /// with [`ExtractionEngine::new`], a change to the tool settings
    /// re-discovers the archivers and rebuilds the classifier.
    pub fn apply_settings<K, V>(&mut self, settings: &[(K, V)]) -> Result<()>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let next = self.config.with_settings(settings)?;
        ensure_extract_dir(&next.extract_dir)?;

        if self.discovered && next.tools != self.config.tools {
            debug!("tool settings changed, re-discovering archivers");
            self.registry = ArchiverRegistry::discover(&next.tools);
            self.classifier = Box::new(MagicClassifier::new(self.registry.known_formats()));
        }

        info!(changed = settings.len(), "settings applied");
        self.config = next;
        Ok(())
    }
}

impl std::fmt::Debug for ExtractionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractionEngine")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("tracked", &self.tracked.len())
            .field("warnings", &self.warnings.len())
            .finish()
    }
}

fn ensure_extract_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|e| {
        Error::Extraction(ExtractionError::DestinationUnavailable {
            path: dir.to_path_buf(),
            reason: format!("failed to create extraction directory: {}", e),
        })
    })
}
