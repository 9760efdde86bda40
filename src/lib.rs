//! # nestex
//!
//! Recursive extraction of nested archives with archive bomb defenses.
//!
//! ## Design Philosophy
//!
//! nestex is designed to be:
//! - **Safe by default** - Every archive passes size, ratio, depth and
//!   free-space checks before a single byte is written
//! - **Content-addressed** - Files are tracked by SHA-256, so identical content
//!   is unpacked and counted once no matter how often it appears
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//! - **Warning-driven** - Anomalies are collected as structured warnings
//!   instead of aborting the run
//!
//! ## Quick Start
//!
//! ```no_run
//! use nestex::{Config, ExtractionEngine};
//! use std::path::Path;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default().with_settings(&[
//!         ("EXTRACT_DIR", "/var/tmp/unpacked"),
//!         ("MAX_ARCHIVE_SIZE_BYTES", "2G"),
//!         ("MAX_DEPTH", "8"),
//!     ])?;
//!
//!     let mut engine = ExtractionEngine::new(config)?;
//!     engine.handle_file(Path::new("upload.zip"))?;
//!
//!     for warning in engine.take_warnings() {
//!         println!("{}", warning);
//!     }
//!     println!("{}", serde_json::to_string_pretty(engine.tracked_files())?);
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Archive unpacking tools and their selection
pub mod archiver;
/// Resource budget checks
pub mod budget;
/// File type detection
pub mod classify;
/// Configuration types
pub mod config;
/// Content fingerprints and duplicate detection
pub mod dedup;
/// Recursive extraction engine
pub mod engine;
/// Error types
pub mod error;
/// Core types
pub mod types;
/// Utility functions
pub mod utils;
/// Structured warnings
pub mod warnings;


// Re-export commonly used types
pub use archiver::{
    ArchiveAnalysis, Archiver, ArchiverCapabilities, ArchiverKind, ArchiverRegistry,
    ExtractedEntry, FormatSupport,
};
pub use budget::{Admission, BudgetTracker, Candidate, RejectReason, RunLedger};
pub use classify::{FileClassifier, MagicClassifier};
pub use config::{BudgetConfig, Config, DeletionConfig, SettingKey, ToolsConfig};
pub use dedup::{DedupIndex, FileDigest, Observation};
pub use engine::ExtractionEngine;
pub use error::{Error, ExtractionError, Result};
pub use types::{FileClass, Fingerprint, RunSummary, TrackedFile};
pub use warnings::{ExtractionWarning, WarningCode, WarningSink};
