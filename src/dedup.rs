//! Content fingerprinting and duplicate detection

use crate::types::Fingerprint;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Read buffer for hashing
const HASH_CHUNK: usize = 64 * 1024;

/// Fingerprint and byte count of one file
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileDigest {
    /// SHA-256 of the full byte stream
    pub fingerprint: Fingerprint,
    /// Number of bytes hashed
    pub size: u64,
}

/// Hash a file's full content with SHA-256
///
/// The file is streamed in chunks so arbitrarily large files are hashed in
/// constant memory.
pub fn fingerprint_file(path: &Path) -> std::io::Result<FileDigest> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; HASH_CHUNK];
    let mut size = 0u64;

    loop {
        let n = file.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
        size += n as u64;
    }

    Ok(FileDigest {
        fingerprint: Fingerprint::new(format!("{:x}", hasher.finalize())),
        size,
    })
}

/// Whether content was seen before
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Observation {
    /// First time this content is met
    Fresh,
    /// Same content already recorded
    Duplicate {
        /// Path at which the content was first seen
        of: PathBuf,
    },
}

/// Map from fingerprint to the first path at which the content was seen
#[derive(Debug, Default)]
pub struct DedupIndex {
    first_seen: HashMap<Fingerprint, PathBuf>,
}

impl DedupIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `fingerprint` at `path`, or report the earlier path
    pub fn observe(&mut self, fingerprint: &Fingerprint, path: &Path) -> Observation {
        match self.first_seen.get(fingerprint) {
            Some(of) => Observation::Duplicate { of: of.clone() },
            None => {
                self.first_seen
                    .insert(fingerprint.clone(), path.to_path_buf());
                Observation::Fresh
            }
        }
    }

    /// Whether the content has been observed
    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.first_seen.contains_key(fingerprint)
    }

    /// First path recorded for the content
    pub fn first_path(&self, fingerprint: &Fingerprint) -> Option<&Path> {
        self.first_seen.get(fingerprint).map(PathBuf::as_path)
    }

    /// Number of distinct contents observed
    pub fn len(&self) -> usize {
        self.first_seen.len()
    }

    /// Whether nothing has been observed
    pub fn is_empty(&self) -> bool {
        self.first_seen.is_empty()
    }
}
