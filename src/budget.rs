//! Resource budget enforcement for one extraction run
//!
//! Every archive passes [`BudgetTracker::admit`] before it is unpacked. The
//! checks run in a fixed order and the first failing one decides the warning
//! code. After an extraction the bytes actually written are committed to the
//! run ledger, counting each distinct content once.

use crate::config::BudgetConfig;
use crate::types::Fingerprint;
use crate::utils::format_file_size;
use crate::warnings::WarningCode;
use std::collections::HashSet;

/// Running totals of the current run
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunLedger {
    /// New-content bytes written so far
    pub total_extracted_bytes: u64,
    /// Nesting level of the archive being considered (root = 0)
    pub current_depth: u32,
}

/// An archive about to be admitted
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Candidate {
    /// On-disk size of the archive
    pub compressed_size: u64,
    /// Expected uncompressed size, `None` when the tool cannot tell
    pub estimate: Option<u64>,
    /// Free bytes on the extraction volume, `None` when the probe failed
    pub free_space: Option<u64>,
}

/// Verdict of the admission checks
#[derive(Clone, Debug, PartialEq)]
pub enum Admission {
    /// All checks passed
    Admit,
    /// A check failed; nothing may be written for this archive
    Reject(RejectReason),
}

/// The check that rejected an archive
#[derive(Clone, Debug, PartialEq)]
pub enum RejectReason {
    /// Archive sits at or below the depth limit
    MaxDepth {
        /// Depth of the archive
        depth: u32,
        /// Configured limit
        limit: u32,
    },
    /// Single archive would expand beyond the limit
    MaxArchiveSize {
        /// Expected uncompressed size
        estimate: u64,
        /// Configured limit
        limit: u64,
    },
    /// Run total would exceed the limit
    MaxTotalSize {
        /// Expected uncompressed size
        estimate: u64,
        /// Bytes already written this run
        total: u64,
        /// Configured limit
        limit: u64,
    },
    /// Compression ratio below the floor
    MinArchiveRatio {
        /// `compressed / estimate`
        ratio: f64,
        /// Configured floor
        floor: f64,
    },
    /// Not enough free space would remain
    MinDiskFreeSpace {
        /// Free bytes before extraction
        free: u64,
        /// Expected uncompressed size (0 when unknown)
        estimate: u64,
        /// Configured floor
        floor: u64,
    },
}

impl RejectReason {
    /// Warning code recorded for this rejection
    pub fn code(&self) -> WarningCode {
        match self {
            RejectReason::MaxDepth { .. } => WarningCode::MaxDepth,
            RejectReason::MaxArchiveSize { .. } => WarningCode::MaxArchiveSizeBytes,
            RejectReason::MaxTotalSize { .. } => WarningCode::MaxTotalSizeBytes,
            RejectReason::MinArchiveRatio { .. } => WarningCode::MinArchiveRatio,
            RejectReason::MinDiskFreeSpace { .. } => WarningCode::MinDiskFreeSpace,
        }
    }
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::MaxDepth { depth, limit } => {
                write!(f, "archive at depth {depth} reaches the depth limit of {limit}")
            }
            RejectReason::MaxArchiveSize { estimate, limit } => write!(
                f,
                "uncompressed size {} exceeds the per-archive limit of {}",
                format_file_size(*estimate),
                format_file_size(*limit)
            ),
            RejectReason::MaxTotalSize {
                estimate,
                total,
                limit,
            } => write!(
                f,
                "extracting {} on top of {} already written exceeds the run limit of {}",
                format_file_size(*estimate),
                format_file_size(*total),
                format_file_size(*limit)
            ),
            RejectReason::MinArchiveRatio { ratio, floor } => {
                write!(f, "compression ratio {ratio:.6} is below the floor of {floor}")
            }
            RejectReason::MinDiskFreeSpace {
                free,
                estimate,
                floor,
            } => write!(
                f,
                "extracting {} would leave less than {} free (currently {})",
                format_file_size(*estimate),
                format_file_size(*floor),
                format_file_size(*free)
            ),
        }
    }
}

/// Applies the limits of a [`BudgetConfig`] to one run
#[derive(Debug)]
pub struct BudgetTracker {
    limits: BudgetConfig,
    ledger: RunLedger,
    committed: HashSet<Fingerprint>,
}

impl BudgetTracker {
    /// Fresh tracker with an empty ledger
    pub fn new(limits: BudgetConfig) -> Self {
        Self {
            limits,
            ledger: RunLedger::default(),
            committed: HashSet::new(),
        }
    }

    /// Current totals
    pub fn ledger(&self) -> &RunLedger {
        &self.ledger
    }

    /// Set the depth of the archive about to be considered
    pub fn enter(&mut self, depth: u32) {
        self.ledger.current_depth = depth;
    }

    /// Run the admission checks for an archive at the current depth
    pub fn admit(&self, candidate: &Candidate) -> Admission {
        match self.first_violation(candidate) {
            Some(reason) => Admission::Reject(reason),
            None => Admission::Admit,
        }
    }

    /// Depth check alone, run before any tool looks at the archive
    pub fn check_depth(&self) -> Option<RejectReason> {
        let depth = self.ledger.current_depth;
        let limit = self.limits.max_depth;
        (limit != 0 && depth >= limit).then_some(RejectReason::MaxDepth { depth, limit })
    }

    fn first_violation(&self, candidate: &Candidate) -> Option<RejectReason> {
        if let Some(reason) = self.check_depth() {
            return Some(reason);
        }

        let limits = &self.limits;
        if let Some(estimate) = candidate.estimate {
            if estimate > limits.max_archive_size_bytes {
                return Some(RejectReason::MaxArchiveSize {
                    estimate,
                    limit: limits.max_archive_size_bytes,
                });
            }

            let total = self.ledger.total_extracted_bytes;
            if total.saturating_add(estimate) > limits.max_total_size_bytes {
                return Some(RejectReason::MaxTotalSize {
                    estimate,
                    total,
                    limit: limits.max_total_size_bytes,
                });
            }

            if estimate > 0 {
                let ratio = candidate.compressed_size as f64 / estimate as f64;
                if ratio < limits.min_archive_ratio {
                    return Some(RejectReason::MinArchiveRatio {
                        ratio,
                        floor: limits.min_archive_ratio,
                    });
                }
            }
        }

        if let Some(free) = candidate.free_space {
            let estimate = candidate.estimate.unwrap_or(0);
            if free.saturating_sub(estimate) < limits.min_disk_free_space {
                return Some(RejectReason::MinDiskFreeSpace {
                    free,
                    estimate,
                    floor: limits.min_disk_free_space,
                });
            }
        }

        None
    }

    /// Count a produced file, once per distinct content
    ///
    /// `already_tracked` marks content recorded by an earlier run or an
    /// earlier part of this one. Returns whether the bytes were counted.
    pub fn commit_entry(&mut self, fingerprint: &Fingerprint, size: u64, already_tracked: bool) -> bool {
        if already_tracked || !self.committed.insert(fingerprint.clone()) {
            return false;
        }
        self.commit_bytes(size);
        true
    }

    /// Count bytes that cannot be attributed to a fingerprint
    pub fn commit_bytes(&mut self, size: u64) {
        self.ledger.total_extracted_bytes = self.ledger.total_extracted_bytes.saturating_add(size);
    }
}
