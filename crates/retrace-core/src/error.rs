//! Error types shared by discovery and restoration

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Category of a non-fatal problem hit while walking backup storage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanErrorKind {
    /// A directory listing failed
    ReadDir,
    /// Stat of a snapshot file failed
    Stat,
    /// The metadata marker could not be read
    ReadMarker,
    /// The metadata marker is not valid JSON
    ParseMarker,
    /// The newest snapshot could not be read for an embedded origin marker
    ReadSnapshot,
}

impl std::fmt::Display for ScanErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanErrorKind::ReadDir => write!(f, "read dir"),
            ScanErrorKind::Stat => write!(f, "stat"),
            ScanErrorKind::ReadMarker => write!(f, "read marker"),
            ScanErrorKind::ParseMarker => write!(f, "parse marker"),
            ScanErrorKind::ReadSnapshot => write!(f, "read snapshot"),
        }
    }
}

/// A scan problem collected alongside results. Never aborts a discovery pass.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("{kind} failed for {}: {message}", path.display())]
pub struct ScanError {
    pub path: PathBuf,
    pub kind: ScanErrorKind,
    pub message: String,
}

impl ScanError {
    pub fn new(kind: ScanErrorKind, path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self {
            path: path.into(),
            kind,
            message: message.to_string(),
        }
    }
}

/// One entry that could not be restored inside a folder or batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreFailure {
    pub path: PathBuf,
    pub reason: String,
}

/// Failure restoring a single node, or the aggregate of a partially restored subtree
#[derive(Debug, Error)]
pub enum RestoreError {
    #[error("no backup available for {}", path.display())]
    NoBackup { path: PathBuf },

    #[error("invalid node: {reason}")]
    InvalidNode { reason: String },

    #[error("failed to read snapshot {}: {source}", path.display())]
    ReadSnapshot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    WriteTarget {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to create directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read back {}: {source}", path.display())]
    ReadBack {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("verification failed for {}: expected sha256 {expected}, found {actual}", path.display())]
    VerificationFailed {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("restored {restored} entries, {failed} failed")]
    Partial {
        restored: usize,
        failed: usize,
        failures: Vec<RestoreFailure>,
    },
}

impl RestoreError {
    /// Entries that failed, for reporting. Single-item errors report themselves.
    pub fn failures(&self, path: &std::path::Path) -> Vec<RestoreFailure> {
        match self {
            RestoreError::Partial { failures, .. } => failures.clone(),
            other => vec![RestoreFailure {
                path: path.to_path_buf(),
                reason: other.to_string(),
            }],
        }
    }
}
