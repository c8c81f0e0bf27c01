//! Side-effect-free filesystem probes
//!
//! Everything here folds I/O failures into "absent" except where a caller needs
//! the error to record it as a scan problem.

use std::io;
use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use thiserror::Error;

use super::{DirEntryInfo, HostFs};

/// Error from [`read_json`]: either the read or the parse failed
#[derive(Debug, Error)]
pub enum JsonReadError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Parse(#[from] serde_json::Error),
}

/// Whether anything exists at `path`. Errors count as absence.
pub fn exists(fs: &impl HostFs, path: &Path) -> bool {
    fs.metadata(path).is_ok()
}

/// Whether `path` is an existing directory
pub fn is_dir(fs: &impl HostFs, path: &Path) -> bool {
    fs.metadata(path).map(|m| m.is_dir).unwrap_or(false)
}

/// Directory listing sorted by name, so walks are deterministic
pub fn list_dir(fs: &impl HostFs, path: &Path) -> io::Result<Vec<DirEntryInfo>> {
    let mut entries = fs.read_dir(path)?;
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}

/// Modification time of `path` as UTC
pub fn modified_time(fs: &impl HostFs, path: &Path) -> io::Result<DateTime<Utc>> {
    fs.metadata(path).map(|m| DateTime::<Utc>::from(m.modified))
}

/// Read and deserialize a JSON file
pub fn read_json<T: DeserializeOwned>(fs: &impl HostFs, path: &Path) -> Result<T, JsonReadError> {
    let bytes = fs.read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Resolve `.` and `..` components without touching the disk
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // Popping past the root is a no-op, like the OS does
                if !matches!(
                    out.components().next_back(),
                    None | Some(Component::RootDir) | Some(Component::Prefix(_))
                ) {
                    out.pop();
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Component-wise subtree check: `/ws2/a` is not inside `/ws`
pub fn is_within(root: &Path, path: &Path) -> bool {
    normalize_lexically(path).starts_with(normalize_lexically(root))
}

/// `path` relative to `root`, or `None` when it is outside or equal to the root
pub fn relative_to(root: &Path, path: &Path) -> Option<PathBuf> {
    let root = normalize_lexically(root);
    let path = normalize_lexically(path);
    let rel = path.strip_prefix(&root).ok()?;
    if rel.as_os_str().is_empty() {
        None
    } else {
        Some(rel.to_path_buf())
    }
}
