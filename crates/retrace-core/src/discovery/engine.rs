//! Discovery of deleted workspace files from history backups
//!
//! Walks each backup root, resolves every backup directory to an origin path,
//! keeps origins that are inside the workspace and gone from disk, and picks the
//! newest snapshot per origin. Results and scan errors travel in an explicit
//! accumulator so a pass has no state outside its own call.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::locator::BackupRoot;
use super::marker::HistoryMarker;
use crate::config::ScanConfig;
use crate::error::{ScanError, ScanErrorKind};
use crate::fs::probe::{self, JsonReadError};
use crate::fs::uri::{find_file_uri, normalize_resource};
use crate::fs::{DirEntryInfo, HostFs};
use crate::FileRecord;

/// Outcome of one discovery pass
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscoveryReport {
    /// One record per deleted origin path, ordered by origin path
    pub records: Vec<FileRecord>,
    /// Non-fatal problems; non-empty means some storage could not be scanned
    pub errors: Vec<ScanError>,
    pub roots_scanned: usize,
    pub directories_visited: usize,
}

impl DiscoveryReport {
    /// True when every root and directory was read without problems
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// A resolved backup directory
#[derive(Debug, Clone)]
struct Candidate {
    origin: PathBuf,
    relative: PathBuf,
    snapshot: PathBuf,
    modified: DateTime<Utc>,
}

/// Snapshot file with its modification time
#[derive(Debug, Clone)]
struct Snapshot {
    path: PathBuf,
    name: String,
    modified: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct ScanAccumulator {
    found: BTreeMap<PathBuf, Candidate>,
    errors: Vec<ScanError>,
    directories_visited: usize,
}

impl ScanAccumulator {
    /// Keep the candidate with the newer snapshot; on a tie the first one seen stays
    fn offer(&mut self, candidate: Candidate) {
        match self.found.get(&candidate.origin) {
            Some(existing) if existing.modified >= candidate.modified => {
                tracing::debug!(
                    "Keeping newer snapshot {} for {}",
                    existing.snapshot.display(),
                    existing.origin.display()
                );
            }
            _ => {
                self.found.insert(candidate.origin.clone(), candidate);
            }
        }
    }

    fn error(&mut self, kind: ScanErrorKind, path: &Path, message: impl ToString) {
        let error = ScanError::new(kind, path, message);
        tracing::warn!("⚠️  {}", error);
        self.errors.push(error);
    }
}

/// Discovery engine bound to one workspace
pub struct DiscoveryEngine<'a, F: HostFs> {
    fs: &'a F,
    workspace: PathBuf,
    config: &'a ScanConfig,
}

impl<'a, F: HostFs> DiscoveryEngine<'a, F> {
    pub fn new(fs: &'a F, workspace: &Path, config: &'a ScanConfig) -> Self {
        Self {
            fs,
            workspace: probe::normalize_lexically(workspace),
            config,
        }
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    /// Walk `roots` in order and collect every deleted file they can restore
    pub fn discover(&self, roots: &[BackupRoot]) -> DiscoveryReport {
        tracing::info!(
            "🔍 Scanning {} backup roots for deleted files under {}",
            roots.len(),
            self.workspace.display()
        );

        let mut acc = ScanAccumulator::default();
        for root in roots {
            tracing::debug!("Scanning {} root {}", root.kind, root.path.display());
            self.walk(&root.path, 0, &mut acc);
        }

        let records: Vec<FileRecord> = acc
            .found
            .into_values()
            .map(|c| FileRecord {
                origin_path: c.origin,
                relative_path: c.relative,
                deletion_time: c.modified,
                backup_snapshot_path: Some(c.snapshot),
            })
            .collect();

        tracing::info!(
            "Discovery complete: {} deleted files, {} directories visited, {} scan errors",
            records.len(),
            acc.directories_visited,
            acc.errors.len()
        );

        DiscoveryReport {
            records,
            errors: acc.errors,
            roots_scanned: roots.len(),
            directories_visited: acc.directories_visited,
        }
    }

    fn walk(&self, dir: &Path, depth: usize, acc: &mut ScanAccumulator) {
        if depth > self.config.max_depth {
            tracing::debug!("Depth bound reached at {}", dir.display());
            return;
        }
        acc.directories_visited += 1;

        let entries = match probe::list_dir(self.fs, dir) {
            Ok(entries) => entries,
            Err(e) => {
                acc.error(ScanErrorKind::ReadDir, dir, e);
                return;
            }
        };

        let (subdirs, files): (Vec<DirEntryInfo>, Vec<DirEntryInfo>) =
            entries.into_iter().partition(|e| e.is_dir);

        if let Some(candidate) = self.inspect_directory(dir, depth, &files, acc) {
            acc.offer(candidate);
        }

        for sub in &subdirs {
            self.walk(&sub.path, depth + 1, acc);
        }
    }

    /// Resolve one backup directory to a candidate, if it describes a deleted file
    fn inspect_directory(
        &self,
        dir: &Path,
        depth: usize,
        files: &[DirEntryInfo],
        acc: &mut ScanAccumulator,
    ) -> Option<Candidate> {
        let marker = files.iter().find(|f| f.name == self.config.marker_file_name);
        let snapshots: Vec<&DirEntryInfo> = files
            .iter()
            .filter(|f| f.name != self.config.marker_file_name)
            .collect();

        if snapshots.is_empty() {
            return None;
        }
        let newest = self.newest_snapshot(&snapshots, acc)?;

        let origin = match marker {
            Some(marker) => match probe::read_json::<HistoryMarker>(self.fs, &marker.path) {
                Ok(parsed) => match parsed.resource() {
                    Some(resource) => {
                        tracing::debug!(
                            "Marker {} names {} ({} entries)",
                            marker.path.display(),
                            resource,
                            parsed.entries.len()
                        );
                        // Unknown schemes are not workspace files
                        normalize_resource(resource)?
                    }
                    None => self.infer_origin(dir, depth, &newest, acc)?,
                },
                Err(JsonReadError::Io(e)) => {
                    acc.error(ScanErrorKind::ReadMarker, &marker.path, e);
                    return None;
                }
                Err(JsonReadError::Parse(e)) => {
                    acc.error(ScanErrorKind::ParseMarker, &marker.path, e);
                    return None;
                }
            },
            None => self.infer_origin(dir, depth, &newest, acc)?,
        };

        let (origin, relative) = self.accept(origin)?;

        tracing::debug!(
            "🗑️  Deleted: {} (snapshot {})",
            relative.display(),
            newest.path.display()
        );

        Some(Candidate {
            origin,
            relative,
            snapshot: newest.path,
            modified: newest.modified,
        })
    }

    /// Latest snapshot by modification time, then by name.
    ///
    /// A sibling that cannot be stat'ed might be the newest one, so the whole
    /// directory is skipped rather than risk pointing at a stale snapshot.
    fn newest_snapshot(
        &self,
        snapshots: &[&DirEntryInfo],
        acc: &mut ScanAccumulator,
    ) -> Option<Snapshot> {
        let mut newest: Option<Snapshot> = None;
        for entry in snapshots {
            let modified = match probe::modified_time(self.fs, &entry.path) {
                Ok(modified) => modified,
                Err(e) => {
                    acc.error(ScanErrorKind::Stat, &entry.path, e);
                    return None;
                }
            };
            let is_newer = match &newest {
                None => true,
                Some(current) => (modified, &entry.name) > (current.modified, &current.name),
            };
            if is_newer {
                newest = Some(Snapshot {
                    path: entry.path.clone(),
                    name: entry.name.clone(),
                    modified,
                });
            }
        }
        newest
    }

    /// Best-effort origin for a directory without a usable marker.
    ///
    /// Looks for a `file://` URI in the head of the newest snapshot, then falls
    /// back to `<workspace>/<directory name>`. Backup roots themselves are not
    /// treated as file directories. An unreadable snapshot skips the directory.
    fn infer_origin(
        &self,
        dir: &Path,
        depth: usize,
        newest: &Snapshot,
        acc: &mut ScanAccumulator,
    ) -> Option<PathBuf> {
        if depth == 0 {
            return None;
        }

        match self.fs.read_head(&newest.path, self.config.header_scan_lines) {
            Ok(lines) => {
                let embedded = lines
                    .iter()
                    .filter_map(|line| find_file_uri(line))
                    .find_map(normalize_resource);
                if let Some(origin) = embedded {
                    tracing::debug!(
                        "Embedded origin {} found in {}",
                        origin.display(),
                        newest.path.display()
                    );
                    return Some(origin);
                }
            }
            Err(e) => {
                acc.error(ScanErrorKind::ReadSnapshot, &newest.path, e);
                return None;
            }
        }

        // Can be wrong for nested files; the directory name is all we have
        let name = dir.file_name()?;
        Some(self.workspace.join(name))
    }

    /// Inside the workspace and absent from disk -> `(origin, relative)`
    fn accept(&self, origin: PathBuf) -> Option<(PathBuf, PathBuf)> {
        let origin = probe::normalize_lexically(&origin);
        let Some(relative) = probe::relative_to(&self.workspace, &origin) else {
            tracing::debug!("Outside workspace: {}", origin.display());
            return None;
        };
        if probe::exists(self.fs, &origin) {
            tracing::debug!("Still exists: {}", origin.display());
            return None;
        }
        Some((origin, relative))
    }
}
