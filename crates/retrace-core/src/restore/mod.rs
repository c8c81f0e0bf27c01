//! Restoration of deleted files and folders from their newest snapshot
//!
//! Files: parent directory, read snapshot, overwrite origin. Folders: create the
//! directory, then every child, continuing past child failures. Partial results
//! stay on disk; the aggregate reports how many entries failed.

pub mod verify;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::RestoreOptions;
use crate::error::{RestoreError, RestoreFailure};
use crate::fs::HostFs;
use crate::{DeletedRecord, FileRecord, FolderRecord};

/// Running count threaded through a folder restoration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreTally {
    pub restored: usize,
    pub failed: usize,
    pub failures: Vec<RestoreFailure>,
}

impl RestoreTally {
    fn success(&mut self) {
        self.restored += 1;
    }

    fn failure(&mut self, path: &Path, error: &RestoreError) {
        tracing::warn!("❌ Failed to restore {}: {}", path.display(), error);
        self.failed += 1;
        self.failures.push(RestoreFailure {
            path: path.to_path_buf(),
            reason: error.to_string(),
        });
    }

    /// `Err(Partial)` when anything failed; what succeeded is left in place
    pub fn into_result(self) -> Result<RestoreTally, RestoreError> {
        if self.failed > 0 {
            Err(RestoreError::Partial {
                restored: self.restored,
                failed: self.failed,
                failures: self.failures,
            })
        } else {
            Ok(self)
        }
    }
}

/// Aggregate of a caller-supplied batch of unrelated nodes
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchReport {
    /// Nodes in the batch
    pub total: usize,
    /// Nodes restored completely
    pub restored: usize,
    /// Every failed entry, including those inside partially restored folders
    pub failures: Vec<RestoreFailure>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Progress of a batch restoration
#[derive(Debug, Clone)]
pub struct RestoreProgress {
    pub completed: usize,
    pub total: usize,
    pub current: std::path::PathBuf,
}

/// Sequential restoration engine
pub struct Restorer<'a, F: HostFs> {
    fs: &'a F,
    options: RestoreOptions,
    progress_callback: Option<Box<dyn Fn(RestoreProgress) + 'a>>,
}

impl<'a, F: HostFs> Restorer<'a, F> {
    pub fn new(fs: &'a F, options: RestoreOptions) -> Self {
        Self {
            fs,
            options,
            progress_callback: None,
        }
    }

    pub fn set_progress_callback<C>(&mut self, callback: C)
    where
        C: Fn(RestoreProgress) + 'a,
    {
        self.progress_callback = Some(Box::new(callback));
    }

    /// Restore one node of either kind
    pub fn restore(&self, node: &DeletedRecord) -> Result<RestoreTally, RestoreError> {
        match node {
            DeletedRecord::File(file) => {
                self.restore_file(file)?;
                Ok(RestoreTally {
                    restored: 1,
                    ..Default::default()
                })
            }
            DeletedRecord::Folder(folder) => self.restore_folder(folder),
        }
    }

    /// Write the snapshot back to the origin path. Returns bytes written.
    pub fn restore_file(&self, record: &FileRecord) -> Result<u64, RestoreError> {
        validate_origin(&record.origin_path)?;
        let snapshot = record
            .backup_snapshot_path
            .as_ref()
            .ok_or_else(|| RestoreError::NoBackup {
                path: record.origin_path.clone(),
            })?;

        if let Some(parent) = record.origin_path.parent() {
            self.fs
                .create_dir_all(parent)
                .map_err(|source| RestoreError::CreateDir {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let content = self
            .fs
            .read(snapshot)
            .map_err(|source| RestoreError::ReadSnapshot {
                path: snapshot.clone(),
                source,
            })?;

        self.fs
            .write(&record.origin_path, &content)
            .map_err(|source| RestoreError::WriteTarget {
                path: record.origin_path.clone(),
                source,
            })?;

        if self.options.verify {
            verify::verify_restored(self.fs, &record.origin_path, &content)?;
        }

        tracing::info!(
            "✅ Restored {} ({} bytes)",
            record.relative_path.display(),
            content.len()
        );
        Ok(content.len() as u64)
    }

    /// Create the folder, then restore its subtree best-effort
    pub fn restore_folder(&self, folder: &FolderRecord) -> Result<RestoreTally, RestoreError> {
        validate_origin(&folder.origin_path)?;
        self.create_folder(folder)?;

        let mut tally = RestoreTally::default();
        self.restore_children(&folder.children, &mut tally);

        tracing::info!(
            "📁 Restored folder {}: {} entries restored, {} failed",
            folder.relative_path.display(),
            tally.restored,
            tally.failed
        );
        tally.into_result()
    }

    fn create_folder(&self, folder: &FolderRecord) -> Result<(), RestoreError> {
        self.fs
            .create_dir_all(&folder.origin_path)
            .map_err(|source| RestoreError::CreateDir {
                path: folder.origin_path.clone(),
                source,
            })
    }

    fn restore_children(&self, children: &[DeletedRecord], tally: &mut RestoreTally) {
        for child in children {
            match child {
                DeletedRecord::File(file) => match self.restore_file(file) {
                    Ok(_) => tally.success(),
                    Err(e) => tally.failure(&file.origin_path, &e),
                },
                DeletedRecord::Folder(sub) => {
                    // A folder that cannot be created takes its subtree down with it
                    match validate_origin(&sub.origin_path).and_then(|_| self.create_folder(sub)) {
                        Ok(()) => self.restore_children(&sub.children, tally),
                        Err(e) => tally.failure(&sub.origin_path, &e),
                    }
                }
            }
        }
    }

    /// Restore unrelated nodes one after another, never stopping on a failure
    pub fn restore_batch(&self, nodes: &[DeletedRecord]) -> BatchReport {
        let mut report = BatchReport {
            total: nodes.len(),
            ..Default::default()
        };

        for (i, node) in nodes.iter().enumerate() {
            if let Some(callback) = &self.progress_callback {
                callback(RestoreProgress {
                    completed: i,
                    total: nodes.len(),
                    current: node.origin_path().to_path_buf(),
                });
            }

            match self.restore(node) {
                Ok(_) => report.restored += 1,
                Err(e) => {
                    tracing::warn!("❌ Failed to restore {}: {}", node.origin_path().display(), e);
                    report.failures.extend(e.failures(node.origin_path()));
                }
            }
        }

        if let Some(callback) = &self.progress_callback {
            callback(RestoreProgress {
                completed: nodes.len(),
                total: nodes.len(),
                current: std::path::PathBuf::new(),
            });
        }

        tracing::info!(
            "Restoration complete: {}/{} items restored",
            report.restored,
            report.total
        );
        report
    }
}

fn validate_origin(origin: &Path) -> Result<(), RestoreError> {
    if !origin.is_absolute() {
        return Err(RestoreError::InvalidNode {
            reason: format!("origin path is not absolute: {}", origin.display()),
        });
    }
    if origin.file_name().is_none() {
        return Err(RestoreError::InvalidNode {
            reason: format!("origin path has no file name: {}", origin.display()),
        });
    }
    Ok(())
}
