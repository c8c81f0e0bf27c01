use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::time::Instant;
use uuid::Uuid;

pub mod config;
pub mod discovery;
pub mod error;
pub mod fs;
pub mod refresh;
pub mod restore;
pub mod tree;

// Re-export key types
pub use config::{RestoreOptions, ScanConfig};
pub use discovery::{BackupRoot, DiscoveryEngine, DiscoveryReport, RootKind};
pub use error::{RestoreError, RestoreFailure, ScanError, ScanErrorKind};
pub use fs::{HostFs, LocalFs};
pub use refresh::{RefreshGate, RefreshOutcome};
pub use restore::{BatchReport, RestoreProgress, RestoreTally, Restorer};
pub use tree::organize;

/// A deleted file with the snapshot that can bring it back
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Absolute path the file had before deletion
    pub origin_path: PathBuf,
    /// `origin_path` relative to the workspace root
    pub relative_path: PathBuf,
    /// Modification time of the chosen snapshot, used as a deletion-time proxy
    pub deletion_time: DateTime<Utc>,
    /// Newest snapshot; a record without one cannot be restored
    pub backup_snapshot_path: Option<PathBuf>,
}

/// A folder inferred from the deleted files beneath it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderRecord {
    pub origin_path: PathBuf,
    pub relative_path: PathBuf,
    /// Newest deletion time in the subtree
    pub deletion_time: DateTime<Utc>,
    /// Folders first, then files, each by name
    pub children: Vec<DeletedRecord>,
}

/// Node of the deleted-file forest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeletedRecord {
    File(FileRecord),
    Folder(FolderRecord),
}

impl DeletedRecord {
    pub fn origin_path(&self) -> &Path {
        match self {
            DeletedRecord::File(f) => &f.origin_path,
            DeletedRecord::Folder(d) => &d.origin_path,
        }
    }

    pub fn relative_path(&self) -> &Path {
        match self {
            DeletedRecord::File(f) => &f.relative_path,
            DeletedRecord::Folder(d) => &d.relative_path,
        }
    }

    pub fn deletion_time(&self) -> DateTime<Utc> {
        match self {
            DeletedRecord::File(f) => f.deletion_time,
            DeletedRecord::Folder(d) => d.deletion_time,
        }
    }

    pub fn is_directory(&self) -> bool {
        matches!(self, DeletedRecord::Folder(_))
    }

    /// Final path segment
    pub fn name(&self) -> Cow<'_, str> {
        self.relative_path()
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or(Cow::Borrowed(""))
    }

    pub fn children(&self) -> &[DeletedRecord] {
        match self {
            DeletedRecord::File(_) => &[],
            DeletedRecord::Folder(d) => &d.children,
        }
    }

    /// Number of files in this subtree
    pub fn file_count(&self) -> usize {
        match self {
            DeletedRecord::File(_) => 1,
            DeletedRecord::Folder(d) => d.children.iter().map(DeletedRecord::file_count).sum(),
        }
    }

    /// Every file in this subtree, depth-first in display order
    pub fn files(&self) -> Vec<&FileRecord> {
        let mut out = Vec::new();
        collect_files(self, &mut out);
        out
    }
}

fn collect_files<'a>(node: &'a DeletedRecord, out: &mut Vec<&'a FileRecord>) {
    match node {
        DeletedRecord::File(f) => out.push(f),
        DeletedRecord::Folder(d) => d.children.iter().for_each(|c| collect_files(c, out)),
    }
}

/// Find the node at `relative` in a forest
pub fn find_node<'a>(forest: &'a [DeletedRecord], relative: &Path) -> Option<&'a DeletedRecord> {
    for node in forest {
        if node.relative_path() == relative {
            return Some(node);
        }
        if relative.starts_with(node.relative_path()) {
            return find_node(node.children(), relative);
        }
    }
    None
}

/// Result of one "run discovery now" pass. Rebuilt from scratch every time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoverySession {
    pub id: Uuid,
    pub workspace: PathBuf,
    pub created_at: DateTime<Utc>,
    pub roots: Vec<BackupRoot>,
    pub forest: Vec<DeletedRecord>,
    pub errors: Vec<ScanError>,
    pub metadata: SessionMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMetadata {
    pub roots_scanned: usize,
    pub directories_visited: usize,
    pub files_found: usize,
    pub scan_duration_ms: u64,
}

impl DiscoverySession {
    /// False when some storage could not be scanned
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Scan the local disk for files deleted from `workspace`
pub fn scan_workspace(workspace: &Path, config: &ScanConfig) -> Result<DiscoverySession> {
    if !workspace.is_absolute() {
        anyhow::bail!("Workspace path must be absolute: {}", workspace.display());
    }
    let meta = std::fs::metadata(workspace)
        .with_context(|| format!("Workspace not found: {}", workspace.display()))?;
    if !meta.is_dir() {
        anyhow::bail!("Workspace is not a directory: {}", workspace.display());
    }
    Ok(scan_workspace_with(&LocalFs, workspace, config))
}

/// Locate roots, discover, and organize through any [`HostFs`]
pub fn scan_workspace_with(
    fs: &impl HostFs,
    workspace: &Path,
    config: &ScanConfig,
) -> DiscoverySession {
    let started = Instant::now();
    let workspace = crate::fs::probe::normalize_lexically(workspace);

    let roots = discovery::locate_backup_roots(fs, &workspace, config);
    let engine = DiscoveryEngine::new(fs, &workspace, config);
    let report = engine.discover(&roots);
    let files_found = report.records.len();
    let forest = organize(&workspace, report.records);

    let session = DiscoverySession {
        id: Uuid::new_v4(),
        workspace,
        created_at: Utc::now(),
        roots,
        forest,
        errors: report.errors,
        metadata: SessionMetadata {
            roots_scanned: report.roots_scanned,
            directories_visited: report.directories_visited,
            files_found,
            scan_duration_ms: started.elapsed().as_millis() as u64,
        },
    };

    tracing::info!(
        "Created discovery session {} for {}: {} deleted files",
        session.id,
        session.workspace.display(),
        files_found
    );
    session
}
