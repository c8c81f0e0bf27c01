//! Folding flat deleted-file records into a folder/file forest
//!
//! Deleted folders have no backups of their own; they are inferred from the
//! files beneath them and take the newest deletion time found in their subtree.

use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeSet, HashMap};
use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::{DeletedRecord, FileRecord, FolderRecord};

/// Build the top-level forest for `workspace` from discovery records
pub fn organize(workspace: &Path, records: Vec<FileRecord>) -> Vec<DeletedRecord> {
    let mut forest: Vec<DeletedRecord> = Vec::new();
    let mut folder_paths: BTreeSet<PathBuf> = BTreeSet::new();
    let mut children_of: HashMap<PathBuf, Vec<DeletedRecord>> = HashMap::new();

    for mut record in records {
        record.relative_path = clean_relative(&record.relative_path);
        if record.relative_path.as_os_str().is_empty() {
            tracing::warn!(
                "Dropping record with empty relative path: {}",
                record.origin_path.display()
            );
            continue;
        }

        match parent_dir(&record.relative_path) {
            None => forest.push(DeletedRecord::File(record)),
            Some(parent) => {
                for ancestor in parent.ancestors() {
                    if !ancestor.as_os_str().is_empty() {
                        folder_paths.insert(ancestor.to_path_buf());
                    }
                }
                children_of
                    .entry(parent)
                    .or_default()
                    .push(DeletedRecord::File(record));
            }
        }
    }

    // Deepest folders first, so a folder's subfolders exist before it is attached
    let mut ordered: Vec<PathBuf> = folder_paths.into_iter().collect();
    ordered.sort_by_key(|p| Reverse(p.components().count()));

    for relative in ordered {
        let folder = FolderRecord {
            origin_path: workspace.join(&relative),
            children: children_of.remove(&relative).unwrap_or_default(),
            relative_path: relative,
            deletion_time: DateTime::<Utc>::UNIX_EPOCH,
        };
        match parent_dir(&folder.relative_path) {
            Some(parent) => children_of
                .entry(parent)
                .or_default()
                .push(DeletedRecord::Folder(folder)),
            None => forest.push(DeletedRecord::Folder(folder)),
        }
    }

    aggregate_deletion_times(&mut forest);
    sort_forest(&mut forest);

    tracing::debug!("🌳 Organized forest with {} top-level nodes", forest.len());
    forest
}

/// Set every folder's deletion time to the newest time among its children, bottom-up
pub fn aggregate_deletion_times(nodes: &mut [DeletedRecord]) {
    for node in nodes {
        if let DeletedRecord::Folder(folder) = node {
            aggregate_deletion_times(&mut folder.children);
            folder.deletion_time = folder
                .children
                .iter()
                .map(DeletedRecord::deletion_time)
                .max()
                .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
        }
    }
}

/// Folders before files, then case-sensitive by name, at every level
pub fn sort_forest(nodes: &mut [DeletedRecord]) {
    nodes.sort_by(compare_nodes);
    for node in nodes {
        if let DeletedRecord::Folder(folder) = node {
            sort_forest(&mut folder.children);
        }
    }
}

fn compare_nodes(a: &DeletedRecord, b: &DeletedRecord) -> Ordering {
    b.is_directory()
        .cmp(&a.is_directory())
        .then_with(|| a.name().cmp(&b.name()))
}

/// Parent directory relative to the workspace; `None` for root-level entries
fn parent_dir(relative: &Path) -> Option<PathBuf> {
    relative
        .parent()
        .filter(|p| !p.as_os_str().is_empty() && *p != Path::new("."))
        .map(Path::to_path_buf)
}

/// Keep only normal components ("./a/b" -> "a/b")
fn clean_relative(relative: &Path) -> PathBuf {
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part),
            _ => None,
        })
        .collect()
}
