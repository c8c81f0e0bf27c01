//! Integration tests for discovery and tree organization over real backup layouts

use retrace_core::{
    discovery::{BackupRoot, RootKind},
    scan_workspace_with, DeletedRecord, DiscoveryEngine, LocalFs, ScanConfig,
};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

/// Workspace plus a backup store, both under one temp dir
struct Fixture {
    _temp: TempDir,
    ws: PathBuf,
    backups: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let ws = temp.path().join("ws");
        let backups = temp.path().join("backups");
        std::fs::create_dir_all(&ws).unwrap();
        std::fs::create_dir_all(&backups).unwrap();
        Self {
            _temp: temp,
            ws,
            backups,
        }
    }

    fn uri(&self, rel: &str) -> String {
        format!("file://{}/{}", self.ws.display(), rel)
    }

    /// `<backups>/<dir>/entries.json` naming `resource`, plus snapshots `(name, content, mtime)`
    fn history_entry(&self, dir: &str, resource: &str, snapshots: &[(&str, &str, u64)]) -> PathBuf {
        let entry_dir = self.backups.join(dir);
        std::fs::create_dir_all(&entry_dir).unwrap();
        std::fs::write(
            entry_dir.join("entries.json"),
            format!(r#"{{"version":1,"resource":"{}","entries":[]}}"#, resource),
        )
        .unwrap();
        for (name, content, mtime) in snapshots {
            write_with_mtime(&entry_dir.join(name), content, *mtime);
        }
        entry_dir
    }

    fn config(&self) -> ScanConfig {
        ScanConfig::only_roots(vec![self.backups.clone()])
    }
}

fn write_with_mtime(path: &Path, content: &str, secs: u64) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
    let file = File::options().write(true).open(path).unwrap();
    file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(secs))
        .unwrap();
}

fn custom_root(path: &Path) -> BackupRoot {
    BackupRoot {
        kind: RootKind::Custom,
        path: path.to_path_buf(),
    }
}

#[test]
fn test_deleted_file_is_discovered() {
    let fx = Fixture::new();
    fx.history_entry("history/h1", &fx.uri("dir/deleted.txt"), &[("backup-1", "content", 1_000)]);

    let config = fx.config();
    let report = DiscoveryEngine::new(&LocalFs, &fx.ws, &config).discover(&[custom_root(&fx.backups)]);

    assert!(report.is_clean());
    assert_eq!(report.records.len(), 1);
    let record = &report.records[0];
    assert_eq!(record.relative_path, PathBuf::from("dir/deleted.txt"));
    assert_eq!(record.origin_path, fx.ws.join("dir/deleted.txt"));
    assert!(record
        .backup_snapshot_path
        .as_ref()
        .unwrap()
        .ends_with("backup-1"));
}

#[test]
fn test_existing_file_is_not_deleted() {
    let fx = Fixture::new();
    fx.history_entry("history/h1", &fx.uri("dir/deleted.txt"), &[("backup-1", "content", 1_000)]);
    std::fs::create_dir_all(fx.ws.join("dir")).unwrap();
    std::fs::write(fx.ws.join("dir/deleted.txt"), "still here").unwrap();

    let config = fx.config();
    let report = DiscoveryEngine::new(&LocalFs, &fx.ws, &config).discover(&[custom_root(&fx.backups)]);

    assert!(report.records.is_empty());
    assert!(report.is_clean());
}

#[test]
fn test_outside_workspace_is_excluded() {
    let fx = Fixture::new();
    let sibling = fx.ws.parent().unwrap().join("ws2").join("a.txt");
    fx.history_entry("h1", &format!("file://{}", sibling.display()), &[("s", "x", 10)]);
    fx.history_entry("h2", "file:///definitely/elsewhere/b.txt", &[("s", "x", 10)]);
    fx.history_entry("h3", &fx.uri("../escape.txt"), &[("s", "x", 10)]);

    let config = fx.config();
    let report = DiscoveryEngine::new(&LocalFs, &fx.ws, &config).discover(&[custom_root(&fx.backups)]);

    assert!(report.records.is_empty());
    assert!(report.is_clean());
}

#[test]
fn test_remote_and_encoded_resources() {
    let fx = Fixture::new();
    fx.history_entry(
        "h1",
        &format!("vscode-remote://ssh-remote%2Bhost{}/my%20file.rs", fx.ws.display()),
        &[("s", "x", 10)],
    );

    let config = fx.config();
    let report = DiscoveryEngine::new(&LocalFs, &fx.ws, &config).discover(&[custom_root(&fx.backups)]);

    assert_eq!(report.records.len(), 1);
    assert_eq!(report.records[0].relative_path, PathBuf::from("my file.rs"));
}

#[test]
fn test_newest_snapshot_wins_across_roots() {
    let fx = Fixture::new();
    let other = fx.backups.parent().unwrap().join("global");

    fx.history_entry("h1", &fx.uri("a.txt"), &[("old", "old", 100)]);
    std::fs::create_dir_all(other.join("g1")).unwrap();
    std::fs::write(
        other.join("g1/entries.json"),
        format!(r#"{{"resource":"{}"}}"#, fx.uri("a.txt")),
    )
    .unwrap();
    write_with_mtime(&other.join("g1/new"), "new", 200);

    let config = fx.config();
    let engine = DiscoveryEngine::new(&LocalFs, &fx.ws, &config);

    for roots in [
        vec![custom_root(&fx.backups), custom_root(&other)],
        vec![custom_root(&other), custom_root(&fx.backups)],
    ] {
        let report = engine.discover(&roots);
        assert_eq!(report.records.len(), 1);
        assert_eq!(
            report.records[0].backup_snapshot_path,
            Some(other.join("g1/new"))
        );
        assert_eq!(report.records[0].deletion_time.timestamp(), 200);
    }
}

#[test]
fn test_unreadable_directory_does_not_abort_discovery() {
    let fx = Fixture::new();
    fx.history_entry("h1", &fx.uri("kept.txt"), &[("s", "x", 10)]);

    let config = fx.config();
    let report = DiscoveryEngine::new(&LocalFs, &fx.ws, &config).discover(&[
        custom_root(&fx.backups.join("missing-root")),
        custom_root(&fx.backups),
    ]);

    assert_eq!(report.records.len(), 1);
    assert_eq!(report.errors.len(), 1);
    assert!(!report.is_clean());
}

#[test]
fn test_scan_builds_forest_and_is_idempotent() {
    let fx = Fixture::new();
    fx.history_entry("h1", &fx.uri("a/x.txt"), &[("s", "x", 100)]);
    fx.history_entry("h2", &fx.uri("a/b/y.txt"), &[("s", "y", 300)]);
    fx.history_entry("h3", &fx.uri("top.txt"), &[("s", "t", 50)]);

    let config = fx.config();
    let first = scan_workspace_with(&LocalFs, &fx.ws, &config);
    let second = scan_workspace_with(&LocalFs, &fx.ws, &config);

    assert_eq!(first.forest, second.forest);
    assert_ne!(first.id, second.id);
    assert_eq!(first.metadata.files_found, 3);
    assert!(first.is_complete());

    assert_eq!(first.forest.len(), 2);
    let DeletedRecord::Folder(a) = &first.forest[0] else {
        panic!("expected folder first");
    };
    assert_eq!(a.relative_path, PathBuf::from("a"));
    assert_eq!(a.deletion_time.timestamp(), 300);
    assert_eq!(a.children.len(), 2);
    assert!(a.children[0].is_directory());
    assert_eq!(a.children[1].name(), "x.txt");
    assert_eq!(first.forest[1].name(), "top.txt");
}

#[test]
fn test_folder_time_is_max_of_descendants() {
    fn check(node: &DeletedRecord) {
        if let DeletedRecord::Folder(folder) = node {
            let newest = node
                .files()
                .iter()
                .map(|f| f.deletion_time)
                .max()
                .unwrap();
            assert_eq!(folder.deletion_time, newest);
            folder.children.iter().for_each(check);
        }
    }

    let fx = Fixture::new();
    let layout = [
        ("p/q/r/1.txt", 10),
        ("p/q/2.txt", 70),
        ("p/3.txt", 20),
        ("p/s/4.txt", 40),
        ("t/5.txt", 5),
    ];
    for (i, (rel, mtime)) in layout.iter().enumerate() {
        fx.history_entry(&format!("h{}", i), &fx.uri(rel), &[("s", "x", *mtime)]);
    }

    let session = scan_workspace_with(&LocalFs, &fx.ws, &fx.config());
    assert_eq!(session.metadata.files_found, layout.len());
    session.forest.iter().for_each(check);
}
