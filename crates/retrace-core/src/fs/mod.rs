//! Filesystem capability used by discovery and restoration
//!
//! Engines never touch `std::fs` directly; they call through [`HostFs`] so the
//! host (CLI, editor extension, tests) decides how files are read and written.

use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

pub mod probe;
pub mod uri;

/// Upper bound on bytes [`LocalFs::read_head`] looks at, newlines or not
pub const HEAD_READ_LIMIT: u64 = 64 * 1024;

/// Stat result for a single entry
#[derive(Debug, Clone, Copy)]
pub struct EntryMeta {
    pub is_dir: bool,
    pub modified: SystemTime,
}

/// One child of a listed directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntryInfo {
    pub name: String,
    pub path: PathBuf,
    pub is_dir: bool,
}

/// File read/write/stat/mkdir primitives the core depends on
pub trait HostFs {
    /// Stat a path, following symlinks
    fn metadata(&self, path: &Path) -> io::Result<EntryMeta>;

    /// List the direct children of a directory
    fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntryInfo>>;

    /// Read the full content of a file
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Read at most `max_lines` lines from the start of a file (lossy UTF-8)
    fn read_head(&self, path: &Path, max_lines: usize) -> io::Result<Vec<String>>;

    /// Create or truncate `path` and write `contents`
    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()>;

    /// Create a directory and all missing parents; existing directories are fine
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;
}

/// [`HostFs`] backed by the local disk
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl HostFs for LocalFs {
    fn metadata(&self, path: &Path) -> io::Result<EntryMeta> {
        let meta = std::fs::metadata(path)?;
        Ok(EntryMeta {
            is_dir: meta.is_dir(),
            modified: meta.modified()?,
        })
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntryInfo>> {
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(path)? {
            let entry = entry?;
            let path = entry.path();
            // file_type() does not follow symlinks; a linked directory counts as a directory
            let is_dir = match entry.file_type() {
                Ok(ft) if ft.is_symlink() => path.is_dir(),
                Ok(ft) => ft.is_dir(),
                Err(_) => false,
            };
            entries.push(DirEntryInfo {
                name: entry.file_name().to_string_lossy().into_owned(),
                path,
                is_dir,
            });
        }
        Ok(entries)
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }

    fn read_head(&self, path: &Path, max_lines: usize) -> io::Result<Vec<String>> {
        let reader = BufReader::new(std::fs::File::open(path)?.take(HEAD_READ_LIMIT));
        let mut lines = Vec::with_capacity(max_lines);
        for line in reader.split(b'\n').take(max_lines) {
            lines.push(String::from_utf8_lossy(&line?).into_owned());
        }
        Ok(lines)
    }

    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        std::fs::write(path, contents)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }
}
