//! Scan and restore configuration

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Default bound on backup storage nesting
pub const DEFAULT_MAX_DEPTH: usize = 15;

/// Lines read from a snapshot when looking for an embedded `file://` marker
pub const DEFAULT_HEADER_SCAN_LINES: usize = 10;

/// Metadata marker written next to history snapshots
pub const DEFAULT_MARKER_FILE: &str = "entries.json";

/// Editor product directories under the user config dir, in scan order
pub const DEFAULT_PRODUCTS: &[&str] = &["Code", "Code - Insiders", "VSCodium", "Cursor"];

/// Discovery configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Maximum directory depth walked below each backup root
    pub max_depth: usize,
    /// Snapshot lines inspected for an embedded origin marker
    pub header_scan_lines: usize,
    /// File name of the metadata marker
    pub marker_file_name: String,
    /// Scan `<workspace>/.history` and `<workspace>/.vscode/history`
    pub include_workspace_roots: bool,
    /// Scan the editor's per-user history under the platform config dir
    pub include_user_roots: bool,
    /// Also scan workspace/global storage, logs and extension caches
    pub include_auxiliary_roots: bool,
    /// Editor product directory names, e.g. "Code"
    pub products: Vec<String>,
    /// Replaces the platform config dir (`dirs::config_dir()`) when set
    pub config_dir_override: Option<PathBuf>,
    /// Additional backup roots, scanned last
    pub extra_roots: Vec<PathBuf>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            header_scan_lines: DEFAULT_HEADER_SCAN_LINES,
            marker_file_name: DEFAULT_MARKER_FILE.to_string(),
            include_workspace_roots: true,
            include_user_roots: true,
            include_auxiliary_roots: true,
            products: DEFAULT_PRODUCTS.iter().map(|p| p.to_string()).collect(),
            config_dir_override: None,
            extra_roots: Vec::new(),
        }
    }
}

impl ScanConfig {
    /// Config that scans only the given roots, none of the built-in locations
    pub fn only_roots(roots: Vec<PathBuf>) -> Self {
        Self {
            include_workspace_roots: false,
            include_user_roots: false,
            include_auxiliary_roots: false,
            extra_roots: roots,
            ..Default::default()
        }
    }

    /// Load from a JSON file; missing fields keep their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config {}", path.display()))
    }
}

/// Restoration configuration
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RestoreOptions {
    /// Read each restored file back and compare its SHA-256 with the snapshot
    pub verify: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = ScanConfig::default();
        assert_eq!(config.max_depth, 15);
        assert_eq!(config.header_scan_lines, 10);
        assert_eq!(config.marker_file_name, "entries.json");
        assert_eq!(config.products[0], "Code");
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("retrace.json");
        std::fs::write(&path, r#"{"max_depth": 4, "extra_roots": ["/backups"]}"#).unwrap();

        let config = ScanConfig::from_json_file(&path).unwrap();
        assert_eq!(config.max_depth, 4);
        assert_eq!(config.extra_roots, vec![PathBuf::from("/backups")]);
        assert_eq!(config.header_scan_lines, DEFAULT_HEADER_SCAN_LINES);
        assert!(config.include_user_roots);
    }

    #[test]
    fn test_bad_json_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("retrace.json");
        std::fs::write(&path, "max_depth = 4").unwrap();

        assert!(ScanConfig::from_json_file(&path).is_err());
    }
}
