//! Candidate backup roots for the current platform
//!
//! Pure configuration: which directories may hold history snapshots, in the
//! fixed order discovery walks them.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::ScanConfig;
use crate::fs::{probe, HostFs};

/// Where a backup root comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RootKind {
    /// History kept inside the workspace itself
    WorkspaceHistory,
    /// The editor's per-user local history
    UserHistory,
    /// Per-workspace extension storage
    WorkspaceStorage,
    /// Global extension storage
    GlobalStorage,
    /// Editor session logs
    Logs,
    /// Cached extension packages
    ExtensionCache,
    /// Supplied through configuration
    Custom,
}

impl std::fmt::Display for RootKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RootKind::WorkspaceHistory => write!(f, "workspace history"),
            RootKind::UserHistory => write!(f, "user history"),
            RootKind::WorkspaceStorage => write!(f, "workspace storage"),
            RootKind::GlobalStorage => write!(f, "global storage"),
            RootKind::Logs => write!(f, "logs"),
            RootKind::ExtensionCache => write!(f, "extension cache"),
            RootKind::Custom => write!(f, "custom"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupRoot {
    pub kind: RootKind,
    pub path: PathBuf,
}

impl BackupRoot {
    fn new(kind: RootKind, path: PathBuf) -> Self {
        Self { kind, path }
    }
}

/// Every root that could exist, whether or not it does
pub fn candidate_roots(
    workspace: &Path,
    config: &ScanConfig,
    user_config_dir: Option<&Path>,
) -> Vec<BackupRoot> {
    let mut roots = Vec::new();

    if config.include_workspace_roots {
        roots.push(BackupRoot::new(
            RootKind::WorkspaceHistory,
            workspace.join(".history"),
        ));
        roots.push(BackupRoot::new(
            RootKind::WorkspaceHistory,
            workspace.join(".vscode").join("history"),
        ));
    }

    if let Some(base) = user_config_dir {
        for product in &config.products {
            let product_dir = base.join(product);
            let user_dir = product_dir.join("User");

            if config.include_user_roots {
                roots.push(BackupRoot::new(RootKind::UserHistory, user_dir.join("History")));
            }

            if config.include_auxiliary_roots {
                roots.push(BackupRoot::new(
                    RootKind::WorkspaceStorage,
                    user_dir.join("workspaceStorage"),
                ));
                roots.push(BackupRoot::new(
                    RootKind::GlobalStorage,
                    user_dir.join("globalStorage"),
                ));
                roots.push(BackupRoot::new(RootKind::Logs, product_dir.join("logs")));
                roots.push(BackupRoot::new(
                    RootKind::ExtensionCache,
                    product_dir.join("CachedExtensionVSIXs"),
                ));
            }
        }
    }

    for extra in &config.extra_roots {
        roots.push(BackupRoot::new(RootKind::Custom, extra.clone()));
    }

    roots
}

/// Per-user config directory the editor products live under
pub fn user_config_dir(config: &ScanConfig) -> Option<PathBuf> {
    config.config_dir_override.clone().or_else(dirs::config_dir)
}

/// Candidate roots that currently exist as directories
pub fn locate_backup_roots(fs: &impl HostFs, workspace: &Path, config: &ScanConfig) -> Vec<BackupRoot> {
    let user_config_dir = user_config_dir(config);

    let roots: Vec<BackupRoot> = candidate_roots(workspace, config, user_config_dir.as_deref())
        .into_iter()
        .filter(|root| {
            let present = probe::is_dir(fs, &root.path);
            if !present {
                tracing::debug!("Skipping missing {} root {}", root.kind, root.path.display());
            }
            present
        })
        .collect();

    tracing::info!("📂 Located {} backup roots", roots.len());
    roots
}
