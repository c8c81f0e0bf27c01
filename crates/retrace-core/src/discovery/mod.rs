//! Backup discovery: where history lives and what it says was deleted
pub mod engine;
pub mod locator;
pub mod marker;

pub use engine::{DiscoveryEngine, DiscoveryReport};
pub use locator::{candidate_roots, locate_backup_roots, user_config_dir, BackupRoot, RootKind};
pub use marker::{HistoryEntry, HistoryMarker};
