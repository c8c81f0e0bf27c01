use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use retrace_core::{
	discovery::{candidate_roots, locate_backup_roots, user_config_dir},
	find_node, scan_workspace, DeletedRecord, DiscoverySession, LocalFs, RestoreOptions, Restorer,
	ScanConfig,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "retrace", version, about = "Retrace - restore deleted workspace files from editor local history")]
struct Cli {
	/// JSON scan configuration file
	#[arg(long, global = true)]
	config: Option<PathBuf>,
	/// Additional backup root to scan (repeatable)
	#[arg(long = "extra-root", global = true)]
	extra_roots: Vec<PathBuf>,
	/// Maximum directory depth below each backup root
	#[arg(long, global = true)]
	max_depth: Option<usize>,
	/// More log output (-v info, -vv debug)
	#[arg(short, long, action = clap::ArgAction::Count, global = true)]
	verbose: u8,
	#[command(subcommand)]
	command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
	/// List candidate backup roots and whether they exist
	Roots {
		/// Workspace root (defaults to the current directory)
		#[arg(long)]
		workspace: Option<PathBuf>,
	},
	/// Find files deleted from the workspace that still have a backup
	Scan {
		/// Workspace root (defaults to the current directory)
		#[arg(long)]
		workspace: Option<PathBuf>,
		/// Print the session as JSON
		#[arg(long)]
		json: bool,
		/// Print one relative path per line instead of a tree
		#[arg(long)]
		flat: bool,
	},
	/// Restore deleted files or folders from their newest backup
	Restore {
		/// Workspace root (defaults to the current directory)
		#[arg(long)]
		workspace: Option<PathBuf>,
		/// Read restored files back and compare SHA-256 with the snapshot
		#[arg(long)]
		verify: bool,
		/// Restore everything that was found
		#[arg(long, conflicts_with = "paths")]
		all: bool,
		/// Workspace-relative paths of files or folders to restore
		paths: Vec<PathBuf>,
	},
}

fn main() -> Result<()> {
	let cli = Cli::parse();
	init_tracing(cli.verbose);

	let config = load_config(&cli)?;
	match cli.command {
		Commands::Roots { workspace } => {
			let workspace = resolve_workspace(workspace)?;
			let config_dir = user_config_dir(&config);
			let present = locate_backup_roots(&LocalFs, &workspace, &config);

			println!("📂 Backup roots for {}", workspace.display());
			for root in candidate_roots(&workspace, &config, config_dir.as_deref()) {
				let marker = if present.contains(&root) { "✅" } else { "  " };
				println!("{} {:<18} {}", marker, root.kind.to_string(), root.path.display());
			}
		}
		Commands::Scan { workspace, json, flat } => {
			let workspace = resolve_workspace(workspace)?;
			let session = run_scan(&workspace, &config)?;

			if json {
				println!("{}", serde_json::to_string_pretty(&session)?);
				return Ok(());
			}

			if session.forest.is_empty() {
				println!("✅ No deleted files with backups under {}", workspace.display());
			} else if flat {
				for node in &session.forest {
					for file in node.files() {
						println!("{}", file.relative_path.display());
					}
				}
			} else {
				println!("🗑️  Deleted files under {}:", workspace.display());
				for node in &session.forest {
					print_node(node, 1);
				}
			}

			println!();
			println!("📊 Session ID: {}", session.id);
			println!("📈 Files Found: {}", session.metadata.files_found);
			println!("📁 Roots Scanned: {}", session.metadata.roots_scanned);
			print_scan_errors(&session);
		}
		Commands::Restore { workspace, verify, all, paths } => {
			let workspace = resolve_workspace(workspace)?;
			let session = run_scan(&workspace, &config)?;
			print_scan_errors(&session);

			let selected: Vec<DeletedRecord> = if all {
				session.forest.clone()
			} else {
				if paths.is_empty() {
					anyhow::bail!("Nothing to restore: pass workspace-relative paths or --all");
				}
				let mut selected = Vec::new();
				for path in &paths {
					let relative = path.strip_prefix(&workspace).unwrap_or(path);
					match find_node(&session.forest, relative) {
						Some(node) => selected.push(node.clone()),
						None => anyhow::bail!("No deleted file or folder at {}", relative.display()),
					}
				}
				selected
			};

			let bar = ProgressBar::new(selected.len() as u64);
			bar.set_style(
				ProgressStyle::with_template("{bar:30} {pos}/{len} {msg}")
					.unwrap_or_else(|_| ProgressStyle::default_bar()),
			);
			let report = {
				let bar = bar.clone();
				let mut restorer = Restorer::new(&LocalFs, RestoreOptions { verify });
				restorer.set_progress_callback(move |progress| {
					bar.set_position(progress.completed as u64);
					bar.set_message(progress.current.display().to_string());
				});
				restorer.restore_batch(&selected)
			};
			bar.finish_and_clear();

			println!("✅ Restored {}/{} items", report.restored, report.total);
			if !report.is_success() {
				for failure in &report.failures {
					eprintln!("❌ {}: {}", failure.path.display(), failure.reason);
				}
				anyhow::bail!(
					"{} of {} items restored, {} entries failed",
					report.restored,
					report.total,
					report.failures.len()
				);
			}
		}
	}
	Ok(())
}

fn init_tracing(verbose: u8) {
	let default_level = match verbose {
		0 => "warn",
		1 => "info",
		_ => "debug",
	};
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.init();
}

/// Config file first, then flags on top
fn load_config(cli: &Cli) -> Result<ScanConfig> {
	let mut config = match &cli.config {
		Some(path) => ScanConfig::from_json_file(path)?,
		None => ScanConfig::default(),
	};
	config.extra_roots.extend(cli.extra_roots.iter().cloned());
	if let Some(depth) = cli.max_depth {
		config.max_depth = depth;
	}
	tracing::debug!("Scan config: {:?}", config);
	Ok(config)
}

fn resolve_workspace(workspace: Option<PathBuf>) -> Result<PathBuf> {
	let cwd = std::env::current_dir().context("Failed to read current directory")?;
	Ok(match workspace {
		Some(path) if path.is_absolute() => path,
		Some(path) => cwd.join(path),
		None => cwd,
	})
}

fn run_scan(workspace: &Path, config: &ScanConfig) -> Result<DiscoverySession> {
	let spinner = ProgressBar::new_spinner();
	spinner.set_message(format!("Scanning backups for {}", workspace.display()));
	spinner.enable_steady_tick(Duration::from_millis(100));
	let session = scan_workspace(workspace, config);
	spinner.finish_and_clear();
	session
}

fn print_node(node: &DeletedRecord, depth: usize) {
	let indent = "  ".repeat(depth);
	let when = node.deletion_time().format("%Y-%m-%d %H:%M:%S");
	match node {
		DeletedRecord::Folder(folder) => {
			println!("{}📁 {}/  ({} files, latest {})", indent, node.name(), node.file_count(), when);
			for child in &folder.children {
				print_node(child, depth + 1);
			}
		}
		DeletedRecord::File(_) => {
			println!("{}📄 {}  ({})", indent, node.name(), when);
		}
	}
}

fn print_scan_errors(session: &DiscoverySession) {
	if session.is_complete() {
		return;
	}
	eprintln!("⚠️  {} backup locations could not be scanned:", session.errors.len());
	for error in &session.errors {
		eprintln!("   {}", error);
	}
}
