//! Acquisition item transfer.
//!
//! Moves one item into a staging directory: copies a file or directory tree,
//! or runs a recognized log-dump command and captures its output. This is the
//! seam the original privileged proxy sits behind.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use walkdir::WalkDir;

use crate::domain::{
    AppError, Result, CMD_DMESG, CMD_JOURNAL_BOOT, CMD_JOURNAL_SYSTEM, CMD_LAST,
    JOURNAL_APP_MARKER,
};

/// Transfers one acquisition item into a destination directory.
pub trait LogTransfer: Send + Sync {
    /// Copy `source` (a file path, a directory path, or a recognized command
    /// identifier) into `dest_dir`. `preserve_permissions` keeps the source
    /// mode bits on copied files; command output is always written fresh.
    ///
    /// # Errors
    /// Returns error when the copy or command fails; callers treat item
    /// failures as non-fatal.
    fn export_item(&self, dest_dir: &Path, source: &str, preserve_permissions: bool) -> Result<()>;
}

/// Whether the runtime can read journal slices at all.
#[must_use]
pub fn journal_supported() -> bool {
    std::env::var_os("PATH")
        .map(|paths| {
            std::env::split_paths(&paths).any(|dir| dir.join("journalctl").is_file())
        })
        .unwrap_or(false)
}

/// Filesystem/process-backed transfer.
#[derive(Debug, Clone, Default)]
pub struct FsTransfer;

impl FsTransfer {
    /// Create a new transfer backend.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Argument vector for a recognized command identifier, if any.
    ///
    /// The application journal marker carries no identifier of its own; the
    /// destination group directory name is the application's display name.
    fn command_args(command: &str, dest_dir: &Path) -> Option<Vec<String>> {
        let argv: Vec<String> = match command {
            CMD_JOURNAL_SYSTEM => vec!["journalctl".into(), "--no-pager".into()],
            CMD_JOURNAL_BOOT => vec!["journalctl".into(), "-b".into(), "--no-pager".into()],
            CMD_DMESG => vec!["dmesg".into()],
            CMD_LAST => vec!["last".into(), "-x".into()],
            JOURNAL_APP_MARKER => {
                let identifier = dest_dir
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or_default()
                    .to_string();
                vec![
                    "journalctl".into(),
                    "--no-pager".into(),
                    "-t".into(),
                    identifier,
                ]
            }
            _ => return None,
        };
        Some(argv)
    }

    fn run_command(command: &str, argv: &[String], dest_dir: &Path) -> Result<()> {
        let output = Command::new(&argv[0])
            .args(&argv[1..])
            .output()
            .map_err(|e| AppError::io(format!("Failed to spawn '{}'", argv[0]), e))?;

        if !output.status.success() {
            return Err(AppError::Command {
                command: command.to_string(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let dest = dest_dir.join(format!("{command}.log"));
        fs::write(&dest, &output.stdout)
            .map_err(|e| AppError::io(format!("Failed to write {}", dest.display()), e))?;

        tracing::debug!(
            command = command,
            bytes = output.stdout.len(),
            "Captured command output"
        );
        Ok(())
    }

    fn copy_file(source: &Path, dest: &Path, preserve_permissions: bool) -> Result<()> {
        if preserve_permissions {
            fs::copy(source, dest).map_err(|e| {
                AppError::io(format!("Failed to copy {}", source.display()), e)
            })?;
        } else {
            let content = fs::read(source)
                .map_err(|e| AppError::io(format!("Failed to read {}", source.display()), e))?;
            fs::write(dest, content)
                .map_err(|e| AppError::io(format!("Failed to write {}", dest.display()), e))?;
        }
        Ok(())
    }

    fn copy_tree(source: &Path, dest_dir: &Path, preserve_permissions: bool) -> Result<()> {
        for entry in WalkDir::new(source)
            .into_iter()
            .filter_map(std::result::Result::ok)
        {
            let relative = entry
                .path()
                .strip_prefix(source)
                .unwrap_or_else(|_| entry.path());
            let target = dest_dir.join(relative);

            if entry.file_type().is_dir() {
                fs::create_dir_all(&target)
                    .map_err(|e| AppError::io("Failed to create directory", e))?;
            } else if entry.file_type().is_file() {
                Self::copy_file(entry.path(), &target, preserve_permissions)?;
            }
        }
        Ok(())
    }
}

impl LogTransfer for FsTransfer {
    fn export_item(&self, dest_dir: &Path, source: &str, preserve_permissions: bool) -> Result<()> {
        if let Some(argv) = Self::command_args(source, dest_dir) {
            return Self::run_command(source, &argv, dest_dir);
        }

        let path = PathBuf::from(source);
        if path.is_dir() {
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("dir");
            return Self::copy_tree(&path, &dest_dir.join(name), preserve_permissions);
        }
        if path.is_file() {
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("file");
            return Self::copy_file(&path, &dest_dir.join(name), preserve_permissions);
        }

        Err(AppError::Config {
            message: format!("Source does not exist: {source}"),
        })
    }
}
