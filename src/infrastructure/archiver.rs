//! Archive packaging backend.
//!
//! Compresses a staged directory tree into a single container file. The
//! container format is an implementation detail behind `ArchiveBackend`;
//! the default backend produces a zip with unix modes preserved.

use std::fs;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::domain::{AppError, Result};

/// Packages a directory tree into a single restorable file.
pub trait ArchiveBackend: Send + Sync {
    /// Compress everything under `source_dir` into `output`.
    ///
    /// # Errors
    /// Returns error if the container cannot be produced.
    fn archive(&self, source_dir: &Path, output: &Path) -> Result<()>;
}

/// Zip-based archive backend.
#[derive(Debug, Clone, Default)]
pub struct ZipArchiver;

impl ZipArchiver {
    /// Create a new zip archiver.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl ArchiveBackend for ZipArchiver {
    fn archive(&self, source_dir: &Path, output: &Path) -> Result<()> {
        let file = fs::File::create(output)
            .map_err(|e| AppError::io(format!("Failed to create {}", output.display()), e))?;
        let mut writer = ZipWriter::new(file);

        for entry in WalkDir::new(source_dir)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(std::result::Result::ok)
        {
            let relative = entry
                .path()
                .strip_prefix(source_dir)
                .unwrap_or_else(|_| entry.path())
                .to_string_lossy()
                .into_owned();

            let mode = entry
                .metadata()
                .map(|m| m.permissions().mode() & 0o777)
                .unwrap_or(0o644);
            let options = SimpleFileOptions::default()
                .compression_method(CompressionMethod::Deflated)
                .unix_permissions(mode);

            if entry.file_type().is_dir() {
                writer
                    .add_directory(&relative, options)
                    .map_err(AppError::archive)?;
            } else if entry.file_type().is_file() {
                writer
                    .start_file(&relative, options)
                    .map_err(AppError::archive)?;
                let mut source = fs::File::open(entry.path()).map_err(|e| {
                    AppError::io(format!("Failed to open {}", entry.path().display()), e)
                })?;
                io::copy(&mut source, &mut writer)
                    .map_err(|e| AppError::io("Failed to write archive entry", e))?;
            }
        }

        writer.finish().map_err(AppError::archive)?;

        tracing::info!(
            source = %source_dir.display(),
            output = %output.display(),
            "Archive written"
        );
        Ok(())
    }
}
