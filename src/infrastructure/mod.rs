//! Infrastructure layer - external adapters (filesystem, processes, archive).
//!
//! This layer handles all I/O operations and external dependencies.

pub mod archiver;
pub mod catalog;
pub mod locator;
pub mod transfer;

pub use archiver::{ArchiveBackend, ZipArchiver};
pub use catalog::{ensure_config_exists, load_config, load_config_from_file, LogCatalog, TomlCatalog};
pub use locator::{FileLocator, FsFileLocator};
pub use transfer::{journal_supported, FsTransfer, LogTransfer};
