//! Log file discovery.
//!
//! Maps subsystem names, binary paths and search patterns to concrete log
//! files on disk. Privileged proxies can stand in for the filesystem
//! implementation through the `FileLocator` trait.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Locates log files for a subsystem name, a binary path, or a path pattern.
///
/// Implementations may return duplicates; callers deduplicate.
pub trait FileLocator: Send + Sync {
    /// Return all file paths belonging to `subsystem_or_path`, in discovery
    /// order. `recursive` extends the search into subdirectories.
    fn locate(&self, subsystem_or_path: &str, recursive: bool) -> Vec<PathBuf>;
}

/// Known subsystem log locations: (subsystem, directory, filename prefix).
const SUBSYSTEM_LOCATIONS: &[(&str, &str, &str)] = &[
    ("dpkg", "/var/log", "dpkg.log"),
    ("kern", "/var/log", "kern.log"),
    ("Xorg", "/var/log", "Xorg."),
    ("dnf", "/var/log", "dnf."),
    ("boot", "/var/log", "boot.log"),
    ("audit", "/var/log/audit", "audit.log"),
    ("coredump", "/var/lib/systemd/coredump", ""),
];

/// Directory searched for per-application log files.
const APP_LOG_ROOT: &str = "/var/log";

/// Filesystem-backed locator.
///
/// All absolute locations are resolved under `root`, which is `/` in
/// production and a scratch directory in tests.
pub struct FsFileLocator {
    root: PathBuf,
}

impl Default for FsFileLocator {
    fn default() -> Self {
        Self::new()
    }
}

impl FsFileLocator {
    /// Locator over the real filesystem root.
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: PathBuf::from("/"),
        }
    }

    /// Locator with all well-known locations re-rooted (for tests).
    #[must_use]
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, absolute: &str) -> PathBuf {
        self.root.join(absolute.trim_start_matches('/'))
    }

    /// Collect files under `dir` whose names start with `prefix`.
    fn scan(&self, dir: &Path, prefix: &str, recursive: bool) -> Vec<PathBuf> {
        if !dir.is_dir() {
            return Vec::new();
        }

        let depth = if recursive { usize::MAX } else { 1 };
        let mut found = Vec::new();

        for entry in WalkDir::new(dir)
            .max_depth(depth)
            .sort_by_file_name()
            .into_iter()
            .filter_map(std::result::Result::ok)
        {
            if !entry.file_type().is_file() {
                continue;
            }
            let matches = prefix.is_empty()
                || entry
                    .file_name()
                    .to_str()
                    .is_some_and(|name| name.starts_with(prefix));
            if matches {
                found.push(entry.into_path());
            }
        }

        if !found.is_empty() {
            tracing::debug!(
                dir = %dir.display(),
                prefix = prefix,
                count = found.len(),
                "Located log files"
            );
        }

        found
    }
}

impl FileLocator for FsFileLocator {
    fn locate(&self, subsystem_or_path: &str, recursive: bool) -> Vec<PathBuf> {
        // Fixed subsystem table takes precedence.
        if let Some((_, dir, prefix)) = SUBSYSTEM_LOCATIONS
            .iter()
            .find(|(name, _, _)| *name == subsystem_or_path)
        {
            return self.scan(&self.resolve(dir), prefix, recursive);
        }

        // Absolute path: the file itself, a directory's contents, or a
        // filename-prefix pattern inside the parent directory.
        if subsystem_or_path.starts_with('/') {
            let target = self.resolve(subsystem_or_path);
            if target.is_file() {
                return vec![target];
            }
            if target.is_dir() {
                return self.scan(&target, "", true);
            }

            let stem = Path::new(subsystem_or_path)
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default();
            if stem.is_empty() {
                return Vec::new();
            }

            // Binary path or pattern: logs named after the stem, plus a
            // dedicated per-application directory when one exists.
            let log_root = self.resolve(APP_LOG_ROOT);
            let mut found = self.scan(&log_root, stem, false);
            found.extend(self.scan(&log_root.join(stem), "", recursive));
            if let Some(parent) = target.parent() {
                if parent != log_root {
                    found.extend(self.scan(parent, stem, false));
                }
            }
            return found;
        }

        tracing::debug!(query = subsystem_or_path, "Unknown locator query");
        Vec::new()
    }
}
