//! Per-application, "other" and custom log expansion.
//!
//! The application category cannot be resolved by a static rule: each
//! registered application declares (or omits) how its logs are parsed, and
//! journal-backed applications degrade to file discovery when the runtime
//! has no journal support.

use std::path::{Path, PathBuf};

use crate::domain::{AcquisitionBucket, AppLogConfig, JOURNAL_APP_MARKER, LOG_TYPE_JOURNAL};
use crate::infrastructure::{FileLocator, LogCatalog};

/// How an application's logs are acquired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStrategy {
    /// Discover and copy log files belonging to the binary.
    File,
    /// Read the application's journal slice.
    Journal,
}

/// Display name for an application binary: the path stem.
#[must_use]
pub fn app_name(binary: &Path) -> String {
    binary
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string()
}

/// Expands application/other/custom tokens into bucket entries.
pub struct AppLogEnumerator<'a> {
    catalog: &'a dyn LogCatalog,
    locator: &'a dyn FileLocator,
    journal_supported: bool,
}

impl<'a> AppLogEnumerator<'a> {
    /// Build an enumerator over the injected collaborators.
    #[must_use]
    pub const fn new(
        catalog: &'a dyn LogCatalog,
        locator: &'a dyn FileLocator,
        journal_supported: bool,
    ) -> Self {
        Self {
            catalog,
            locator,
            journal_supported,
        }
    }

    /// Parse strategy for an application: journal only when a valid config
    /// explicitly says so and the runtime can read journals at all.
    #[must_use]
    pub fn parse_strategy(&self, config: Option<&AppLogConfig>) -> ParseStrategy {
        let declared_journal = config
            .is_some_and(|c| c.is_valid() && c.log_type == LOG_TYPE_JOURNAL);

        if declared_journal && self.journal_supported {
            ParseStrategy::Journal
        } else {
            ParseStrategy::File
        }
    }

    /// Expand the application category into per-application groups.
    pub fn expand_applications(&self, bucket: &mut AcquisitionBucket) {
        for (_display_key, binary) in self.catalog.applications() {
            let name = app_name(&binary);
            if name.is_empty() {
                continue;
            }

            let config = self.catalog.app_config(&name);
            match self.parse_strategy(config.as_ref()) {
                ParseStrategy::File => {
                    let mut paths = self
                        .locator
                        .locate(&binary.to_string_lossy(), true);
                    crate::domain::dedup_preserving_order(&mut paths);
                    if !paths.is_empty() {
                        bucket.groups.insert(name, paths);
                    }
                }
                ParseStrategy::Journal => {
                    bucket
                        .groups
                        .insert(name, vec![PathBuf::from(JOURNAL_APP_MARKER)]);
                }
            }
        }
    }

    /// Expand the "other logs" table: multi-file results become groups,
    /// single files stay flat.
    pub fn expand_other_logs(&self, bucket: &mut AcquisitionBucket) {
        for (name, pattern) in self.catalog.other_logs() {
            let mut paths = self.locator.locate(&pattern, false);
            crate::domain::dedup_preserving_order(&mut paths);

            if paths.len() > 1 {
                bucket.groups.insert(name, paths);
            } else if paths.len() == 1 {
                bucket.files.extend(paths);
            }
        }
    }

    /// Flatten custom logs into the bucket's file list; names are ignored.
    pub fn expand_custom_logs(&self, bucket: &mut AcquisitionBucket) {
        for (_name, path) in self.catalog.custom_logs() {
            bucket.files.push(path);
        }
    }
}
