//! Core acquisition-plan models.
//!
//! A plan is an ordered list of buckets, one per requested category token.
//! Each bucket carries the commands to run, the flat files to copy, and the
//! named groups of files that land in their own subdirectory.

use std::collections::BTreeMap;
use std::hash::Hash;
use std::path::PathBuf;

use serde::Serialize;

/// Dumps the system journal.
pub const CMD_JOURNAL_SYSTEM: &str = "journalctl_system";
/// Dumps the journal of the current boot.
pub const CMD_JOURNAL_BOOT: &str = "journalctl_boot";
/// Dumps the kernel ring buffer.
pub const CMD_DMESG: &str = "dmesg";
/// Dumps login/reboot/shutdown records.
pub const CMD_LAST: &str = "last";

/// Synthetic marker standing in for "read this application's journal slice".
///
/// It travels through a bucket group like a file path; the transfer layer
/// recognizes it and runs a journal dump instead of a copy.
pub const JOURNAL_APP_MARKER: &str = "journalctl_app";

/// Resolved acquisition instructions for one category token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AcquisitionBucket {
    /// Display name, doubles as the output folder under the staging tree.
    pub category: String,

    /// Log-dump command identifiers, in resolution order.
    pub commands: Vec<String>,

    /// Absolute file paths copied directly into the category folder.
    pub files: Vec<PathBuf>,

    /// Named sub-folders, each with its own file list.
    pub groups: BTreeMap<String, Vec<PathBuf>>,
}

impl AcquisitionBucket {
    /// Create an empty bucket for the given category.
    #[must_use]
    pub fn new(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            ..Self::default()
        }
    }

    /// Number of discrete acquisition items in this bucket.
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.commands.len()
            + self.files.len()
            + self.groups.values().map(Vec::len).sum::<usize>()
    }

    /// Whether the bucket resolved to nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.item_count() == 0
    }

    /// Drop duplicate entries from every collection, keeping first occurrence.
    pub fn dedup(&mut self) {
        dedup_preserving_order(&mut self.commands);
        dedup_preserving_order(&mut self.files);
        for paths in self.groups.values_mut() {
            dedup_preserving_order(paths);
        }
    }
}

/// Ordered sequence of buckets, one per requested token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AcquisitionPlan {
    /// Buckets in the caller's request order.
    pub buckets: Vec<AcquisitionBucket>,
}

impl AcquisitionPlan {
    /// Total item count across all buckets; drives the progress total.
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.buckets.iter().map(AcquisitionBucket::item_count).sum()
    }

    /// Whether no token was requested at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

/// Remove duplicates from a vector while preserving first-occurrence order.
pub fn dedup_preserving_order<T: Eq + Hash + Clone>(items: &mut Vec<T>) {
    let mut seen = std::collections::HashSet::with_capacity(items.len());
    items.retain(|item| seen.insert(item.clone()));
}
