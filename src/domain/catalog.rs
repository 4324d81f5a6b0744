//! Catalog and configuration domain models.
//!
//! Types describing where logs come from: user-configured custom sources,
//! the "other logs" table, and per-application log configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Log types an application config may declare.
pub const LOG_TYPE_FILE: &str = "file";
/// Journal-backed application logs.
pub const LOG_TYPE_JOURNAL: &str = "journal";

/// Per-application log configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppLogConfig {
    /// Declared parse strategy, `"file"` or `"journal"`.
    pub log_type: String,
}

impl AppLogConfig {
    /// A config is valid only when it names a known log type.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.log_type == LOG_TYPE_FILE || self.log_type == LOG_TYPE_JOURNAL
    }
}

/// A registered application whose logs can be collected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationEntry {
    /// Display name; derived from `exec` when omitted.
    #[serde(default)]
    pub name: Option<String>,

    /// Representative binary path used for file discovery.
    pub exec: PathBuf,

    /// Optional declared log type (`"file"` or `"journal"`).
    #[serde(default)]
    pub log_type: Option<String>,
}

/// An entry of the "other logs" table: a named search pattern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtherLogEntry {
    /// Display name, doubles as the group folder when several files match.
    pub name: String,

    /// Path or name pattern handed to the file locator.
    pub pattern: String,
}

/// A user-defined custom log source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomLogEntry {
    /// Display name (informational only; custom files stay flat).
    pub name: String,

    /// Absolute path of the log file.
    pub path: PathBuf,
}

/// Path configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Base data directory.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BundleConfig {
    /// Path configuration.
    #[serde(default)]
    pub paths: PathsConfig,

    /// Registered applications.
    #[serde(default, rename = "application")]
    pub applications: Vec<ApplicationEntry>,

    /// Additional "other logs" entries merged with the built-in table.
    #[serde(default, rename = "other")]
    pub other_logs: Vec<OtherLogEntry>,

    /// User-defined custom log files.
    #[serde(default, rename = "custom")]
    pub custom_logs: Vec<CustomLogEntry>,
}

impl BundleConfig {
    /// Get the data directory, using default if not configured.
    #[must_use]
    pub fn data_dir(&self) -> PathBuf {
        self.paths
            .data_dir
            .clone()
            .unwrap_or_else(Self::default_data_dir)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".logbundle")
    }

    /// Scratch directory used to stage files before archiving.
    #[must_use]
    pub fn staging_dir(&self) -> PathBuf {
        self.data_dir().join("staging")
    }

    /// Get the config file path.
    #[must_use]
    pub fn config_file_path(&self) -> PathBuf {
        self.data_dir().join("config.toml")
    }
}
