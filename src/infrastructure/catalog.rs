//! Configuration file management and the TOML-backed log catalog.
//!
//! Handles loading and saving the TOML configuration and serves the
//! application/other/custom log listings consumed during plan building.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::{AppError, AppLogConfig, BundleConfig, Result};

/// Default configuration file content.
const DEFAULT_CONFIG: &str = r#"# logbundle configuration
# Auto-generated - edit as needed

# Applications whose logs are collected by the "app" category.
# [[application]]
# exec = "/usr/bin/deepin-editor"
# log_type = "journal"   # "file" (default) or "journal"

# Extra entries for the "other" category, merged with the built-in table.
# [[other]]
# name = "nginx"
# pattern = "/var/log/nginx"

# User-defined files for the "custom" category.
# [[custom]]
# name = "myapp"
# path = "/var/log/myapp.log"

[paths]
# Custom data directory (optional, defaults to ~/.logbundle)
# data_dir = "/custom/path"
"#;

/// Built-in "other logs" table: (display name, locator pattern).
const DEFAULT_OTHER_LOGS: &[(&str, &str)] = &[
    ("installer", "/var/log/installer"),
    ("cups", "/var/log/cups"),
    ("alternatives", "/var/log/alternatives.log"),
];

/// Load configuration from the default location or fall back to defaults.
///
/// # Errors
/// Returns error if the file exists but cannot be read or parsed.
pub fn load_config() -> Result<BundleConfig> {
    let config_path = BundleConfig::default_data_dir().join("config.toml");

    if config_path.exists() {
        load_config_from_file(&config_path)
    } else {
        Ok(BundleConfig::default())
    }
}

/// Load configuration from a specific file.
///
/// # Errors
/// Returns error if file cannot be read or parsed.
pub fn load_config_from_file(path: &Path) -> Result<BundleConfig> {
    let content = fs::read_to_string(path)
        .map_err(|e| AppError::io(format!("Failed to read config file: {}", path.display()), e))?;

    toml::from_str(&content).map_err(|e| AppError::Config {
        message: format!("Failed to parse config file: {e}"),
    })
}

/// Create the default configuration file if it doesn't exist.
///
/// # Errors
/// Returns error if the file cannot be created.
pub fn ensure_config_exists() -> Result<()> {
    let config_path = BundleConfig::default_data_dir().join("config.toml");

    if !config_path.exists() {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| AppError::io("Failed to create config directory", e))?;
        }

        fs::write(&config_path, DEFAULT_CONFIG)
            .map_err(|e| AppError::io("Failed to create default config", e))?;

        tracing::info!(path = %config_path.display(), "Created default configuration");
    }

    Ok(())
}

/// Catalog of configured log sources consumed during plan building.
pub trait LogCatalog: Send + Sync {
    /// Registered applications as (display key, binary path), ordered by key.
    fn applications(&self) -> Vec<(String, PathBuf)>;

    /// Log configuration for an application name, if one is declared.
    fn app_config(&self, app_name: &str) -> Option<AppLogConfig>;

    /// The "other logs" table as (display name, locator pattern).
    fn other_logs(&self) -> Vec<(String, String)>;

    /// User-defined custom logs as (display name, file path).
    fn custom_logs(&self) -> Vec<(String, PathBuf)>;
}

/// Catalog backed by the TOML configuration plus the built-in tables.
pub struct TomlCatalog {
    config: BundleConfig,
}

impl TomlCatalog {
    /// Wrap a loaded configuration.
    #[must_use]
    pub const fn new(config: BundleConfig) -> Self {
        Self { config }
    }

    /// Display key for an application entry: explicit name or binary stem.
    fn display_key(entry: &crate::domain::ApplicationEntry) -> String {
        entry.name.clone().unwrap_or_else(|| {
            entry
                .exec
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default()
                .to_string()
        })
    }
}

impl LogCatalog for TomlCatalog {
    fn applications(&self) -> Vec<(String, PathBuf)> {
        let ordered: BTreeMap<String, PathBuf> = self
            .config
            .applications
            .iter()
            .map(|entry| (Self::display_key(entry), entry.exec.clone()))
            .collect();
        ordered.into_iter().collect()
    }

    fn app_config(&self, app_name: &str) -> Option<AppLogConfig> {
        self.config
            .applications
            .iter()
            .find(|entry| {
                entry
                    .exec
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .is_some_and(|stem| stem == app_name)
            })
            .and_then(|entry| entry.log_type.as_ref())
            .map(|log_type| AppLogConfig {
                log_type: log_type.clone(),
            })
    }

    fn other_logs(&self) -> Vec<(String, String)> {
        let mut entries: Vec<(String, String)> = DEFAULT_OTHER_LOGS
            .iter()
            .map(|(name, pattern)| ((*name).to_string(), (*pattern).to_string()))
            .collect();
        entries.extend(
            self.config
                .other_logs
                .iter()
                .map(|entry| (entry.name.clone(), entry.pattern.clone())),
        );
        entries
    }

    fn custom_logs(&self) -> Vec<(String, PathBuf)> {
        self.config
            .custom_logs
            .iter()
            .map(|entry| (entry.name.clone(), entry.path.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ApplicationEntry;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_parses() {
        let config: BundleConfig = toml::from_str(DEFAULT_CONFIG).unwrap();
        assert!(config.applications.is_empty());
        assert!(config.custom_logs.is_empty());
    }

    #[test]
    fn test_load_config_roundtrip() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        fs::write(
            &config_path,
            r#"
            [[custom]]
            name = "myapp"
            path = "/var/log/myapp.log"
            "#,
        )
        .unwrap();

        let loaded = load_config_from_file(&config_path).unwrap();
        assert_eq!(loaded.custom_logs.len(), 1);
    }

    #[test]
    fn test_applications_ordered_by_display_key() {
        let config = BundleConfig {
            applications: vec![
                ApplicationEntry {
                    name: None,
                    exec: PathBuf::from("/usr/bin/zsh-helper"),
                    log_type: None,
                },
                ApplicationEntry {
                    name: None,
                    exec: PathBuf::from("/usr/bin/editor"),
                    log_type: Some("journal".into()),
                },
            ],
            ..BundleConfig::default()
        };
        let catalog = TomlCatalog::new(config);

        let apps = catalog.applications();
        assert_eq!(apps[0].0, "editor");
        assert_eq!(apps[1].0, "zsh-helper");
    }

    #[test]
    fn test_app_config_lookup_by_binary_stem() {
        let config = BundleConfig {
            applications: vec![ApplicationEntry {
                name: Some("Editor".into()),
                exec: PathBuf::from("/usr/bin/editor"),
                log_type: Some("journal".into()),
            }],
            ..BundleConfig::default()
        };
        let catalog = TomlCatalog::new(config);

        let found = catalog.app_config("editor").unwrap();
        assert_eq!(found.log_type, "journal");
        assert!(catalog.app_config("missing").is_none());
    }

    #[test]
    fn test_other_logs_merge_builtin_and_configured() {
        let config: BundleConfig = toml::from_str(
            r#"
            [[other]]
            name = "nginx"
            pattern = "/var/log/nginx"
            "#,
        )
        .unwrap();
        let catalog = TomlCatalog::new(config);

        let others = catalog.other_logs();
        assert_eq!(others.len(), DEFAULT_OTHER_LOGS.len() + 1);
        assert_eq!(others.last().unwrap().0, "nginx");
    }
}
