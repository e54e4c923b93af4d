//! Startup configuration read from `~/.library-catalog/config.toml`.
//!
//! Every key is optional. A missing file means defaults; a malformed file
//! stops startup so a typo in the delete policy never goes unnoticed.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use directories::BaseDirs;
use serde::Deserialize;

use crate::catalog::DeletePolicy;

/// Folder name used beneath the user's home directory for application files.
const DATA_DIR_NAME: &str = ".library-catalog";
const CONFIG_FILE_NAME: &str = "config.toml";
const LOG_FILE_NAME: &str = "catalog.log";
/// Points at an alternative config file when set.
pub const CONFIG_PATH_ENV: &str = "LIBRARY_CATALOG_CONFIG";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CatalogConfig {
    pub log: LogConfig,
    pub loans: LoanConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    /// `tracing` filter directive such as `info` or `library_catalog=debug`.
    pub level: String,
    /// Log destination. Defaults to `catalog.log` in the data directory.
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoanConfig {
    /// What deleting a book or person with an active loan does.
    pub on_delete: DeletePolicy,
}

impl CatalogConfig {
    /// Load from `$LIBRARY_CATALOG_CONFIG` or the default location.
    pub fn load() -> Result<Self> {
        let path = match std::env::var_os(CONFIG_PATH_ENV) {
            Some(path) => PathBuf::from(path),
            None => data_dir()?.join(CONFIG_FILE_NAME),
        };
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn parse(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Where the log subscriber should write.
    pub fn log_file(&self) -> Result<PathBuf> {
        match &self.log.file {
            Some(path) => Ok(path.clone()),
            None => Ok(data_dir()?.join(LOG_FILE_NAME)),
        }
    }
}

/// Resolve the application directory inside the user's home.
pub fn data_dir() -> Result<PathBuf> {
    let base_dirs = BaseDirs::new().ok_or_else(|| anyhow!("could not locate home directory"))?;
    Ok(base_dirs.home_dir().join(DATA_DIR_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = CatalogConfig::parse("").unwrap();
        assert_eq!(config.log.level, "info");
        assert!(config.log.file.is_none());
        assert_eq!(config.loans.on_delete, DeletePolicy::Block);
    }

    #[test]
    fn parses_every_key() {
        let config = CatalogConfig::parse(
            r#"
            [log]
            level = "library_catalog=debug"
            file = "/tmp/catalog.log"

            [loans]
            on_delete = "close-loans"
            "#,
        )
        .unwrap();
        assert_eq!(config.log.level, "library_catalog=debug");
        assert_eq!(config.log.file, Some(PathBuf::from("/tmp/catalog.log")));
        assert_eq!(config.loans.on_delete, DeletePolicy::CloseLoans);
        assert_eq!(config.log_file().unwrap(), PathBuf::from("/tmp/catalog.log"));
    }

    #[test]
    fn unknown_policy_is_rejected() {
        assert!(CatalogConfig::parse("[loans]\non_delete = \"cascade\"").is_err());
        assert!(CatalogConfig::parse("[loans]\npolicy = \"block\"").is_err());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = CatalogConfig::load_from(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config.loans.on_delete, DeletePolicy::Block);
    }

    #[test]
    fn reads_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "[loans]\non_delete = \"orphan\"\n").unwrap();

        let config = CatalogConfig::load_from(&path).unwrap();
        assert_eq!(config.loans.on_delete, DeletePolicy::Orphan);
    }

    #[test]
    fn malformed_file_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "[log\nlevel = ").unwrap();

        let err = CatalogConfig::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("invalid config file"));
    }
}
