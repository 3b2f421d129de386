//! Import configuration.
//!
//! Sources, highest priority first:
//! 1. Command-line flags (`--database`, `--config`)
//! 2. Environment variables (`CRM_IMPORT_DB`, `CRM_IMPORT_CONFIG`)
//! 3. TOML configuration file
//! 4. Built-in defaults
//!
//! Flags and environment variables are merged by the CLI layer; this module
//! handles the file and the defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::info;

use crate::error::AppError;
use crate::import::controller::DEFAULT_CHECKPOINT_INTERVAL;

/// Config file read from the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "crm-import.toml";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// SQLite database file.
    pub database_path: PathBuf,
    /// Rows between progress checkpoints. Must be at least 1.
    pub checkpoint_interval: u64,
    /// Terminal jobs older than this are removed by `cleanup`.
    pub job_retention_days: i64,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("crm.db"),
            checkpoint_interval: DEFAULT_CHECKPOINT_INTERVAL,
            job_retention_days: 30,
        }
    }
}

impl ImportConfig {
    /// Parses and validates a TOML document. Missing keys take defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, AppError> {
        let config: ImportConfig =
            toml::from_str(s).map_err(|e| AppError::Config(format!("Invalid TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from `config_path`, or from `crm-import.toml` when
    /// present, then applies `database_override`.
    ///
    /// An explicitly named file must exist; the default file is optional.
    pub fn resolve(
        config_path: Option<&Path>,
        database_override: Option<PathBuf>,
    ) -> Result<Self, AppError> {
        let mut config = match config_path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::from_file(default_path)?
                } else {
                    Self::default()
                }
            }
        };

        if let Some(path) = database_override {
            config.database_path = path;
        }

        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self, AppError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read {}: {e}", path.display()))
        })?;
        let config = Self::from_toml_str(&contents)?;
        info!("[CONFIG] Loaded {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.checkpoint_interval == 0 {
            return Err(AppError::Config(
                "checkpoint_interval must be at least 1".to_string(),
            ));
        }
        if self.job_retention_days < 0 {
            return Err(AppError::Config(
                "job_retention_days must not be negative".to_string(),
            ));
        }
        if self.database_path.as_os_str().is_empty() {
            return Err(AppError::Config("database_path is empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults() {
        let config = ImportConfig::default();
        assert_eq!(config.checkpoint_interval, 10);
        assert_eq!(config.job_retention_days, 30);
        assert_eq!(config.database_path, PathBuf::from("crm.db"));
        config.validate().unwrap();
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config = ImportConfig::from_toml_str("checkpoint_interval = 25\n").unwrap();
        assert_eq!(config.checkpoint_interval, 25);
        assert_eq!(config.job_retention_days, 30);
    }

    #[test]
    fn zero_checkpoint_interval_is_rejected() {
        let err = ImportConfig::from_toml_str("checkpoint_interval = 0\n").unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn malformed_toml_is_a_config_error() {
        let err = ImportConfig::from_toml_str("checkpoint_interval = \"ten\"\n").unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn database_override_beats_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("import.toml");
        std::fs::write(
            &path,
            "database_path = \"/var/lib/crm/file.db\"\njob_retention_days = 7\n",
        )
        .unwrap();

        let from_file = ImportConfig::resolve(Some(&path), None).unwrap();
        assert_eq!(from_file.database_path, PathBuf::from("/var/lib/crm/file.db"));
        assert_eq!(from_file.job_retention_days, 7);

        let overridden =
            ImportConfig::resolve(Some(&path), Some(PathBuf::from("/tmp/cli.db"))).unwrap();
        assert_eq!(overridden.database_path, PathBuf::from("/tmp/cli.db"));
        assert_eq!(overridden.job_retention_days, 7);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let err = ImportConfig::resolve(Some(&temp_dir.path().join("absent.toml")), None)
            .unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }
}
