//! Typed view of the merged configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use shipyard_storage::StoragePath;

use super::ConfigError;
use crate::consistency::RetryPolicy;
use crate::logging::{LoggerConfig, LoggerFormat};
use crate::staging::{DistBundlePattern, DistBundleRule};
use crate::uploader::StagingOptions;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogSettings {
    pub level: String,
    pub format: LoggerFormat,
}

/// Settings for one staging run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagerConfig {
    /// Storage home; staging directories go under `<home>/.<namespace>/`.
    #[serde(default)]
    pub home_dir: Option<String>,
    pub namespace: String,
    /// Roots scanned for shared libraries, in precedence order.
    #[serde(default)]
    pub shared_lib_dirs: Vec<String>,
    /// Backing directory for remote paths in the local storage backend.
    #[serde(default)]
    pub local_root: Option<PathBuf>,
    pub replication: u16,
    pub resources_dir: String,
    pub retry: RetryPolicy,
    pub dist: DistBundleRule,
    pub log: LogSettings,
}

impl StagerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.replication < 1 {
            return Err(ConfigError::ValidationError(
                "replication must be at least 1".to_string(),
            ));
        }
        if self.retry.attempts < 1 {
            return Err(ConfigError::ValidationError(
                "retry.attempts must be at least 1".to_string(),
            ));
        }
        if self.namespace.is_empty()
            || self.namespace.contains('/')
            || self.namespace.contains("..")
        {
            return Err(ConfigError::ValidationError(format!(
                "namespace '{}' must be a single path segment",
                self.namespace
            )));
        }
        if self.resources_dir.trim_matches('/').is_empty() {
            return Err(ConfigError::ValidationError(
                "resources_dir must not be empty".to_string(),
            ));
        }
        if self.dist.prefix.is_empty() {
            return Err(ConfigError::ValidationError(
                "dist.prefix must not be empty".to_string(),
            ));
        }
        if let Some(home) = &self.home_dir {
            parse_path("home_dir", home)?;
        }
        self.shared_lib_paths()?;
        Ok(())
    }

    pub fn home_dir_path(&self) -> Result<Option<StoragePath>, ConfigError> {
        self.home_dir
            .as_deref()
            .map(|home| parse_path("home_dir", home))
            .transpose()
    }

    pub fn shared_lib_paths(&self) -> Result<Vec<StoragePath>, ConfigError> {
        self.shared_lib_dirs
            .iter()
            .map(|dir| parse_path("shared_lib_dirs", dir))
            .collect()
    }

    pub fn staging_options(&self) -> Result<StagingOptions, ConfigError> {
        let dist_pattern = DistBundlePattern::new(self.dist.clone())
            .map_err(|e| ConfigError::ValidationError(format!("dist: {}", e)))?;
        Ok(StagingOptions {
            namespace: self.namespace.clone(),
            retry: self.retry,
            dist_pattern,
        })
    }

    pub fn logger_config(&self) -> LoggerConfig {
        LoggerConfig {
            format: self.log.format,
            level: self.log.level.clone(),
            ..LoggerConfig::default()
        }
    }
}

fn parse_path(key: &str, raw: &str) -> Result<StoragePath, ConfigError> {
    StoragePath::parse(raw)
        .map_err(|e| ConfigError::ValidationError(format!("{} '{}': {}", key, raw, e)))
}
