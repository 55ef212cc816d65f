//! Effective configuration with provenance
//!
//! Records the merged configuration plus where each layer came from, so
//! `shipyard config` can explain a value.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

use super::defaults::BuiltinDefaults;
use super::merge::merge_layers;
use super::stager::StagerConfig;

/// Schema identifier
pub const SCHEMA_ID: &str = "shipyard/effective_config@1";

/// Origin of a configuration source
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigOrigin {
    Builtin,
    Host,
    File,
    Cli,
}

/// A contributing config source with provenance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSource {
    pub origin: ConfigOrigin,

    /// File path (None for builtin/cli)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// SHA-256 digest of raw file bytes (None for builtin/cli)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

/// Merged configuration with provenance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectiveConfig {
    pub schema_id: String,

    /// The merged configuration object
    pub config: Value,

    /// Contributing sources in precedence order
    pub sources: Vec<ConfigSource>,
}

impl EffectiveConfig {
    /// Build from layers: builtin, host file, explicit file, CLI overrides.
    ///
    /// A missing host file is skipped; a missing explicit file is an error.
    pub fn build(
        host_config_path: Option<&Path>,
        config_path: Option<&Path>,
        cli_overrides: Option<Value>,
    ) -> Result<Self, ConfigError> {
        let mut layers = vec![BuiltinDefaults::default().to_value()];
        let mut sources = vec![ConfigSource {
            origin: ConfigOrigin::Builtin,
            path: None,
            digest: None,
        }];

        if let Some(path) = host_config_path.filter(|p| p.exists()) {
            let (value, digest) = load_toml_file(path)?;
            layers.push(value);
            sources.push(ConfigSource {
                origin: ConfigOrigin::Host,
                path: Some(path.to_string_lossy().to_string()),
                digest: Some(digest),
            });
        }

        if let Some(path) = config_path {
            let (value, digest) = load_toml_file(path)?;
            layers.push(value);
            sources.push(ConfigSource {
                origin: ConfigOrigin::File,
                path: Some(path.to_string_lossy().to_string()),
                digest: Some(digest),
            });
        }

        if let Some(cli) = cli_overrides {
            layers.push(cli);
            sources.push(ConfigSource {
                origin: ConfigOrigin::Cli,
                path: None,
                digest: None,
            });
        }

        let config = Self {
            schema_id: SCHEMA_ID.to_string(),
            config: merge_layers(layers),
            sources,
        };
        config.stager_config()?;
        Ok(config)
    }

    /// Deserialize and validate the merged value.
    pub fn stager_config(&self) -> Result<StagerConfig, ConfigError> {
        let stager: StagerConfig = serde_json::from_value(self.config.clone())
            .map_err(|e| ConfigError::ParseError(format!("invalid configuration: {}", e)))?;
        stager.validate()?;
        Ok(stager)
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Get a config value by dot-separated path
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut current = &self.config;
        for part in path.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    pub fn get_u64(&self, path: &str) -> Option<u64> {
        self.get(path).and_then(|v| v.as_u64())
    }

    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(|v| v.as_str())
    }
}

/// Load and parse a TOML file, returning the value and digest
fn load_toml_file(path: &Path) -> Result<(Value, String), ConfigError> {
    let bytes = fs::read(path)
        .map_err(|e| ConfigError::IoError(format!("{}: {}", path.display(), e)))?;

    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    let digest = hex::encode(hasher.finalize());

    let contents = String::from_utf8(bytes)
        .map_err(|e| ConfigError::ParseError(format!("{}: invalid UTF-8: {}", path.display(), e)))?;
    let toml_value: toml::Value = toml::from_str(&contents)
        .map_err(|e| ConfigError::ParseError(format!("{}: {}", path.display(), e)))?;

    Ok((toml_to_json(toml_value), digest))
}

fn toml_to_json(toml: toml::Value) -> Value {
    match toml {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::Number(i.into()),
        toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(arr) => Value::Array(arr.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => {
            Value::Object(table.into_iter().map(|(k, v)| (k, toml_to_json(v))).collect())
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}
