//! Built-in defaults (layer 1)

use serde::{Deserialize, Serialize};

use crate::consistency::RetryPolicy;
use crate::staging::{DEFAULT_DIST_EXTENSION, DEFAULT_DIST_PREFIX};
use crate::uploader::DEFAULT_NAMESPACE;

/// Built-in default configuration values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltinDefaults {
    /// Directory under the home directory that holds staging directories
    pub namespace: String,

    /// Replication factor of uploaded files (default: 3)
    pub replication: u16,

    /// Logical directory for bulk-shipped files (default: "lib")
    pub resources_dir: String,

    /// Listing attempts after an upload (default: 3)
    pub retry_attempts: u32,

    /// Delay between listing attempts (default: 100)
    pub retry_delay_ms: u64,

    pub dist_prefix: String,
    pub dist_extension: String,

    pub log_level: String,
    pub log_format: String,
}

impl Default for BuiltinDefaults {
    fn default() -> Self {
        let retry = RetryPolicy::default();
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            replication: 3,
            resources_dir: "lib".to_string(),
            retry_attempts: retry.attempts,
            retry_delay_ms: retry.delay.as_millis() as u64,
            dist_prefix: DEFAULT_DIST_PREFIX.to_string(),
            dist_extension: DEFAULT_DIST_EXTENSION.to_string(),
            log_level: "info".to_string(),
            log_format: "text".to_string(),
        }
    }
}

impl BuiltinDefaults {
    /// Convert to JSON Value for merging
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "home_dir": null,
            "namespace": self.namespace,
            "shared_lib_dirs": [],
            "local_root": null,
            "replication": self.replication,
            "resources_dir": self.resources_dir,
            "retry": {
                "attempts": self.retry_attempts,
                "delay_ms": self.retry_delay_ms
            },
            "dist": {
                "prefix": self.dist_prefix,
                "extension": self.dist_extension
            },
            "log": {
                "level": self.log_level,
                "format": self.log_format
            }
        })
    }
}
