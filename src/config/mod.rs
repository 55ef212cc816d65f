//! Layered configuration
//!
//! 1. Built-in defaults
//! 2. Host config (`~/.config/shipyard/shipyard.toml`)
//! 3. Explicit config file (`--config`)
//! 4. CLI flags

mod defaults;
mod effective;
mod merge;
mod stager;

pub use defaults::BuiltinDefaults;
pub use effective::{ConfigError, ConfigOrigin, ConfigSource, EffectiveConfig};
pub use merge::{deep_merge, merge_layers};
pub use stager::{LogSettings, StagerConfig};

use std::path::PathBuf;

/// Default location of the host config file.
pub fn host_config_path() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .map(|home| home.join(".config").join("shipyard").join("shipyard.toml"))
}
