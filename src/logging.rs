//! Process-wide `tracing` subscriber for the CLI.
//!
//! Logs go to stderr so stdout stays reserved for manifests and listings.

use std::fmt;
use std::io::IsTerminal;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::Subscriber;
use tracing_subscriber::{
    fmt as fmt_layer, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("Invalid logger format: {0} (expected: text|json)")]
    InvalidFormat(String),
    #[error("Logger has been already initialized")]
    AlreadyInitialized,
    #[error("Failed to initialize logger: {0}")]
    InitializationFailed(String),
    #[error("Invalid log level: {0}")]
    InvalidLogLevel(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoggerFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LoggerFormat {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(LoggerFormat::Text),
            "json" => Ok(LoggerFormat::Json),
            _ => Err(LoggerError::InvalidFormat(s.to_string())),
        }
    }
}

impl fmt::Display for LoggerFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoggerFormat::Text => f.write_str("text"),
            LoggerFormat::Json => f.write_str("json"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub format: LoggerFormat,
    /// An `EnvFilter` directive, e.g. `info` or `shipyard=debug,warn`.
    pub level: String,
    pub with_targets: bool,
    pub use_color: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            format: LoggerFormat::Text,
            level: "info".to_string(),
            with_targets: true,
            use_color: std::io::stderr().is_terminal(),
        }
    }
}

pub fn logger_init(cfg: &LoggerConfig) -> Result<(), LoggerError> {
    let filter = mk_filter(&cfg.level)?;
    match cfg.format {
        LoggerFormat::Text => {
            let layer = fmt_layer::layer()
                .with_writer(std::io::stderr)
                .with_ansi(cfg.use_color)
                .with_target(cfg.with_targets);
            init_with(tracing_subscriber::registry().with(filter).with(layer))
        }
        LoggerFormat::Json => {
            let layer = fmt_layer::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_ansi(false)
                .with_target(cfg.with_targets);
            init_with(tracing_subscriber::registry().with(filter).with(layer))
        }
    }
}

fn mk_filter(level: &str) -> Result<EnvFilter, LoggerError> {
    EnvFilter::try_new(level).map_err(|_| LoggerError::InvalidLogLevel(level.to_string()))
}

fn init_with<S>(subscriber: S) -> Result<(), LoggerError>
where
    S: Subscriber + Send + Sync + 'static,
{
    subscriber.try_init().map_err(|e| {
        let s = e.to_string();
        if s.contains("SetGlobalDefaultError") {
            LoggerError::AlreadyInitialized
        } else {
            LoggerError::InitializationFailed(s)
        }
    })
}
