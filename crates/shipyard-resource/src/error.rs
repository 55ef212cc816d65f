//! Error types for descriptor encoding.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("failed to encode resource descriptor: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("failed to decode resource descriptor: {0}")]
    Decode(#[source] serde_json::Error),
}
