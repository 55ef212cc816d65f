//! Application identifiers and the staging directory they namespace.

use std::fmt;

use serde::{Deserialize, Serialize};
use shipyard_storage::StoragePath;

use crate::error::StagingError;

/// Opaque, globally unique identifier of one submitted application.
///
/// It becomes a path segment, so it must be filesystem-safe:
/// `^[A-Za-z0-9][A-Za-z0-9_.-]{0,127}$` and never `..`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ApplicationId(String);

impl ApplicationId {
    pub fn new(id: impl Into<String>) -> Result<Self, StagingError> {
        let id = id.into();
        validate(&id)?;
        Ok(Self(id))
    }

    /// A fresh `application_<ulid>` identifier.
    pub fn generate() -> Self {
        Self(format!(
            "application_{}",
            ulid::Ulid::new().to_string().to_lowercase()
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn validate(id: &str) -> Result<(), StagingError> {
    if id.is_empty() || id.len() > 128 {
        return Err(StagingError::InvalidApplicationId(format!(
            "identifier must be 1-128 characters, got {}",
            id.len()
        )));
    }

    let mut chars = id.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphanumeric() => {}
        _ => {
            return Err(StagingError::InvalidApplicationId(format!(
                "'{}' must start with an alphanumeric character",
                id
            )))
        }
    }

    for c in chars {
        if !c.is_ascii_alphanumeric() && !matches!(c, '_' | '-' | '.') {
            return Err(StagingError::InvalidApplicationId(format!(
                "'{}' contains invalid character {:?}",
                id, c
            )));
        }
    }

    if id.contains("..") {
        return Err(StagingError::InvalidApplicationId(format!(
            "'{}' contains a forbidden pattern",
            id
        )));
    }

    Ok(())
}

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ApplicationId {
    type Error = StagingError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ApplicationId> for String {
    fn from(value: ApplicationId) -> Self {
        value.0
    }
}

/// `<home>/.<namespace>/<application id>`
pub fn application_dir(home: &StoragePath, namespace: &str, id: &ApplicationId) -> StoragePath {
    home.join(&format!(".{}/{}", namespace, id))
}
