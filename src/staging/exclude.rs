//! Reserved distribution-bundle matching.
//!
//! The primary distribution bundle is staged separately by the submitter, so
//! bulk staging and provided-library classpaths skip any file whose name starts
//! with the reserved prefix and ends with the reserved extension.

use globset::{Glob, GlobMatcher};
use serde::{Deserialize, Serialize};

use crate::error::StagingError;

/// Default reserved prefix.
pub const DEFAULT_DIST_PREFIX: &str = "app-dist";

/// Default reserved extension.
pub const DEFAULT_DIST_EXTENSION: &str = "jar";

/// Prefix and extension identifying the distribution bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistBundleRule {
    pub prefix: String,
    pub extension: String,
}

impl Default for DistBundleRule {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_DIST_PREFIX.to_string(),
            extension: DEFAULT_DIST_EXTENSION.to_string(),
        }
    }
}

/// Compiled matcher for the distribution bundle's file name.
#[derive(Debug, Clone)]
pub struct DistBundlePattern {
    rule: DistBundleRule,
    prefix: GlobMatcher,
    extension: GlobMatcher,
}

impl Default for DistBundlePattern {
    fn default() -> Self {
        // The default rule contains no glob metacharacters.
        Self::new(DistBundleRule::default()).unwrap()
    }
}

impl DistBundlePattern {
    /// Prefix and extension are matched separately so they may overlap,
    /// e.g. prefix `bundle.jar` with extension `jar`.
    pub fn new(rule: DistBundleRule) -> Result<Self, StagingError> {
        let prefix = Glob::new(&format!("{}*", globset::escape(&rule.prefix)))?.compile_matcher();
        let extension =
            Glob::new(&format!("*{}", globset::escape(&rule.extension)))?.compile_matcher();
        Ok(Self {
            rule,
            prefix,
            extension,
        })
    }

    pub fn rule(&self) -> &DistBundleRule {
        &self.rule
    }

    /// Whether `file_name` (a bare name, not a path) is the distribution bundle.
    pub fn matches(&self, file_name: &str) -> bool {
        self.prefix.is_match(file_name) && self.extension.is_match(file_name)
    }
}
