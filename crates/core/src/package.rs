//! Package descriptor reading.

use std::path::Path;

use serde::Deserialize;

use crate::error::{CoreError, Result};

/// File name of a package descriptor.
pub const DESCRIPTOR_FILE: &str = "package.json";

/// Name and version of a package, as declared by its descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PackageMetadata {
    /// Full package name, possibly scoped (`@scope/name`).
    pub name: String,

    pub version: String,

    #[serde(default)]
    pub description: Option<String>,
}

impl PackageMetadata {
    /// Reads the descriptor located in `dir`.
    pub fn read(dir: &Path) -> Result<Self> {
        let path = dir.join(DESCRIPTOR_FILE);
        let content = std::fs::read_to_string(&path).map_err(|source| CoreError::PackageRead {
            path: path.clone(),
            source,
        })?;
        Self::from_json(&content).map_err(|reason| CoreError::PackageFormat { path, reason })
    }

    fn from_json(json: &str) -> std::result::Result<Self, String> {
        serde_json::from_str(json).map_err(|e| e.to_string())
    }

    /// The name without its scope (`cli` for `@plexus/cli`).
    pub fn unscoped_name(&self) -> &str {
        unscoped(&self.name)
    }
}

/// Returns the part of a package name after the last `/`.
pub fn unscoped(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}
