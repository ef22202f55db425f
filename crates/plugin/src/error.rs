//! Plugin error types.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Error type for module discovery and loading.
#[derive(Debug, Error)]
pub enum PluginError {
    /// A directory could not be listed. Fatal to the crawl that hit it.
    #[error("Failed to crawl {path}")]
    Crawl {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A module could not be read or parsed.
    #[error("Failed to load module {module}: {reason}")]
    Load { module: String, reason: String },

    /// A module was read but does not export a usable command.
    #[error("Invalid module {module}: {reason}")]
    Validation { module: String, reason: String },
}

impl PluginError {
    pub fn load(path: &Path, reason: impl ToString) -> Self {
        PluginError::Load {
            module: path.display().to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn validation(module: impl Into<String>, reason: impl ToString) -> Self {
        PluginError::Validation {
            module: module.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result type for plugin operations.
pub type Result<T> = std::result::Result<T, PluginError>;
