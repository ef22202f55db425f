//! Error types for Plexus commands.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for command operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Main error type for command definition and execution.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The argument vector was rejected by the parser.
    #[error("{0}")]
    Usage(String),

    #[error("Invalid command '{command}': {reason}")]
    InvalidCommand { command: String, reason: String },

    #[error("Command '{0}' has no registered handler")]
    UnknownCommand(String),

    #[error("Action failed for '{command}': {reason}")]
    ActionFailed {
        command: String,
        exit_code: Option<i32>,
        reason: String,
    },

    #[error("Interpolation error: {message}")]
    Interpolation { message: String },

    #[error("Failed to read package descriptor in {path}")]
    PackageRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed package descriptor in {path}: {reason}")]
    PackageFormat { path: PathBuf, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// Shorthand for a definition error on `command`.
    pub fn invalid(command: impl Into<String>, reason: impl Into<String>) -> Self {
        CoreError::InvalidCommand {
            command: command.into(),
            reason: reason.into(),
        }
    }
}
