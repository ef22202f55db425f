//! Engine error types.

use plexus_core::CoreError;
use plexus_plugin::PluginError;
use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that abort an engine run.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Module discovery could not walk the module root.
    #[error("Module discovery failed")]
    Crawl(#[source] PluginError),

    /// An in-process module was rejected.
    #[error("Module registration failed")]
    Registration(#[source] PluginError),

    /// The composed command tree failed to parse or execute the arguments.
    #[error(transparent)]
    Execution(#[from] CoreError),
}
