//! Plexus Plugin - Module discovery and loading.
//!
//! Modules are `cli-module.json` / `cli-module.toml` files found by a bounded
//! directory crawl. Each one is loaded into a [`PluginEntry`], the single
//! normalized shape the engine registers commands from.

mod crawler;
mod entry;
mod error;
mod loader;
pub mod manifest;
mod runner;

pub use crawler::{
    DirectoryCrawler, EntryKind, FileLister, FsLister, ListedEntry, MODULE_EXTENSIONS,
    MODULE_FILE_STEM, MemoryLister, is_module_file,
};
pub use entry::{ExportConvention, Factory, Mutator, PluginEntry, Produced};
pub use error::{PluginError, Result};
pub use loader::{DEFAULT_EXPORT, ManifestLoader, ModuleLoader};
pub use manifest::{ActionManifest, CommandManifest, ModuleManifest};
pub use runner::{ProcessOutput, ProcessRunner, Shell};
