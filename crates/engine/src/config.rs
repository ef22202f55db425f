//! Engine configuration.

use std::path::{Path, PathBuf};

use plexus_plugin::ExportConvention;

/// Default number of directory levels crawled for modules.
pub const DEFAULT_CRAWL_DEPTH: i32 = 4;

/// Package id of the engine's own package. Modules inside it are never loaded.
pub const DEFAULT_PACKAGE_ID: &str = "@plexus/cli";

/// Directory, relative to the root, holding sibling packages.
pub const DEFAULT_SIBLING_DIR: &str = "node_modules/@plexus";

/// Name used for the root command when no package descriptor is found.
pub const DEFAULT_BIN_NAME: &str = "plexus";

/// How an argument vector is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArgvLayout {
    /// `[runtime, script, ...args]`: the first element is dropped.
    #[default]
    Runtime,

    /// `[binary, ...args]`, as handed to a native process.
    Native,
}

impl ArgvLayout {
    /// Returns the vector clap expects: binary name first, then user arguments.
    pub fn normalize(self, argv: Vec<String>, bin_name: &str) -> Vec<String> {
        let mut args = argv.into_iter();
        if self == ArgvLayout::Runtime {
            args.next();
        }

        let mut normalized: Vec<String> = args.collect();
        if normalized.is_empty() {
            normalized.push(bin_name.to_string());
        }
        normalized
    }
}

/// Settings consumed when an engine is constructed.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Root of the host package: descriptor, slogans and sibling packages.
    pub root: PathBuf,

    /// Where the module crawl starts. Defaults to `root`.
    pub module_root: Option<PathBuf>,

    /// Directory levels crawled below the module root.
    pub crawl_depth: i32,

    /// Whether a banner is shown before executing.
    pub banner: bool,

    /// The engine's own package id.
    pub package_id: String,

    /// Sibling package directory, relative to `root`.
    pub sibling_dir: PathBuf,

    /// Accepted module export shape.
    pub convention: ExportConvention,

    pub argv_layout: ArgvLayout,

    /// Root command name when the descriptor is unavailable.
    pub bin_name: String,
}

impl EngineConfig {
    /// Creates a configuration rooted at `root` with default settings.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            module_root: None,
            crawl_depth: DEFAULT_CRAWL_DEPTH,
            banner: true,
            package_id: DEFAULT_PACKAGE_ID.to_string(),
            sibling_dir: PathBuf::from(DEFAULT_SIBLING_DIR),
            convention: ExportConvention::default(),
            argv_layout: ArgvLayout::default(),
            bin_name: DEFAULT_BIN_NAME.to_string(),
        }
    }

    pub fn with_module_root(mut self, module_root: impl Into<PathBuf>) -> Self {
        self.module_root = Some(module_root.into());
        self
    }

    pub fn with_crawl_depth(mut self, depth: i32) -> Self {
        self.crawl_depth = depth;
        self
    }

    pub fn with_banner(mut self, enabled: bool) -> Self {
        self.banner = enabled;
        self
    }

    pub fn with_package_id(mut self, package_id: impl Into<String>) -> Self {
        self.package_id = package_id.into();
        self
    }

    pub fn with_sibling_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.sibling_dir = dir.into();
        self
    }

    pub fn with_convention(mut self, convention: ExportConvention) -> Self {
        self.convention = convention;
        self
    }

    pub fn with_argv_layout(mut self, layout: ArgvLayout) -> Self {
        self.argv_layout = layout;
        self
    }

    pub fn with_bin_name(mut self, name: impl Into<String>) -> Self {
        self.bin_name = name.into();
        self
    }

    /// Directory the module crawl starts from.
    pub fn crawl_base(&self) -> &Path {
        self.module_root.as_deref().unwrap_or(&self.root)
    }

    /// Absolute sibling package directory.
    pub fn sibling_path(&self) -> PathBuf {
        self.root.join(&self.sibling_dir)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new(".")
    }
}
