//! Module discovery and registration.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use plexus_core::{Command, CommandLike};
use plexus_plugin::{
    DirectoryCrawler, ExportConvention, ManifestLoader, ModuleLoader, PluginEntry, PluginError,
};
use tracing::{debug, info, warn};

use crate::composer::{CommandComposer, Registration};
use crate::config::{DEFAULT_CRAWL_DEPTH, DEFAULT_PACKAGE_ID};

/// Summary of one boot.
#[derive(Debug, Default)]
pub struct BootReport {
    /// Module files found by the crawl.
    pub discovered: usize,

    /// Modules mounted on the root.
    pub registered: Vec<String>,

    /// Modules skipped because the name was taken.
    pub duplicates: Vec<String>,

    /// Module files inside the engine's own package.
    pub skipped: Vec<PathBuf>,

    /// Modules that failed to load or validate.
    pub failed: Vec<PluginError>,
}

/// Discovers modules and registers their commands with a composer.
pub struct ModuleRegistry {
    base: PathBuf,
    max_depth: i32,
    crawler: DirectoryCrawler,
    loader: Arc<dyn ModuleLoader>,
    package_id: String,
    convention: ExportConvention,
    booted: bool,
}

impl ModuleRegistry {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            max_depth: DEFAULT_CRAWL_DEPTH,
            crawler: DirectoryCrawler::filesystem(),
            loader: Arc::new(ManifestLoader::new()),
            package_id: DEFAULT_PACKAGE_ID.to_string(),
            convention: ExportConvention::default(),
            booted: false,
        }
    }

    pub fn with_max_depth(mut self, depth: i32) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_crawler(mut self, crawler: DirectoryCrawler) -> Self {
        self.crawler = crawler;
        self
    }

    pub fn with_loader(mut self, loader: Arc<dyn ModuleLoader>) -> Self {
        self.loader = loader;
        self
    }

    pub fn with_package_id(mut self, package_id: impl Into<String>) -> Self {
        self.package_id = package_id.into();
        self
    }

    pub fn with_convention(mut self, convention: ExportConvention) -> Self {
        self.convention = convention;
        self
    }

    pub fn is_booted(&self) -> bool {
        self.booted
    }

    /// Crawls the base directory and registers every valid module.
    ///
    /// Only the first call crawls; later calls return an empty report. A crawl
    /// failure aborts the boot and leaves the registry unbooted. Load and
    /// validation failures are logged and collected in the report.
    pub async fn boot(&mut self, composer: &mut CommandComposer) -> Result<BootReport, PluginError> {
        let mut report = BootReport::default();
        if self.booted {
            debug!("modules already booted");
            return Ok(report);
        }

        let paths = self.crawler.crawl(&self.base, self.max_depth)?;
        report.discovered = paths.len();

        for path in paths {
            if belongs_to_package(&path, &self.package_id) {
                debug!(path = %path.display(), "skipping module of own package");
                report.skipped.push(path);
                continue;
            }

            let outcome = match self.loader.load(&path).await {
                Ok(entry) => self.mount(entry, composer).await,
                Err(e) => Err(e),
            };

            match outcome {
                Ok((name, Registration::Registered)) => report.registered.push(name),
                Ok((name, Registration::Duplicate)) => {
                    debug!(module = %name, path = %path.display(), "module name already taken");
                    report.duplicates.push(name);
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to register module");
                    report.failed.push(e);
                }
            }
        }

        self.booted = true;

        let names = composer.module_names();
        if names.is_empty() {
            info!("no modules loaded");
        } else {
            info!(
                "loaded modules:\n{}",
                names.iter().map(|n| format!("- {}", n)).collect::<Vec<_>>().join("\n")
            );
        }

        Ok(report)
    }

    /// Registers an in-process module entry.
    pub async fn register(
        &self,
        entry: PluginEntry,
        composer: &mut CommandComposer,
    ) -> Result<Registration, PluginError> {
        self.mount(entry, composer).await.map(|(_, registration)| registration)
    }

    async fn mount(
        &self,
        entry: PluginEntry,
        composer: &mut CommandComposer,
    ) -> Result<(String, Registration), PluginError> {
        if entry.convention() != self.convention {
            return Err(PluginError::validation(
                entry.declared_name().unwrap_or("<anonymous>"),
                format!(
                    "module exports a {} but this engine expects a {}",
                    entry.convention(),
                    self.convention
                ),
            ));
        }

        let command: Box<dyn CommandLike> = match entry {
            PluginEntry::Factory { name, factory } => {
                check_name(&name)?;
                // Known up front, so taken names never reach the factory.
                if composer.contains(&name) {
                    return Ok((name, Registration::Duplicate));
                }

                let produced = factory().map_err(|e| load_failure(&name, e))?;
                let command = produced.resolve().await.map_err(|e| load_failure(&name, e))?;
                command
                    .validate()
                    .map_err(|e| PluginError::validation(name.clone(), e))?;

                let registration = composer.add_command(&name, command);
                return Ok((name, registration));
            }
            PluginEntry::Mutator(mutate) => {
                let mut command = Command::new("");
                mutate(&mut command).map_err(|e| load_failure("<anonymous>", e))?;
                Box::new(command)
            }
        };

        let name = command.name().to_string();
        check_name(&name)?;
        command
            .validate()
            .map_err(|e| PluginError::validation(name.clone(), e))?;

        let registration = composer.add_command(&name, command);
        Ok((name, registration))
    }
}

fn check_name(name: &str) -> Result<(), PluginError> {
    if name.trim().is_empty() {
        return Err(PluginError::Load {
            module: "<anonymous>".to_string(),
            reason: "module does not name its command".to_string(),
        });
    }
    if name == plexus_core::HELP_COMMAND {
        return Err(PluginError::validation(name, "module name is reserved"));
    }
    Ok(())
}

fn load_failure(module: &str, error: plexus_core::CoreError) -> PluginError {
    PluginError::Load {
        module: module.to_string(),
        reason: error.to_string(),
    }
}

/// Returns true if `path` lies inside a directory chain matching `package_id`.
///
/// `@plexus/cli` matches `.../node_modules/@plexus/cli/...` but not
/// `.../@plexus/cli-extra/...`.
fn belongs_to_package(path: &Path, package_id: &str) -> bool {
    let needle: Vec<&str> = package_id.split('/').filter(|s| !s.is_empty()).collect();
    if needle.is_empty() {
        return false;
    }

    let components: Vec<&str> = path
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => part.to_str(),
            _ => None,
        })
        .collect();

    components.windows(needle.len()).any(|window| window == needle.as_slice())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use plexus_plugin::MemoryLister;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Serves entries from a map keyed by path, failing on unknown paths.
    struct StubLoader {
        entries: HashMap<PathBuf, PluginEntry>,
        loads: AtomicUsize,
    }

    impl StubLoader {
        fn new() -> Self {
            Self {
                entries: HashMap::new(),
                loads: AtomicUsize::new(0),
            }
        }

        fn with(mut self, path: &str, entry: PluginEntry) -> Self {
            self.entries.insert(PathBuf::from(path), entry);
            self
        }
    }

    #[async_trait]
    impl ModuleLoader for StubLoader {
        async fn load(&self, path: &Path) -> plexus_plugin::Result<PluginEntry> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            self.entries
                .get(path)
                .cloned()
                .ok_or_else(|| PluginError::load(path, "syntax error"))
        }
    }

    fn named(name: &'static str) -> PluginEntry {
        PluginEntry::ready(name, move || Command::new(name).with_subcommand(Command::new("run")))
    }

    fn registry(lister: MemoryLister, loader: StubLoader) -> ModuleRegistry {
        ModuleRegistry::new("/ws")
            .with_crawler(DirectoryCrawler::new(Arc::new(lister)))
            .with_loader(Arc::new(loader))
    }

    fn composer() -> CommandComposer {
        CommandComposer::new("/nonexistent", "plexus")
    }

    #[tokio::test]
    async fn test_boot_registers_valid_modules() {
        let lister = MemoryLister::new()
            .with_file("/ws/a/cli-module.json")
            .with_file("/ws/b/cli-module.json");
        let loader = StubLoader::new()
            .with("/ws/a/cli-module.json", named("alpha"))
            .with("/ws/b/cli-module.json", named("beta"));

        let mut registry = registry(lister, loader);
        let mut composer = composer();
        let report = registry.boot(&mut composer).await.unwrap();

        assert_eq!(report.discovered, 2);
        assert_eq!(report.registered, vec!["alpha", "beta"]);
        assert_eq!(composer.module_names(), vec!["alpha", "beta"]);
        assert!(registry.is_booted());
    }

    #[tokio::test]
    async fn test_boot_twice_crawls_once() {
        let lister = Arc::new(MemoryLister::new().with_file("/ws/a/cli-module.json"));
        let loader = StubLoader::new().with("/ws/a/cli-module.json", named("alpha"));

        let mut registry = ModuleRegistry::new("/ws")
            .with_crawler(DirectoryCrawler::new(lister.clone()))
            .with_loader(Arc::new(loader));
        let mut composer = composer();

        registry.boot(&mut composer).await.unwrap();
        let calls = lister.list_calls();
        let second = registry.boot(&mut composer).await.unwrap();

        assert_eq!(lister.list_calls(), calls);
        assert!(second.registered.is_empty());
        assert_eq!(composer.module_names(), vec!["alpha"]);
    }

    #[tokio::test]
    async fn test_broken_modules_are_isolated() {
        let lister = MemoryLister::new()
            .with_file("/ws/a/cli-module.json")
            .with_file("/ws/broken/cli-module.json")
            .with_file("/ws/c/cli-module.json");
        let loader = StubLoader::new()
            .with("/ws/a/cli-module.json", named("alpha"))
            .with("/ws/c/cli-module.json", named("gamma"));

        let mut registry = registry(lister, loader);
        let mut composer = composer();
        let report = registry.boot(&mut composer).await.unwrap();

        assert_eq!(report.registered, vec!["alpha", "gamma"]);
        assert_eq!(report.failed.len(), 1);
        assert!(matches!(report.failed[0], PluginError::Load { .. }));
    }

    #[tokio::test]
    async fn test_failing_factory_is_skipped() {
        let failing = PluginEntry::factory("bad", || {
            Err(plexus_core::CoreError::invalid("bad", "factory blew up"))
        });
        let lister = MemoryLister::new()
            .with_file("/ws/a/cli-module.json")
            .with_file("/ws/b/cli-module.json");
        let loader = StubLoader::new()
            .with("/ws/a/cli-module.json", failing)
            .with("/ws/b/cli-module.json", named("beta"));

        let mut composer = composer();
        let report = registry(lister, loader).boot(&mut composer).await.unwrap();

        assert_eq!(report.registered, vec!["beta"]);
        assert_eq!(report.failed.len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_command_is_validation_failure() {
        let invalid = PluginEntry::ready("bad", || {
            Command::new("bad")
                .with_subcommand(Command::new("dup"))
                .with_subcommand(Command::new("dup"))
        });
        let lister = MemoryLister::new().with_file("/ws/a/cli-module.json");
        let loader = StubLoader::new().with("/ws/a/cli-module.json", invalid);

        let mut composer = composer();
        let report = registry(lister, loader).boot(&mut composer).await.unwrap();

        assert!(report.registered.is_empty());
        assert!(matches!(report.failed[0], PluginError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_duplicate_names_first_wins() {
        let lister = MemoryLister::new()
            .with_file("/ws/a/cli-module.json")
            .with_file("/ws/b/cli-module.json");
        let first = PluginEntry::ready("demo", || {
            Command::new("demo").with_about("first")
        });
        let second = PluginEntry::factory("demo", || panic!("taken names are never built"));
        let loader = StubLoader::new()
            .with("/ws/a/cli-module.json", first)
            .with("/ws/b/cli-module.json", second);

        let mut composer = composer();
        let report = registry(lister, loader).boot(&mut composer).await.unwrap();

        assert_eq!(report.registered, vec!["demo"]);
        assert_eq!(report.duplicates, vec!["demo"]);
        let help = composer.root().render_help(Some("demo")).unwrap();
        assert!(help.contains("first"));
    }

    #[tokio::test]
    async fn test_own_package_is_skipped() {
        let lister = MemoryLister::new()
            .with_file("/ws/node_modules/@plexus/cli/lib/cli-module.json")
            .with_file("/ws/node_modules/@plexus/cli-extra/cli-module.json");
        let loader = StubLoader::new()
            .with("/ws/node_modules/@plexus/cli/lib/cli-module.json", named("self"))
            .with("/ws/node_modules/@plexus/cli-extra/cli-module.json", named("extra"));

        let mut composer = composer();
        let report = registry(lister, loader).boot(&mut composer).await.unwrap();

        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.registered, vec!["extra"]);
    }

    #[tokio::test]
    async fn test_crawl_failure_aborts_boot() {
        let lister = MemoryLister::new()
            .with_file("/ws/a/cli-module.json")
            .with_unreadable("/ws/locked");
        let loader = StubLoader::new().with("/ws/a/cli-module.json", named("alpha"));

        let mut registry = registry(lister, loader);
        let mut composer = composer();
        let err = registry.boot(&mut composer).await.unwrap_err();

        assert!(matches!(err, PluginError::Crawl { .. }));
        assert!(!registry.is_booted());
        assert!(composer.module_names().is_empty());
    }

    #[tokio::test]
    async fn test_register_mutator() {
        let registry = ModuleRegistry::new("/ws").with_convention(ExportConvention::Mutator);
        let mut composer = composer();

        let entry = PluginEntry::mutator(|command| {
            command.set_name("tools");
            command.set_about("Tooling");
            command.add_command(Box::new(Command::new("lint")));
            Ok(())
        });

        let registration = registry.register(entry, &mut composer).await.unwrap();
        assert_eq!(registration, Registration::Registered);
        assert!(composer.contains("tools"));
    }

    #[tokio::test]
    async fn test_convention_mismatch_is_validation_failure() {
        let registry = ModuleRegistry::new("/ws");
        let mut composer = composer();

        let entry = PluginEntry::mutator(|command| {
            command.set_name("tools");
            Ok(())
        });

        let err = registry.register(entry, &mut composer).await.unwrap_err();
        assert!(matches!(err, PluginError::Validation { .. }));
        assert!(!composer.contains("tools"));
    }

    #[tokio::test]
    async fn test_unnamed_and_reserved_names_rejected() {
        let registry = ModuleRegistry::new("/ws").with_convention(ExportConvention::Mutator);
        let mut composer = composer();

        let unnamed = PluginEntry::mutator(|_| Ok(()));
        let err = registry.register(unnamed, &mut composer).await.unwrap_err();
        assert!(matches!(err, PluginError::Load { .. }));

        let registry = ModuleRegistry::new("/ws");
        let reserved = named("help");
        assert!(registry.register(reserved, &mut composer).await.is_err());
    }

    #[tokio::test]
    async fn test_deferred_factory_is_awaited() {
        let registry = ModuleRegistry::new("/ws");
        let mut composer = composer();

        let entry = PluginEntry::deferred("later", || async {
            tokio::task::yield_now().await;
            Ok(Command::new("later"))
        });

        registry.register(entry, &mut composer).await.unwrap();
        assert!(composer.contains("later"));
    }

    #[test]
    fn test_belongs_to_package() {
        assert!(belongs_to_package(
            Path::new("/ws/node_modules/@plexus/cli/cli-module.json"),
            "@plexus/cli"
        ));
        assert!(!belongs_to_package(
            Path::new("/ws/node_modules/@plexus/cli-extra/cli-module.json"),
            "@plexus/cli"
        ));
        assert!(!belongs_to_package(Path::new("/ws/cli/cli-module.json"), "@plexus/cli"));
        assert!(belongs_to_package(Path::new("/ws/plexus/cli-module.json"), "plexus"));
    }
}
