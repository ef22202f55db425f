//! The engine: discover modules, show a banner, run the command line.

use std::sync::Arc;

use plexus_core::{CommandLike, Context, Outcome, Output, StdOutput};
use plexus_plugin::{DirectoryCrawler, FileLister, ModuleLoader, PluginEntry};
use tracing::debug;

use crate::animation::AnimationHandle;
use crate::banner::{Banner, BannerRenderer, SilentRenderer};
use crate::composer::{CommandComposer, Registration};
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::registry::{BootReport, ModuleRegistry};
use crate::slogans::SloganSelector;

/// Where a run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Booting,
    Banner,
    Executing,
    Done,
}

/// Stops the banner animation when dropped, whichever way the run ends.
struct BannerGuard(AnimationHandle);

impl Drop for BannerGuard {
    fn drop(&mut self) {
        self.0.stop();
    }
}

/// Composes every discovered module into one command line and runs it.
pub struct CliEngine {
    config: EngineConfig,
    registry: ModuleRegistry,
    composer: CommandComposer,
    slogans: SloganSelector,
    renderer: Arc<dyn BannerRenderer>,
    output: Arc<dyn Output>,
    state: EngineState,
}

impl CliEngine {
    pub fn new(config: EngineConfig) -> Self {
        let registry = ModuleRegistry::new(config.crawl_base())
            .with_max_depth(config.crawl_depth)
            .with_package_id(config.package_id.clone())
            .with_convention(config.convention);
        let composer = CommandComposer::new(&config.root, config.bin_name.clone());
        let slogans = SloganSelector::new(&config.root, &config.sibling_dir);

        Self {
            config,
            registry,
            composer,
            slogans,
            renderer: Arc::new(SilentRenderer),
            output: Arc::new(StdOutput),
            state: EngineState::Idle,
        }
    }

    /// Sets the sink commands, help and version text write to.
    pub fn with_output(mut self, output: Arc<dyn Output>) -> Self {
        self.output = output;
        self
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn BannerRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    /// Replaces the filesystem used for module discovery.
    pub fn with_lister(mut self, lister: Arc<dyn FileLister>) -> Self {
        self.registry = self.registry.with_crawler(DirectoryCrawler::new(lister));
        self
    }

    pub fn with_loader(mut self, loader: Arc<dyn ModuleLoader>) -> Self {
        self.registry = self.registry.with_loader(loader);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Names of the mounted modules.
    pub fn modules(&mut self) -> Vec<String> {
        self.composer.module_names()
    }

    /// Registers an in-process module ahead of discovery.
    ///
    /// Registered modules take precedence over discovered ones of the same name.
    pub async fn register(&mut self, entry: PluginEntry) -> Result<Registration> {
        self.registry
            .register(entry, &mut self.composer)
            .await
            .map_err(EngineError::Registration)
    }

    /// Discovers and registers modules. Only the first call crawls.
    pub async fn boot(&mut self) -> Result<BootReport> {
        self.state = EngineState::Booting;
        let report = self.registry.boot(&mut self.composer).await;
        if report.is_err() {
            self.state = EngineState::Idle;
        }
        report.map_err(EngineError::Crawl)
    }

    /// Runs one argument vector laid out per the configured [`ArgvLayout`].
    ///
    /// Help and version output is written to the output sink and also
    /// returned in the outcome.
    ///
    /// [`ArgvLayout`]: crate::ArgvLayout
    pub async fn run<I, S>(&mut self, argv: I) -> Result<Outcome>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let argv: Vec<String> = argv.into_iter().map(Into::into).collect();
        let args = self.config.argv_layout.normalize(argv, &self.config.bin_name);

        self.boot().await?;

        let guard = if self.config.banner {
            self.state = EngineState::Banner;
            Some(BannerGuard(self.show_banner(args.get(1).map(String::as_str))))
        } else {
            None
        };

        self.state = EngineState::Executing;
        let ctx = Context::new(self.output.clone());
        let result = self.composer.root().parse_async(args, &ctx).await;

        drop(guard);
        self.state = EngineState::Done;

        let outcome = result?;
        if let Some(text) = outcome.text() {
            self.output.block(text);
        }
        debug!(?outcome, "run finished");
        Ok(outcome)
    }

    fn show_banner(&mut self, first_arg: Option<&str>) -> AnimationHandle {
        let priority = first_arg.filter(|arg| self.composer.contains(arg));
        let identity = self.composer.identity();

        let banner = Banner {
            title: identity.name,
            version: identity.version,
            slogan: self.slogans.select(priority),
        };
        self.renderer.render(&banner)
    }
}
