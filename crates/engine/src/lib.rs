//! Plexus Engine - Module registry, command composition and orchestration.
//!
//! [`CliEngine`] ties the pieces together: it crawls for modules, mounts
//! their commands on one root command, shows a banner and runs the
//! requested command line.

mod animation;
mod banner;
mod composer;
mod config;
mod engine;
mod error;
mod registry;
mod slogans;

pub use animation::{Animation, AnimationHandle};
pub use banner::{Banner, BannerRenderer, SilentRenderer};
pub use composer::{CommandComposer, Registration, RootIdentity};
pub use config::{
    ArgvLayout, DEFAULT_BIN_NAME, DEFAULT_CRAWL_DEPTH, DEFAULT_PACKAGE_ID, DEFAULT_SIBLING_DIR,
    EngineConfig,
};
pub use engine::{CliEngine, EngineState};
pub use error::{EngineError, Result};
pub use registry::{BootReport, ModuleRegistry};
pub use slogans::{
    FALLBACK_SLOGAN, PackageSlogans, SLOGAN_FILE, SloganCatalog, SloganPool, SloganSelector,
    SloganSourceError, read_slogans,
};
