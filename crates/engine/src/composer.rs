//! Root command ownership and module mounting.

use std::path::{Path, PathBuf};

use plexus_core::{Command, CommandLike, PackageMetadata};
use tracing::debug;

/// Outcome of mounting a module's command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    Registered,

    /// A module with the same name is already mounted; nothing changed.
    Duplicate,
}

/// Name and version labelling the root command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootIdentity {
    pub name: String,
    pub version: String,
}

/// Owns the root command of one engine.
///
/// The root is built on first access from the package descriptor in
/// `package_root`; later accesses return the same command.
pub struct CommandComposer {
    package_root: PathBuf,
    fallback_name: String,
    root: Option<(RootIdentity, Command)>,
}

impl CommandComposer {
    pub fn new(package_root: impl Into<PathBuf>, fallback_name: impl Into<String>) -> Self {
        Self {
            package_root: package_root.into(),
            fallback_name: fallback_name.into(),
            root: None,
        }
    }

    /// The root command, constructing it on first access.
    pub fn root(&mut self) -> &mut Command {
        &mut self.initialized().1
    }

    pub fn identity(&mut self) -> RootIdentity {
        self.initialized().0.clone()
    }

    /// Returns true if a module named `name` is mounted.
    pub fn contains(&mut self, name: &str) -> bool {
        self.root().has_command(name)
    }

    /// Mounts `command` under `module`.
    ///
    /// A command already named after its module is mounted as is; any other
    /// command is nested in a group carrying the module name.
    pub fn add_command(&mut self, module: &str, command: Box<dyn CommandLike>) -> Registration {
        let root = self.root();
        if root.has_command(module) {
            return Registration::Duplicate;
        }

        if command.name() == module {
            root.add_command(command);
        } else {
            let mut group = Command::new(module);
            group.add_command(command);
            root.add_command(Box::new(group));
        }

        Registration::Registered
    }

    /// Mounted module names in mounting order.
    pub fn module_names(&mut self) -> Vec<String> {
        self.root().command_names()
    }

    fn initialized(&mut self) -> &mut (RootIdentity, Command) {
        let package_root = &self.package_root;
        let fallback_name = &self.fallback_name;

        self.root.get_or_insert_with(|| {
            let identity = read_identity(package_root, fallback_name);
            let root = Command::new(identity.name.clone())
                .with_about(format!("Runs {} related commands", identity.name))
                .with_version(identity.version.clone())
                .with_help_command();
            (identity, root)
        })
    }
}

fn read_identity(package_root: &Path, fallback_name: &str) -> RootIdentity {
    match PackageMetadata::read(package_root) {
        Ok(meta) => RootIdentity {
            name: meta.unscoped_name().to_string(),
            version: meta.version,
        },
        Err(e) => {
            debug!(error = %e, "no package descriptor, using defaults for the root command");
            RootIdentity {
                name: fallback_name.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            }
        }
    }
}
