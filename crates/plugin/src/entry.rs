//! Normalized module exports.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use plexus_core::{Command, CommandLike};

/// What a factory hands back: a command, or a future resolving to one.
pub enum Produced {
    Ready(Box<dyn CommandLike>),
    Deferred(BoxFuture<'static, plexus_core::Result<Box<dyn CommandLike>>>),
}

impl Produced {
    /// Resolves the command, awaiting it if deferred.
    pub async fn resolve(self) -> plexus_core::Result<Box<dyn CommandLike>> {
        match self {
            Produced::Ready(command) => Ok(command),
            Produced::Deferred(future) => future.await,
        }
    }
}

/// Zero-argument command factory.
pub type Factory = Arc<dyn Fn() -> plexus_core::Result<Produced> + Send + Sync>;

/// One-argument function completing a fresh command in place.
pub type Mutator = Arc<dyn Fn(&mut Command) -> plexus_core::Result<()> + Send + Sync>;

/// The two module export conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportConvention {
    #[default]
    Factory,
    Mutator,
}

impl fmt::Display for ExportConvention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportConvention::Factory => write!(f, "factory"),
            ExportConvention::Mutator => write!(f, "mutator"),
        }
    }
}

/// A loaded module, resolved to exactly one export shape.
#[derive(Clone)]
pub enum PluginEntry {
    /// Builds the module's command. `name` is the sub-command name.
    Factory { name: String, factory: Factory },

    /// Completes a command handed to it, naming it as well.
    Mutator(Mutator),
}

impl PluginEntry {
    pub fn factory<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> plexus_core::Result<Produced> + Send + Sync + 'static,
    {
        PluginEntry::Factory {
            name: name.into(),
            factory: Arc::new(factory),
        }
    }

    /// Factory whose command is available immediately.
    pub fn ready<F, C>(name: impl Into<String>, build: F) -> Self
    where
        F: Fn() -> C + Send + Sync + 'static,
        C: CommandLike + 'static,
    {
        Self::factory(name, move || Ok(Produced::Ready(Box::new(build()))))
    }

    /// Factory whose command is produced asynchronously.
    pub fn deferred<F, Fut, C>(name: impl Into<String>, build: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = plexus_core::Result<C>> + Send + 'static,
        C: CommandLike + 'static,
    {
        Self::factory(name, move || {
            let future = build();
            Ok(Produced::Deferred(Box::pin(async move {
                let command = future.await?;
                Ok(Box::new(command) as Box<dyn CommandLike>)
            })))
        })
    }

    pub fn mutator<F>(mutate: F) -> Self
    where
        F: Fn(&mut Command) -> plexus_core::Result<()> + Send + Sync + 'static,
    {
        PluginEntry::Mutator(Arc::new(mutate))
    }

    pub fn convention(&self) -> ExportConvention {
        match self {
            PluginEntry::Factory { .. } => ExportConvention::Factory,
            PluginEntry::Mutator(_) => ExportConvention::Mutator,
        }
    }

    /// The declared name, known up front only for factories.
    pub fn declared_name(&self) -> Option<&str> {
        match self {
            PluginEntry::Factory { name, .. } => Some(name),
            PluginEntry::Mutator(_) => None,
        }
    }
}

impl fmt::Debug for PluginEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PluginEntry::Factory { name, .. } => f.debug_struct("Factory").field("name", name).finish(),
            PluginEntry::Mutator(_) => f.write_str("Mutator"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ready_factory_resolves() {
        let entry = PluginEntry::ready("demo", || Command::new("demo"));
        assert_eq!(entry.convention(), ExportConvention::Factory);
        assert_eq!(entry.declared_name(), Some("demo"));

        let PluginEntry::Factory { factory, .. } = entry else {
            panic!("expected factory");
        };
        let command = factory().unwrap().resolve().await.unwrap();
        assert_eq!(command.name(), "demo");
    }

    #[tokio::test]
    async fn test_deferred_factory_resolves() {
        let entry = PluginEntry::deferred("later", || async { Ok(Command::new("later")) });
        let PluginEntry::Factory { factory, .. } = entry else {
            panic!("expected factory");
        };

        let produced = factory().unwrap();
        assert!(matches!(produced, Produced::Deferred(_)));
        assert_eq!(produced.resolve().await.unwrap().name(), "later");
    }

    #[test]
    fn test_mutator_has_no_declared_name() {
        let entry = PluginEntry::mutator(|cmd| {
            cmd.set_name("mutated");
            Ok(())
        });
        assert_eq!(entry.convention(), ExportConvention::Mutator);
        assert!(entry.declared_name().is_none());
        assert_eq!(ExportConvention::Mutator.to_string(), "mutator");
    }
}
