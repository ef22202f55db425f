//! Command actions and the data handed to them.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::error::Result;
use crate::interpolation::InterpolationContext;
use crate::output::Output;

/// Everything an action receives when its command is invoked.
#[derive(Clone)]
pub struct Invocation {
    /// Names from the root down to the invoked command.
    pub path: Vec<String>,

    /// Positional arguments by name. Variadic values are space-joined.
    pub args: HashMap<String, String>,

    /// Option values by name. Flags are `"true"` or `"false"`.
    pub options: HashMap<String, String>,

    /// Where the action writes its output.
    pub output: Arc<dyn Output>,
}

impl Invocation {
    /// Name of the invoked command.
    pub fn command(&self) -> &str {
        self.path.last().map(|s| s.as_str()).unwrap_or_default()
    }

    pub fn arg(&self, name: &str) -> Option<&str> {
        self.args.get(name).map(|s| s.as_str())
    }

    pub fn option(&self, name: &str) -> Option<&str> {
        self.options.get(name).map(|s| s.as_str())
    }

    /// Returns true if a flag was passed.
    pub fn flag(&self, name: &str) -> bool {
        self.option(name) == Some("true")
    }

    /// Builds the template context for this invocation.
    pub fn interpolation_context(&self) -> InterpolationContext {
        InterpolationContext::new()
            .with_args(self.args.clone())
            .with_options(self.options.clone())
            .with_command_name(self.command())
    }
}

impl std::fmt::Debug for Invocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Invocation")
            .field("path", &self.path)
            .field("args", &self.args)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Handler run when a command is invoked.
pub trait Action: Send + Sync {
    fn call(&self, invocation: Invocation) -> BoxFuture<'static, Result<()>>;
}

impl<F, Fut> Action for F
where
    F: Fn(Invocation) -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    fn call(&self, invocation: Invocation) -> BoxFuture<'static, Result<()>> {
        Box::pin(self(invocation))
    }
}
