//! Plexus Core - Command types and traits shared by the Plexus crates.

mod action;
mod command;
mod error;
pub mod interpolation;
mod output;
mod package;

pub use action::{Action, Invocation};
pub use command::{ArgSpec, Command, CommandLike, Context, HELP_COMMAND, OptionSpec, Outcome};
pub use error::{CoreError, Result};
pub use interpolation::{InterpolationContext, interpolate};
pub use output::{BufferedOutput, Output, StdOutput};
pub use package::{DESCRIPTOR_FILE, PackageMetadata, unscoped};
