//! Command tree abstraction and its clap-backed implementation.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use clap::error::ErrorKind;
use clap::{Arg, ArgAction, ArgMatches};

use crate::action::{Action, Invocation};
use crate::error::{CoreError, Result};
use crate::output::Output;

/// Name of the built-in help subcommand.
pub const HELP_COMMAND: &str = "help";

/// Names clap reserves for its own flags.
const RESERVED_IDS: [&str; 2] = ["help", "version"];
const RESERVED_SHORTS: [char; 2] = ['h', 'V'];

/// Execution context shared by every command of a tree.
#[derive(Clone)]
pub struct Context {
    output: Arc<dyn Output>,
}

impl Context {
    pub fn new(output: Arc<dyn Output>) -> Self {
        Self { output }
    }

    pub fn output(&self) -> &Arc<dyn Output> {
        &self.output
    }
}

/// Result of parsing and executing an argument vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A command action ran. `path` lists names from the root down.
    Executed { path: Vec<String> },

    /// Help was requested; holds the rendered text.
    Help(String),

    /// The version was requested; holds the rendered text.
    Version(String),
}

impl Outcome {
    /// Text to display for help and version outcomes.
    pub fn text(&self) -> Option<&str> {
        match self {
            Outcome::Help(text) | Outcome::Version(text) => Some(text),
            Outcome::Executed { .. } => None,
        }
    }
}

/// Minimal capability set of a mountable command.
#[async_trait]
pub trait CommandLike: Send + Sync {
    fn name(&self) -> &str;

    /// Attaches a sub-command.
    fn add_command(&mut self, command: Box<dyn CommandLike>);

    fn has_command(&self, name: &str) -> bool;

    /// Names of the direct sub-commands, in attachment order.
    fn command_names(&self) -> Vec<String>;

    /// Builds the clap definition of this command and its sub-commands.
    fn definition(&self) -> clap::Command;

    /// Checks the tree for definitions clap would reject.
    fn validate(&self) -> Result<()> {
        Ok(())
    }

    /// Runs the command selected by `matches`. `path` holds the ancestors' names.
    async fn dispatch(
        &self,
        matches: &ArgMatches,
        path: Vec<String>,
        ctx: &Context,
    ) -> Result<Outcome>;

    /// Parses `args` (binary name first) and executes the selected command.
    async fn parse_async(&self, args: Vec<String>, ctx: &Context) -> Result<Outcome> {
        let matches = match self.definition().try_get_matches_from(args) {
            Ok(matches) => matches,
            Err(err) => {
                let text = err.render().to_string();
                return match err.kind() {
                    ErrorKind::DisplayHelp
                    | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => Ok(Outcome::Help(text)),
                    ErrorKind::DisplayVersion => Ok(Outcome::Version(text)),
                    _ => Err(CoreError::Usage(text)),
                };
            }
        };

        self.dispatch(&matches, Vec::new(), ctx).await
    }
}

/// A positional argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgSpec {
    pub name: String,
    pub description: Option<String>,
    pub required: bool,

    /// Accepts one or more values.
    pub variadic: bool,
}

impl ArgSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            required: false,
            variadic: false,
        }
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn variadic(mut self, variadic: bool) -> Self {
        self.variadic = variadic;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    fn to_clap(&self) -> Arg {
        let mut arg = Arg::new(self.name.clone()).required(self.required);
        if self.variadic {
            arg = arg.num_args(1..);
        }
        if let Some(description) = &self.description {
            arg = arg.help(description.clone());
        }
        arg
    }
}

/// A named option, either a flag or a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionSpec {
    pub name: String,
    pub short: Option<char>,
    pub description: Option<String>,

    /// Takes a value instead of being a flag.
    pub takes_value: bool,

    pub default: Option<String>,
}

impl OptionSpec {
    /// Creates a boolean flag.
    pub fn flag(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            short: None,
            description: None,
            takes_value: false,
            default: None,
        }
    }

    /// Creates an option taking a value.
    pub fn value(name: impl Into<String>) -> Self {
        Self {
            takes_value: true,
            ..Self::flag(name)
        }
    }

    pub fn with_short(mut self, short: char) -> Self {
        self.short = Some(short);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    fn to_clap(&self) -> Arg {
        let mut arg = Arg::new(self.name.clone()).long(self.name.clone());
        if let Some(short) = self.short {
            arg = arg.short(short);
        }
        if let Some(description) = &self.description {
            arg = arg.help(description.clone());
        }
        if self.takes_value {
            arg = arg.action(ArgAction::Set);
            if let Some(default) = &self.default {
                arg = arg.default_value(default.clone());
            }
        } else {
            arg = arg.action(ArgAction::SetTrue);
        }
        arg
    }
}

/// Concrete command node.
#[derive(Clone, Default)]
pub struct Command {
    name: String,
    about: Option<String>,
    version: Option<String>,
    args: Vec<ArgSpec>,
    options: Vec<OptionSpec>,
    subcommands: Vec<Arc<dyn CommandLike>>,
    action: Option<Arc<dyn Action>>,

    /// Adds a `help [command]` sub-command.
    help_command: bool,
}

impl Command {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_about(mut self, about: impl Into<String>) -> Self {
        self.about = Some(about.into());
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_arg(mut self, arg: ArgSpec) -> Self {
        self.args.push(arg);
        self
    }

    pub fn with_option(mut self, option: OptionSpec) -> Self {
        self.options.push(option);
        self
    }

    pub fn with_subcommand(mut self, command: impl CommandLike + 'static) -> Self {
        self.subcommands.push(Arc::new(command));
        self
    }

    pub fn with_action<F, Fut>(mut self, action: F) -> Self
    where
        F: Fn(Invocation) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.action = Some(Arc::new(action));
        self
    }

    /// Like [`Command::with_action`], for handler types.
    pub fn with_handler(mut self, handler: impl Action + 'static) -> Self {
        self.action = Some(Arc::new(handler));
        self
    }

    /// Enables the built-in `help [command]` sub-command.
    pub fn with_help_command(mut self) -> Self {
        self.help_command = true;
        self
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn set_about(&mut self, about: impl Into<String>) {
        self.about = Some(about.into());
    }

    pub fn push_arg(&mut self, arg: ArgSpec) {
        self.args.push(arg);
    }

    pub fn push_option(&mut self, option: OptionSpec) {
        self.options.push(option);
    }

    pub fn set_action<F, Fut>(&mut self, action: F)
    where
        F: Fn(Invocation) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.action = Some(Arc::new(action));
    }

    pub fn about(&self) -> Option<&str> {
        self.about.as_deref()
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Renders help for this command, or for the named direct sub-command.
    pub fn render_help(&self, target: Option<&str>) -> Result<String> {
        let mut definition = self.definition();
        definition.build();

        match target {
            None => Ok(definition.render_help().to_string()),
            Some(name) => definition
                .find_subcommand_mut(name)
                .map(|sub| sub.render_help().to_string())
                .ok_or_else(|| CoreError::UnknownCommand(name.to_string())),
        }
    }

    fn invocation(&self, matches: &ArgMatches, path: Vec<String>, ctx: &Context) -> Invocation {
        let mut invocation = Invocation {
            path,
            args: Default::default(),
            options: Default::default(),
            output: Arc::clone(ctx.output()),
        };

        for arg in &self.args {
            let value = if arg.variadic {
                matches
                    .get_many::<String>(&arg.name)
                    .map(|values| values.cloned().collect::<Vec<_>>().join(" "))
            } else {
                matches.get_one::<String>(&arg.name).cloned()
            };
            if let Some(value) = value {
                invocation.args.insert(arg.name.clone(), value);
            }
        }

        for option in &self.options {
            if option.takes_value {
                if let Some(value) = matches.get_one::<String>(&option.name) {
                    invocation.options.insert(option.name.clone(), value.clone());
                }
            } else {
                let set = matches.get_flag(&option.name);
                invocation.options.insert(option.name.clone(), set.to_string());
            }
        }

        invocation
    }

    fn validate_node(&self) -> Result<()> {
        validate_name(&self.name, &self.name)?;

        let mut ids = HashSet::new();
        let arg_names = self.args.iter().map(|a| &a.name);
        let option_names = self.options.iter().map(|o| &o.name);
        for id in arg_names.chain(option_names) {
            validate_name(&self.name, id)?;
            if RESERVED_IDS.contains(&id.as_str()) {
                return Err(CoreError::invalid(&self.name, format!("'{}' is reserved", id)));
            }
            if !ids.insert(id.as_str()) {
                return Err(CoreError::invalid(&self.name, format!("duplicate argument '{}'", id)));
            }
        }

        let mut shorts = HashSet::new();
        for short in self.options.iter().filter_map(|o| o.short) {
            // clap panics on these when the parser is built.
            if short == '-' || (!short.is_ascii_graphic() && !short.is_alphanumeric()) {
                return Err(CoreError::invalid(&self.name, format!("'{}' is not a valid short flag", short)));
            }
            if RESERVED_SHORTS.contains(&short) || !shorts.insert(short) {
                return Err(CoreError::invalid(&self.name, format!("short flag '-{}' is taken", short)));
            }
        }

        // A variadic positional swallows everything after it.
        if let Some(pos) = self.args.iter().position(|a| a.variadic) {
            if pos + 1 != self.args.len() {
                return Err(CoreError::invalid(&self.name, "only the last argument may be variadic"));
            }
        }

        let mut children = HashSet::new();
        for child in &self.subcommands {
            if child.name() == HELP_COMMAND {
                return Err(CoreError::invalid(&self.name, "'help' is a reserved command name"));
            }
            if !children.insert(child.name()) {
                return Err(CoreError::invalid(&self.name, format!("duplicate command '{}'", child.name())));
            }
            child.validate()?;
        }

        Ok(())
    }
}

fn validate_name(command: &str, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(CoreError::invalid(command, "empty name"));
    }
    if name.starts_with('-') || name.chars().any(char::is_whitespace) {
        return Err(CoreError::invalid(command, format!("'{}' is not a valid name", name)));
    }
    Ok(())
}

fn help_definition() -> clap::Command {
    clap::Command::new(HELP_COMMAND)
        .about("display help for command")
        .arg(Arg::new("command").value_name("command"))
}

#[async_trait]
impl CommandLike for Command {
    fn name(&self) -> &str {
        &self.name
    }

    fn add_command(&mut self, command: Box<dyn CommandLike>) {
        self.subcommands.push(Arc::from(command));
    }

    fn has_command(&self, name: &str) -> bool {
        self.subcommands.iter().any(|c| c.name() == name)
    }

    fn command_names(&self) -> Vec<String> {
        self.subcommands.iter().map(|c| c.name().to_string()).collect()
    }

    fn definition(&self) -> clap::Command {
        let mut cmd = clap::Command::new(self.name.clone());

        if let Some(about) = &self.about {
            cmd = cmd.about(about.clone());
        }
        if let Some(version) = &self.version {
            cmd = cmd.version(version.clone());
        }
        for arg in &self.args {
            cmd = cmd.arg(arg.to_clap());
        }
        for option in &self.options {
            cmd = cmd.arg(option.to_clap());
        }
        for child in &self.subcommands {
            cmd = cmd.subcommand(child.definition());
        }
        if self.help_command {
            cmd = cmd
                .disable_help_subcommand(true)
                .subcommand(help_definition());
        }

        cmd
    }

    fn validate(&self) -> Result<()> {
        self.validate_node()
    }

    async fn dispatch(
        &self,
        matches: &ArgMatches,
        mut path: Vec<String>,
        ctx: &Context,
    ) -> Result<Outcome> {
        path.push(self.name.clone());

        if let Some((name, sub_matches)) = matches.subcommand() {
            if let Some(child) = self.subcommands.iter().find(|c| c.name() == name) {
                return child.dispatch(sub_matches, path, ctx).await;
            }
            if self.help_command && name == HELP_COMMAND {
                let target = sub_matches.get_one::<String>("command").map(|s| s.as_str());
                return self.render_help(target).map(Outcome::Help);
            }
            return Err(CoreError::UnknownCommand(name.to_string()));
        }

        match &self.action {
            Some(action) => {
                let invocation = self.invocation(matches, path.clone(), ctx);
                action.call(invocation).await?;
                Ok(Outcome::Executed { path })
            }
            // A pure group shows its help when invoked on its own.
            None => self.render_help(None).map(Outcome::Help),
        }
    }
}
