//! Template interpolation for command actions.
//!
//! Supports the following syntax:
//! - `${arg.name}` - A positional argument of the invoked command
//! - `${opt.name}` - An option value of the invoked command
//! - `${env.NAME}` - An environment variable
//! - `${command.name}` - The invoked command's name
//! - `$$` - Escaped literal `$`

use std::collections::HashMap;

use crate::error::{CoreError, Result};

/// Values available to a template.
#[derive(Debug, Clone, Default)]
pub struct InterpolationContext {
    args: HashMap<String, String>,
    options: HashMap<String, String>,
    command_name: Option<String>,
}

impl InterpolationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_arg(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.args.insert(name.into(), value.into());
        self
    }

    pub fn with_args(mut self, args: HashMap<String, String>) -> Self {
        self.args.extend(args);
        self
    }

    pub fn with_option(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(name.into(), value.into());
        self
    }

    pub fn with_options(mut self, options: HashMap<String, String>) -> Self {
        self.options.extend(options);
        self
    }

    pub fn with_command_name(mut self, name: impl Into<String>) -> Self {
        self.command_name = Some(name.into());
        self
    }

    pub fn get_arg(&self, name: &str) -> Option<&str> {
        self.args.get(name).map(|s| s.as_str())
    }

    pub fn get_option(&self, name: &str) -> Option<&str> {
        self.options.get(name).map(|s| s.as_str())
    }

    pub fn get_env(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }

    pub fn get_command_name(&self) -> Option<&str> {
        self.command_name.as_deref()
    }
}

/// Interpolates references in a template.
///
/// # Examples
/// ```
/// use plexus_core::interpolation::{interpolate, InterpolationContext};
///
/// let ctx = InterpolationContext::new()
///     .with_arg("type", "entry")
///     .with_command_name("command");
///
/// let result = interpolate("${command.name} got ${arg.type}", &ctx).unwrap();
/// assert_eq!(result, "command got entry");
/// ```
pub fn interpolate(input: &str, ctx: &InterpolationContext) -> Result<String> {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }

        match chars.peek() {
            Some('$') => {
                chars.next();
                result.push('$');
            }
            Some('{') => {
                chars.next();
                let reference = parse_reference(&mut chars)?;
                result.push_str(&resolve(&reference, ctx)?);
            }
            _ => result.push('$'),
        }
    }

    Ok(result)
}

/// Interpolates every template in a slice.
pub fn interpolate_vec(templates: &[String], ctx: &InterpolationContext) -> Result<Vec<String>> {
    templates.iter().map(|t| interpolate(t, ctx)).collect()
}

#[derive(Debug, Clone, PartialEq)]
enum Reference {
    Arg(String),
    Option(String),
    Environment(String),
    CommandName,
}

/// Parses a reference body. The opening `{` has already been consumed.
fn parse_reference(chars: &mut std::iter::Peekable<std::str::Chars>) -> Result<Reference> {
    let mut name = String::new();
    let mut closed = false;

    while let Some(&c) = chars.peek() {
        chars.next();
        if c == '}' {
            closed = true;
            break;
        } else if c.is_alphanumeric() || c == '_' || c == '-' || c == '.' {
            name.push(c);
        } else {
            return Err(CoreError::Interpolation {
                message: format!("Invalid character '{}' in reference", c),
            });
        }
    }

    if !closed {
        return Err(CoreError::Interpolation {
            message: format!("Unterminated reference '${{{}'", name),
        });
    }

    if name.is_empty() {
        return Err(CoreError::Interpolation {
            message: "Empty reference".to_string(),
        });
    }

    if let Some(arg) = name.strip_prefix("arg.") {
        Ok(Reference::Arg(arg.to_string()))
    } else if let Some(opt) = name.strip_prefix("opt.") {
        Ok(Reference::Option(opt.to_string()))
    } else if let Some(env) = name.strip_prefix("env.") {
        Ok(Reference::Environment(env.to_string()))
    } else if name == "command.name" {
        Ok(Reference::CommandName)
    } else {
        // Bare names refer to positional arguments.
        Ok(Reference::Arg(name))
    }
}

fn resolve(reference: &Reference, ctx: &InterpolationContext) -> Result<String> {
    let missing = |message: String| CoreError::Interpolation { message };

    match reference {
        Reference::Arg(name) => ctx
            .get_arg(name)
            .map(str::to_string)
            .ok_or_else(|| missing(format!("Undefined argument: {}", name))),
        Reference::Option(name) => ctx
            .get_option(name)
            .map(str::to_string)
            .ok_or_else(|| missing(format!("Undefined option: {}", name))),
        Reference::Environment(name) => ctx
            .get_env(name)
            .ok_or_else(|| missing(format!("Undefined environment variable: {}", name))),
        Reference::CommandName => ctx
            .get_command_name()
            .map(str::to_string)
            .ok_or_else(|| missing("Command name not available in this context".to_string())),
    }
}
