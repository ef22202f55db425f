//! Declarative module manifests.
//!
//! A manifest describes one command node: its arguments, options, nested
//! commands and the action run when it is invoked. The top-level node's
//! `name` is the name the module registers under.

use std::path::{Path, PathBuf};

use futures::future::BoxFuture;
use plexus_core::interpolation::{interpolate, interpolate_vec};
use plexus_core::{Action, ArgSpec, Command, CoreError, Invocation, OptionSpec};
use serde::Deserialize;

use crate::runner::{ProcessOutput, ProcessRunner};

/// A command node as written in a module file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CommandManifest {
    /// Command name.
    pub name: String,

    /// Help text.
    #[serde(default)]
    pub description: Option<String>,

    /// Version shown by `--version` on this command.
    #[serde(default)]
    pub version: Option<String>,

    /// Positional arguments.
    #[serde(default)]
    pub args: Vec<ArgManifest>,

    /// Named options.
    #[serde(default)]
    pub options: Vec<OptionManifest>,

    /// Nested commands.
    #[serde(default)]
    pub commands: Vec<CommandManifest>,

    /// Action run when this command is invoked.
    #[serde(default)]
    pub action: Option<ActionManifest>,
}

/// The top-level node of a module file.
pub type ModuleManifest = CommandManifest;

/// A positional argument.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ArgManifest {
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub required: bool,

    #[serde(default)]
    pub variadic: bool,
}

/// A named option.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OptionManifest {
    pub name: String,

    #[serde(default)]
    pub short: Option<char>,

    #[serde(default)]
    pub description: Option<String>,

    /// Takes a value. Options without one are flags.
    #[serde(default)]
    pub value: bool,

    #[serde(default)]
    pub default: Option<String>,
}

/// What a command does when invoked.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionManifest {
    /// Writes the interpolated template as one output line.
    Print(String),

    /// Runs the interpolated command through the platform shell.
    Run(String),

    /// Runs a program with interpolated arguments, without a shell.
    Exec {
        program: String,
        #[serde(default)]
        args: Vec<String>,
    },
}

impl CommandManifest {
    /// Builds the command tree. Processes run in `working_dir`.
    pub fn build(&self, working_dir: &Path) -> Command {
        let mut command = Command::new(self.name.clone());

        if let Some(description) = &self.description {
            command = command.with_about(description.clone());
        }
        if let Some(version) = &self.version {
            command = command.with_version(version.clone());
        }
        for arg in &self.args {
            command = command.with_arg(arg.to_spec());
        }
        for option in &self.options {
            command = command.with_option(option.to_spec());
        }
        for child in &self.commands {
            command = command.with_subcommand(child.build(working_dir));
        }
        if let Some(action) = &self.action {
            command = command.with_handler(ManifestAction {
                action: action.clone(),
                working_dir: working_dir.to_path_buf(),
                runner: ProcessRunner::new(),
            });
        }

        command
    }
}

impl ArgManifest {
    fn to_spec(&self) -> ArgSpec {
        let mut spec = ArgSpec::new(self.name.clone())
            .required(self.required)
            .variadic(self.variadic);
        if let Some(description) = &self.description {
            spec = spec.with_description(description.clone());
        }
        spec
    }
}

impl OptionManifest {
    fn to_spec(&self) -> OptionSpec {
        let mut spec = if self.value {
            OptionSpec::value(self.name.clone())
        } else {
            OptionSpec::flag(self.name.clone())
        };
        if let Some(short) = self.short {
            spec = spec.with_short(short);
        }
        if let Some(description) = &self.description {
            spec = spec.with_description(description.clone());
        }
        if let Some(default) = &self.default {
            spec = spec.with_default(default.clone());
        }
        spec
    }
}

/// Runs an [`ActionManifest`] for an invocation.
struct ManifestAction {
    action: ActionManifest,
    working_dir: PathBuf,
    runner: ProcessRunner,
}

impl Action for ManifestAction {
    fn call(&self, invocation: Invocation) -> BoxFuture<'static, plexus_core::Result<()>> {
        Box::pin(execute(
            self.action.clone(),
            self.working_dir.clone(),
            self.runner.clone(),
            invocation,
        ))
    }
}

async fn execute(
    action: ActionManifest,
    working_dir: PathBuf,
    runner: ProcessRunner,
    invocation: Invocation,
) -> plexus_core::Result<()> {
    let ctx = invocation.interpolation_context();

    let output = match &action {
        ActionManifest::Print(template) => {
            invocation.output.line(&interpolate(template, &ctx)?);
            return Ok(());
        }
        ActionManifest::Run(template) => {
            let command = interpolate(template, &ctx)?;
            runner.run_shell(&command, &working_dir).await?
        }
        ActionManifest::Exec { program, args } => {
            let args = interpolate_vec(args, &ctx)?;
            runner.run_program(program, &args, &working_dir).await?
        }
    };

    forward(&invocation, &output);

    if output.success() {
        Ok(())
    } else {
        Err(CoreError::ActionFailed {
            command: invocation.command().to_string(),
            exit_code: Some(output.exit_code),
            reason: failure_reason(&output),
        })
    }
}

fn forward(invocation: &Invocation, output: &ProcessOutput) {
    for line in output.stdout.lines() {
        invocation.output.line(line);
    }
    for line in output.stderr.lines() {
        invocation.output.error(line);
    }
}

fn failure_reason(output: &ProcessOutput) -> String {
    let stderr = output.stderr.trim();
    if stderr.is_empty() {
        format!("exited with status {}", output.exit_code)
    } else {
        stderr.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plexus_core::{BufferedOutput, CommandLike, Context, Outcome};
    use std::sync::Arc;

    const DEMO: &str = r#"{
        "name": "demo",
        "description": "Demo commands",
        "commands": [
            {
                "name": "command",
                "description": "A demo command",
                "args": [{ "name": "type", "required": true }],
                "options": [{ "name": "format", "short": "f", "value": true, "default": "text" }],
                "action": { "print": "executed demo command with type variable: ${arg.type} (${opt.format})" }
            }
        ]
    }"#;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    fn parse(json: &str) -> serde_json::Result<CommandManifest> {
        serde_json::from_str(json)
    }

    async fn run(manifest: &CommandManifest, args: &[&str]) -> (plexus_core::Result<Outcome>, BufferedOutput) {
        let out = BufferedOutput::new();
        let ctx = Context::new(Arc::new(out.clone()));
        let command = manifest.build(Path::new("."));
        (command.parse_async(argv(args), &ctx).await, out)
    }

    #[test]
    fn test_parse_manifest() {
        let manifest = parse(DEMO).unwrap();
        assert_eq!(manifest.name, "demo");
        assert_eq!(manifest.commands.len(), 1);

        let child = &manifest.commands[0];
        assert!(child.args[0].required);
        assert!(child.options[0].value);
        assert_eq!(child.options[0].short, Some('f'));
        assert!(matches!(child.action, Some(ActionManifest::Print(_))));
    }

    #[test]
    fn test_parse_exec_action() {
        let json = r#"{ "name": "ls", "action": { "exec": { "program": "ls", "args": ["-la"] } } }"#;
        let manifest = parse(json).unwrap();
        assert_eq!(
            manifest.action,
            Some(ActionManifest::Exec {
                program: "ls".to_string(),
                args: vec!["-la".to_string()],
            })
        );
    }

    #[test]
    fn test_build_produces_valid_tree() {
        let command = parse(DEMO).unwrap().build(Path::new("."));
        assert_eq!(command.name(), "demo");
        assert!(command.has_command("command"));
        assert!(command.validate().is_ok());
    }

    #[tokio::test]
    async fn test_print_action() {
        let manifest = parse(DEMO).unwrap();
        let (result, out) = run(&manifest, &["demo", "command", "entry", "-f", "json"]).await;

        assert!(result.is_ok());
        assert_eq!(
            out.lines(),
            vec!["executed demo command with type variable: entry (json)"]
        );
    }

    #[tokio::test]
    async fn test_undefined_reference_fails_at_runtime() {
        let json = r#"{ "name": "bad", "action": { "print": "${arg.nope}" } }"#;
        let manifest = parse(json).unwrap();
        let (result, _) = run(&manifest, &["bad"]).await;
        assert!(matches!(result, Err(CoreError::Interpolation { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_action_forwards_output() {
        let json = r#"{
            "name": "greet",
            "args": [{ "name": "who", "required": true }],
            "action": { "run": "echo hello ${arg.who}" }
        }"#;
        let manifest = parse(json).unwrap();
        let (result, out) = run(&manifest, &["greet", "world"]).await;

        assert!(result.is_ok());
        assert_eq!(out.lines(), vec!["hello world"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_action_failure() {
        let json = r#"{ "name": "boom", "action": { "run": "echo broken >&2; exit 3" } }"#;
        let manifest = parse(json).unwrap();
        let (result, out) = run(&manifest, &["boom"]).await;

        match result {
            Err(CoreError::ActionFailed { exit_code, reason, .. }) => {
                assert_eq!(exit_code, Some(3));
                assert_eq!(reason, "broken");
            }
            other => panic!("expected action failure, got {:?}", other),
        }
        assert_eq!(out.errors(), vec!["broken"]);
    }
}
