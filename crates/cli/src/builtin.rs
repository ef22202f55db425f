//! The built-in `utils` module.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use clap::ValueEnum;
use plexus_core::{Command, CoreError, Invocation, OptionSpec, PackageMetadata};
use plexus_plugin::PluginEntry;
use tracing::debug;

use crate::config::Settings;
use crate::output;

pub const MODULE_NAME: &str = "utils";

/// How a utility prints its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
enum Format {
    /// Styled lines for a terminal.
    #[default]
    #[value(skip)]
    Pretty,
    Json,
    Raw,
}

impl Format {
    fn from_invocation(invocation: &Invocation) -> plexus_core::Result<Self> {
        match invocation.option("format") {
            None => Ok(Format::Pretty),
            Some(value) => Format::from_str(value, true).map_err(|_| {
                CoreError::Usage(format!(
                    "invalid value '{}' for '--format <format>' [possible values: json, raw]",
                    value
                ))
            }),
        }
    }
}

fn format_option() -> OptionSpec {
    OptionSpec::value("format").with_description("additional output formats (json, raw)")
}

/// The `utils` module entry, reporting on `settings`.
pub fn utils(settings: Arc<Settings>) -> PluginEntry {
    PluginEntry::ready(MODULE_NAME, move || command(settings.clone()))
}

fn command(settings: Arc<Settings>) -> Command {
    let libraries_settings = settings.clone();

    Command::new(MODULE_NAME)
        .with_about("Utility commands for Plexus workspaces")
        .with_subcommand(
            Command::new("libraries")
                .with_about("Outputs the installed Plexus packages and their versions")
                .with_option(format_option())
                .with_action(move |invocation| {
                    let sibling_dir = libraries_settings.sibling_path();
                    async move { libraries(&sibling_dir, &invocation) }
                }),
        )
        .with_subcommand(
            Command::new("environment-export")
                .with_about("Outputs the currently enforced environment")
                .with_option(format_option())
                .with_action(move |invocation| {
                    let settings = settings.clone();
                    async move { environment_export(&settings, &invocation) }
                }),
        )
}

/// Sibling packages by full name, with their versions.
pub fn installed_packages(sibling_dir: &Path) -> BTreeMap<String, String> {
    let mut packages = BTreeMap::new();

    let entries = match fs::read_dir(sibling_dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!(dir = %sibling_dir.display(), error = %e, "no sibling packages");
            return packages;
        }
    };

    for entry in entries.filter_map(|e| e.ok()) {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        match PackageMetadata::read(&path) {
            Ok(meta) => {
                packages.insert(meta.name, meta.version);
            }
            Err(e) => debug!(error = %e, "skipping package"),
        }
    }

    packages
}

fn libraries(sibling_dir: &Path, invocation: &Invocation) -> plexus_core::Result<()> {
    let format = Format::from_invocation(invocation)?;
    let packages = installed_packages(sibling_dir);
    let out = &invocation.output;

    match format {
        Format::Json => out.block(&to_json(invocation, &packages)?),
        Format::Raw => {
            for (name, version) in &packages {
                out.line(&format!("{}: {}", name, version));
            }
        }
        Format::Pretty => {
            for (name, version) in &packages {
                out.line(&output::key_value(name, version));
            }
        }
    }

    Ok(())
}

fn environment_export(settings: &Settings, invocation: &Invocation) -> plexus_core::Result<()> {
    let format = Format::from_invocation(invocation)?;
    let out = &invocation.output;

    if format == Format::Json {
        out.block(&to_json(invocation, settings)?);
        return Ok(());
    }

    let pairs = settings
        .env_pairs()
        .map_err(|e| failure(invocation, e.to_string()))?;
    for (key, value) in pairs {
        match format {
            Format::Raw => out.line(&format!("{}={}", key, value)),
            _ => out.line(&output::key_value(&key, &value)),
        }
    }

    Ok(())
}

fn to_json<T: serde::Serialize>(invocation: &Invocation, value: &T) -> plexus_core::Result<String> {
    serde_json::to_string_pretty(value)
        .map(|json| format!("{}\n", json))
        .map_err(|e| failure(invocation, e.to_string()))
}

fn failure(invocation: &Invocation, reason: String) -> CoreError {
    CoreError::ActionFailed {
        command: invocation.command().to_string(),
        exit_code: None,
        reason,
    }
}
