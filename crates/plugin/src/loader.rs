//! Loading module entry files into [`PluginEntry`] values.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::entry::{PluginEntry, Produced};
use crate::error::{PluginError, Result};
use crate::manifest::ModuleManifest;

/// Key under which a wrapped document carries its export.
pub const DEFAULT_EXPORT: &str = "default";

/// Turns a module path into a normalized entry.
#[async_trait]
pub trait ModuleLoader: Send + Sync {
    async fn load(&self, path: &Path) -> Result<PluginEntry>;
}

/// Loads declarative manifests from `.json` and `.toml` files.
#[derive(Debug, Default, Clone, Copy)]
pub struct ManifestLoader;

impl ManifestLoader {
    pub fn new() -> Self {
        Self
    }

    /// Parses manifest text, picking the format from the path's extension.
    pub fn parse(path: &Path, content: &str) -> Result<ModuleManifest> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => {
                let value: serde_json::Value =
                    serde_json::from_str(content).map_err(|e| PluginError::load(path, e))?;
                from_json_value(path, unwrap_json_default(value))
            }
            Some("toml") => {
                let value: toml::Value =
                    toml::from_str(content).map_err(|e| PluginError::load(path, e))?;
                from_toml_value(path, unwrap_toml_default(value))
            }
            other => Err(PluginError::load(
                path,
                format!("unsupported module extension {:?}", other.unwrap_or("")),
            )),
        }
    }

    /// Wraps a parsed manifest as a factory entry.
    pub fn entry(manifest: ModuleManifest, working_dir: PathBuf) -> PluginEntry {
        let name = manifest.name.clone();
        let manifest = Arc::new(manifest);

        PluginEntry::factory(name, move || {
            Ok(Produced::Ready(Box::new(manifest.build(&working_dir))))
        })
    }
}

#[async_trait]
impl ModuleLoader for ManifestLoader {
    async fn load(&self, path: &Path) -> Result<PluginEntry> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| PluginError::load(path, e))?;

        let manifest = Self::parse(path, &content)?;
        let working_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(Self::entry(manifest, working_dir))
    }
}

/// Uses the `default` member of a wrapped document, or the document itself.
fn unwrap_json_default(value: serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(mut map) => match map.remove(DEFAULT_EXPORT) {
            Some(inner) => inner,
            None => serde_json::Value::Object(map),
        },
        other => other,
    }
}

fn unwrap_toml_default(value: toml::Value) -> toml::Value {
    match value {
        toml::Value::Table(mut table) => match table.remove(DEFAULT_EXPORT) {
            Some(inner) => inner,
            None => toml::Value::Table(table),
        },
        other => other,
    }
}

fn from_json_value(path: &Path, value: serde_json::Value) -> Result<ModuleManifest> {
    if !value.is_object() {
        return Err(not_a_command(path));
    }
    deserialize(path, serde_json::from_value(value))
}

fn from_toml_value(path: &Path, value: toml::Value) -> Result<ModuleManifest> {
    if !value.is_table() {
        return Err(not_a_command(path));
    }
    deserialize(path, value.try_into())
}

fn deserialize<T: DeserializeOwned, E: std::fmt::Display>(
    path: &Path,
    result: std::result::Result<T, E>,
) -> Result<T> {
    result.map_err(|e| PluginError::validation(path.display().to_string(), e))
}

fn not_a_command(path: &Path) -> PluginError {
    PluginError::validation(
        path.display().to_string(),
        "export is neither a factory nor a command",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use plexus_core::CommandLike;
    use std::fs;
    use tempfile::tempdir;

    async fn build(entry: PluginEntry) -> Box<dyn CommandLike> {
        match entry {
            PluginEntry::Factory { factory, .. } => factory().unwrap().resolve().await.unwrap(),
            PluginEntry::Mutator(_) => panic!("manifests load as factories"),
        }
    }

    #[tokio::test]
    async fn test_load_bare_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cli-module.json");
        fs::write(&path, r#"{ "name": "test", "commands": [{ "name": "run" }] }"#).unwrap();

        let entry = ManifestLoader::new().load(&path).await.unwrap();
        assert_eq!(entry.declared_name(), Some("test"));

        let command = build(entry).await;
        assert!(command.has_command("run"));
    }

    #[tokio::test]
    async fn test_load_default_wrapped_toml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cli-module.toml");
        fs::write(
            &path,
            r#"
[default]
name = "wrapped"
description = "From a default export"

[[default.commands]]
name = "hello"
action = { print = "hi" }
"#,
        )
        .unwrap();

        let entry = ManifestLoader::new().load(&path).await.unwrap();
        assert_eq!(entry.declared_name(), Some("wrapped"));
        assert!(build(entry).await.has_command("hello"));
    }

    #[tokio::test]
    async fn test_missing_file_is_load_error() {
        let err = ManifestLoader::new()
            .load(Path::new("/definitely/not/here/cli-module.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, PluginError::Load { .. }));
    }

    #[test]
    fn test_syntax_error_is_load_error() {
        let err = ManifestLoader::parse(Path::new("cli-module.json"), "{ nope").unwrap_err();
        assert!(matches!(err, PluginError::Load { .. }));
    }

    #[test]
    fn test_unknown_extension_is_load_error() {
        let err = ManifestLoader::parse(Path::new("cli-module.yaml"), "name: x").unwrap_err();
        assert!(matches!(err, PluginError::Load { .. }));
    }

    #[test]
    fn test_non_object_is_validation_error() {
        for content in ["42", "[1, 2]", r#""demo""#, r#"{ "default": 7 }"#] {
            let err = ManifestLoader::parse(Path::new("cli-module.json"), content).unwrap_err();
            assert!(matches!(err, PluginError::Validation { .. }), "{}", content);
        }
    }

    #[test]
    fn test_wrong_shape_is_validation_error() {
        let err = ManifestLoader::parse(Path::new("cli-module.json"), r#"{ "description": "no name" }"#)
            .unwrap_err();
        assert!(matches!(err, PluginError::Validation { .. }));
    }
}
