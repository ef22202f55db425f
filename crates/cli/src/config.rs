//! Layered settings: defaults, then the config file, then the environment.

use std::path::{Path, PathBuf};
use std::time::Duration;

use miette::{Result, miette};
use plexus_engine::{
    Animation, DEFAULT_CRAWL_DEPTH, DEFAULT_PACKAGE_ID, DEFAULT_SIBLING_DIR, EngineConfig,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Prefix of every environment key read or exported.
pub const ENV_PREFIX: &str = "PLEXUS_";

/// Separator between nested environment key segments.
pub const ENV_SEPARATOR: &str = "__";

/// Effective settings of one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Host package root.
    pub root: PathBuf,

    /// Crawl start, when it differs from `root`.
    pub module_root: Option<PathBuf>,

    pub crawl_depth: i32,

    /// The engine's own package, never loaded as a module.
    pub package_id: String,

    /// Sibling package directory, relative to `root`.
    pub sibling_dir: PathBuf,

    pub banner: BannerSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BannerSettings {
    pub enabled: bool,
    pub interval_ms: u64,
    pub max_duration_ms: u64,
}

impl Default for BannerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: 80,
            max_duration_ms: 3000,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::new(".")
    }
}

impl Settings {
    /// Default settings rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            module_root: None,
            crawl_depth: DEFAULT_CRAWL_DEPTH,
            package_id: DEFAULT_PACKAGE_ID.to_string(),
            sibling_dir: PathBuf::from(DEFAULT_SIBLING_DIR),
            banner: BannerSettings::default(),
        }
    }

    /// Applies every layer on top of the defaults for `root`.
    pub fn load<F>(root: impl Into<PathBuf>, config_file: Option<&Path>, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::new(root);
        if let Some(path) = config_file {
            settings = settings.merge_file(path)?;
        }
        settings.apply_env(env)?.checked()
    }

    fn checked(self) -> Result<Self> {
        if self.banner.interval_ms == 0 {
            return Err(miette!(
                "banner.interval_ms ({}BANNER{}INTERVAL_MS) must be greater than zero",
                ENV_PREFIX,
                ENV_SEPARATOR
            ));
        }
        Ok(self)
    }

    /// Overlays a TOML config file. A missing file changes nothing.
    pub fn merge_file(self, path: &Path) -> Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(self),
            Err(e) => return Err(miette!("Failed to read {}: {}", path.display(), e)),
        };

        let overlay: Value = toml::from_str(&content)
            .map_err(|e| miette!("Invalid config file {}: {}", path.display(), e))?;

        let mut value = self.to_value()?;
        merge(&mut value, overlay);
        Self::from_value(value).map_err(|e| miette!("Invalid config file {}: {}", path.display(), e))
    }

    /// Overlays `PLEXUS_*` variables, one per flattened setting key.
    pub fn apply_env<F>(self, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut value = self.to_value()?;
        overlay_env(&mut value, ENV_PREFIX, &env)?;
        Self::from_value(value).map_err(|e| miette!("Invalid environment configuration: {}", e))
    }

    /// Flattened `PLEXUS_KEY` / value pairs, sorted by key within each table.
    pub fn env_pairs(&self) -> Result<Vec<(String, String)>> {
        let mut pairs = Vec::new();
        flatten(&self.to_value()?, ENV_PREFIX, &mut pairs);
        Ok(pairs)
    }

    pub fn engine_config(&self) -> EngineConfig {
        let mut config = EngineConfig::new(&self.root)
            .with_crawl_depth(self.crawl_depth)
            .with_banner(self.banner.enabled)
            .with_package_id(self.package_id.clone())
            .with_sibling_dir(&self.sibling_dir);
        if let Some(module_root) = &self.module_root {
            config = config.with_module_root(self.root.join(module_root));
        }
        config
    }

    pub fn animation(&self) -> Animation {
        Animation::new(
            Duration::from_millis(self.banner.interval_ms),
            Duration::from_millis(self.banner.max_duration_ms),
        )
    }

    /// Absolute sibling package directory.
    pub fn sibling_path(&self) -> PathBuf {
        self.root.join(&self.sibling_dir)
    }

    pub fn to_value(&self) -> Result<Value> {
        serde_json::to_value(self).map_err(|e| miette!("Failed to serialize settings: {}", e))
    }

    fn from_value(value: Value) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}

/// Deep-merges `overlay` into `base`; tables merge, everything else replaces.
fn merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

fn env_key(prefix: &str, key: &str) -> String {
    format!("{}{}", prefix, key.to_uppercase())
}

fn nested(full: &str) -> String {
    format!("{}{}", full, ENV_SEPARATOR)
}

fn flatten(value: &Value, prefix: &str, pairs: &mut Vec<(String, String)>) {
    let Value::Object(map) = value else {
        return;
    };

    for (key, value) in map {
        let full = env_key(prefix, key);
        match value {
            Value::Object(_) => flatten(value, &nested(&full), pairs),
            Value::Null => pairs.push((full, String::new())),
            Value::String(s) => pairs.push((full, s.clone())),
            other => pairs.push((full, other.to_string())),
        }
    }
}

fn overlay_env<F>(value: &mut Value, prefix: &str, env: &F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let Value::Object(map) = value else {
        return Ok(());
    };

    for (key, slot) in map.iter_mut() {
        let full = env_key(prefix, key);
        if slot.is_object() {
            overlay_env(slot, &nested(&full), env)?;
            continue;
        }

        if let Some(raw) = env(&full) {
            *slot = parse_env_value(&full, slot, &raw)?;
        }
    }

    Ok(())
}

/// Parses `raw` into the JSON type of the setting it replaces.
fn parse_env_value(key: &str, current: &Value, raw: &str) -> Result<Value> {
    let invalid = |expected: &str| miette!("{} must be {}, got {:?}", key, expected, raw);

    match current {
        Value::Bool(_) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(Value::Bool(true)),
            "0" | "false" | "no" | "off" => Ok(Value::Bool(false)),
            _ => Err(invalid("a boolean")),
        },
        Value::Number(_) => raw
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| invalid("an integer")),
        _ if raw.is_empty() => Ok(Value::Null),
        _ => Ok(Value::String(raw.to_string())),
    }
}
