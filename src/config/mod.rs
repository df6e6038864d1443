//! Configuration management for `jira_views`.
//!
//! Configuration sources and precedence (highest wins):
//! 1. CLI overrides
//! 2. Environment variables (`JV_*`)
//! 3. User config (~/.config/jira-views/config.yaml)
//! 4. Defaults

use crate::error::{Result, ViewsError};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Directory under `$HOME/.config` holding config, preferences and cache.
const CONFIG_DIR_NAME: &str = "jira-views";
/// Default preferences filename.
const DEFAULT_PREFERENCES_FILENAME: &str = "preferences.json";
/// Default snapshot database filename.
const DEFAULT_CACHE_DB_FILENAME: &str = "cache.db";
/// Environment variable prefix.
const ENV_PREFIX: &str = "JV_";

/// Key for the preferences JSON blob path.
pub const PREFERENCES_PATH_KEY: &str = "preferences-path";
/// Key for the snapshot database path.
pub const CACHE_DB_KEY: &str = "cache-db";
/// Key for the log output format (`compact` or `json`).
pub const LOG_FORMAT_KEY: &str = "log-format";
/// Key for the `SQLite` busy timeout in milliseconds.
pub const LOCK_TIMEOUT_KEY: &str = "lock-timeout";

/// One configuration source, flattened to `key -> value`.
///
/// Keys are normalized to lowercase kebab-case, so `cache_db`, `CACHE_DB`
/// and `cache-db` all name the same setting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigLayer {
    pub values: HashMap<String, String>,
}

impl ConfigLayer {
    /// Merge another layer on top of this one (higher precedence wins).
    pub fn merge_from(&mut self, other: &Self) {
        for (key, value) in &other.values {
            self.values.insert(key.clone(), value.clone());
        }
    }

    /// Merge multiple layers in precedence order (lowest to highest).
    #[must_use]
    pub fn merge_layers(layers: &[Self]) -> Self {
        let mut merged = Self::default();
        for layer in layers {
            merged.merge_from(layer);
        }
        merged
    }

    /// Look up a value by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(&normalize_key(key)).map(String::as_str)
    }

    /// Set a value, normalizing the key.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.values.insert(normalize_key(key), value.into());
    }

    /// Build a layer from a YAML file path. Missing files return empty config.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn from_yaml(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)?;
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        let value: serde_yaml::Value = serde_yaml::from_str(&contents)?;
        Ok(layer_from_yaml_value(&value))
    }

    /// Build a layer from `JV_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_vars(env::vars())
    }

    /// Build a layer from `(name, value)` pairs, keeping `JV_*` names.
    ///
    /// `JV_LOG` and `JV_LOG_FORMAT` are read by the logger directly but are
    /// also kept here so `log-format` can come from either source.
    #[must_use]
    pub fn from_vars<I>(vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut layer = Self::default();
        for (key, value) in vars {
            if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                layer.set(stripped, value);
            }
        }
        layer
    }
}

/// CLI overrides for config loading (optional).
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub preferences: Option<PathBuf>,
    pub cache_db: Option<PathBuf>,
    pub json_logs: Option<bool>,
}

impl CliOverrides {
    #[must_use]
    pub fn as_layer(&self) -> ConfigLayer {
        let mut layer = ConfigLayer::default();

        if let Some(path) = &self.preferences {
            layer.set(PREFERENCES_PATH_KEY, path.to_string_lossy());
        }
        if let Some(path) = &self.cache_db {
            layer.set(CACHE_DB_KEY, path.to_string_lossy());
        }
        if let Some(json) = self.json_logs {
            layer.set(LOG_FORMAT_KEY, if json { "json" } else { "compact" });
        }

        layer
    }
}

/// `$HOME/.config/jira-views`, or `None` without a home directory.
#[must_use]
pub fn config_dir(home: Option<&Path>) -> Option<PathBuf> {
    home.map(|home| home.join(".config").join(CONFIG_DIR_NAME))
}

fn home_dir() -> Option<PathBuf> {
    env::var_os("HOME")
        .filter(|home| !home.is_empty())
        .map(PathBuf::from)
}

/// Load user config (~/.config/jira-views/config.yaml).
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_user_config() -> Result<ConfigLayer> {
    match config_dir(home_dir().as_deref()) {
        Some(dir) => ConfigLayer::from_yaml(&dir.join("config.yaml")),
        None => Ok(ConfigLayer::default()),
    }
}

/// Default config layer (lowest precedence).
#[must_use]
pub fn default_config_layer(home: Option<&Path>) -> ConfigLayer {
    let dir = config_dir(home).unwrap_or_default();
    let mut layer = ConfigLayer::default();
    layer.set(
        PREFERENCES_PATH_KEY,
        dir.join(DEFAULT_PREFERENCES_FILENAME).to_string_lossy(),
    );
    layer.set(
        CACHE_DB_KEY,
        dir.join(DEFAULT_CACHE_DB_FILENAME).to_string_lossy(),
    );
    layer.set(LOG_FORMAT_KEY, "compact");
    layer
}

/// Load configuration with the standard precedence order.
///
/// # Errors
///
/// Returns an error if the user config file cannot be read or parsed.
pub fn load_config(cli: &CliOverrides) -> Result<ConfigLayer> {
    let defaults = default_config_layer(home_dir().as_deref());
    let user = load_user_config()?;
    let env_layer = ConfigLayer::from_env();
    let cli_layer = cli.as_layer();

    Ok(ConfigLayer::merge_layers(&[
        defaults, user, env_layer, cli_layer,
    ]))
}

/// Resolved file locations and storage settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigPaths {
    pub preferences: PathBuf,
    pub cache_db: PathBuf,
    pub lock_timeout_ms: Option<u64>,
}

/// Resolve typed paths and settings from a merged layer.
///
/// # Errors
///
/// Returns `Config` when a path is blank or a number does not parse.
pub fn resolve_paths(layer: &ConfigLayer) -> Result<ConfigPaths> {
    let preferences = path_value(layer, PREFERENCES_PATH_KEY)?;
    let cache_db = path_value(layer, CACHE_DB_KEY)?;

    let lock_timeout_ms = layer
        .get(LOCK_TIMEOUT_KEY)
        .map(|value| parse_number::<u64>(LOCK_TIMEOUT_KEY, value))
        .transpose()?;

    Ok(ConfigPaths {
        preferences,
        cache_db,
        lock_timeout_ms,
    })
}

/// Whether logs should be emitted as JSON.
#[must_use]
pub fn json_logs_from_layer(layer: &ConfigLayer) -> bool {
    layer
        .get(LOG_FORMAT_KEY)
        .is_some_and(|format| format.trim().eq_ignore_ascii_case("json"))
}

fn path_value(layer: &ConfigLayer, key: &str) -> Result<PathBuf> {
    match layer.get(key).map(str::trim) {
        Some(value) if !value.is_empty() => Ok(PathBuf::from(value)),
        _ => Err(ViewsError::Config(format!("'{key}' is not set"))),
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| ViewsError::Config(format!("'{key}' must be a number, got '{value}'")))
}

fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase().replace('_', "-")
}

fn layer_from_yaml_value(value: &serde_yaml::Value) -> ConfigLayer {
    let mut layer = ConfigLayer::default();
    let mut flat = HashMap::new();
    flatten_yaml(value, "", &mut flat);

    for (key, value) in flat {
        layer.set(&key, value);
    }

    layer
}

fn flatten_yaml(value: &serde_yaml::Value, prefix: &str, out: &mut HashMap<String, String>) {
    match value {
        serde_yaml::Value::Mapping(map) => {
            for (key, value) in map {
                let Some(key_str) = key.as_str() else {
                    continue;
                };
                let next_prefix = if prefix.is_empty() {
                    key_str.to_string()
                } else {
                    format!("{prefix}.{key_str}")
                };
                flatten_yaml(value, &next_prefix, out);
            }
        }
        _ => {
            if let Some(value) = yaml_scalar_to_string(value) {
                out.insert(prefix.to_string(), value);
            }
        }
    }
}

fn yaml_scalar_to_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::Bool(v) => Some(v.to_string()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Null
        | serde_yaml::Value::Sequence(_)
        | serde_yaml::Value::Mapping(_) => None,
        serde_yaml::Value::Tagged(tagged) => yaml_scalar_to_string(&tagged.value),
    }
}
