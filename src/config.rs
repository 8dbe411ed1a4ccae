//! Configuration for the loader and the batch tool.
//!
//! Configuration is layered: stock defaults, then an optional TOML file, then
//! environment overrides. The file is sparse, so only the values that differ
//! from the defaults need to be written:
//!
//! ```toml
//! [loader]
//! resource_dir = "/opt/fast-image"  # searched for native/<lib> before the embedded copy
//! temp_dir = "/var/tmp"             # where the codec library is extracted
//! serialize_native_calls = true     # one native call at a time
//!
//! [batch]
//! quality = 70                      # compression quality (0-100)
//! rotations = [90, 180, 270]        # rotated variants to produce
//! max_processes = 4                 # parallel workers (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.
//!
//! ## Environment
//!
//! | Variable | Effect |
//! |---|---|
//! | `FAST_IMAGE_CONFIG` | path of the TOML file to load |
//! | `FAST_IMAGE_RESOURCE_DIR` | overrides `loader.resource_dir` |
//! | `FAST_IMAGE_TEMP_DIR` | overrides `loader.temp_dir` |

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_ENV: &str = "FAST_IMAGE_CONFIG";
pub const RESOURCE_DIR_ENV: &str = "FAST_IMAGE_RESOURCE_DIR";
pub const TEMP_DIR_ENV: &str = "FAST_IMAGE_TEMP_DIR";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub loader: LoaderConfig,
    pub batch: BatchConfig,
}

/// How the native codec library is located, extracted, and called.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoaderConfig {
    /// Directory containing `native/<library file>`; takes precedence over
    /// libraries embedded at build time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_dir: Option<PathBuf>,
    /// Directory the library is extracted into. Defaults to the system temp dir.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temp_dir: Option<PathBuf>,
    /// Guard every native call with a process-wide lock.
    pub serialize_native_calls: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            resource_dir: None,
            temp_dir: None,
            serialize_native_calls: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatchConfig {
    pub quality: i32,
    pub rotations: Vec<i32>,
    /// Maximum number of parallel workers. When absent, defaults to the
    /// number of CPU cores. Values larger than the core count are clamped down.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_processes: Option<usize>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            quality: 70,
            rotations: vec![90, 180, 270],
            max_processes: None,
        }
    }
}

impl Config {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0..=100).contains(&self.batch.quality) {
            return Err(ConfigError::Validation(
                "batch.quality must be 0-100".into(),
            ));
        }
        if let Some(bad) = self
            .batch
            .rotations
            .iter()
            .find(|&&a| !matches!(a, 90 | 180 | 270))
        {
            return Err(ConfigError::Validation(format!(
                "batch.rotations may only contain 90, 180 or 270 (got {bad})"
            )));
        }
        if self.batch.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "batch.max_processes must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Load the configuration the global bootstrap uses: the file named by
    /// `FAST_IMAGE_CONFIG` (if any), then directory overrides from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    /// Like [`from_env`](Self::from_env), but an explicit `path` takes the
    /// place of `FAST_IMAGE_CONFIG`.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let env_path = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        let mut config = match path.or(env_path.as_deref()) {
            Some(path) => load_config(path)?,
            None => Config::default(),
        };
        config.apply_env_overrides(|key| std::env::var_os(key).map(PathBuf::from));
        Ok(config)
    }

    fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<PathBuf>) {
        if let Some(dir) = lookup(RESOURCE_DIR_ENV) {
            self.loader.resource_dir = Some(dir);
        }
        if let Some(dir) = lookup(TEMP_DIR_ENV) {
            self.loader.temp_dir = Some(dir);
        }
    }
}

/// Resolve the effective batch worker count.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &BatchConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(Config::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Parse TOML text, merge it over the stock defaults, and validate.
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let overlay: toml::Value = toml::from_str(content)?;
    let merged = merge_toml(stock_defaults_value(), overlay);
    let config: Config = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load a config file. Merges user values on top of stock defaults, rejects
/// unknown keys, and validates the result.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Returns a fully-commented stock config file with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Fast Image Configuration
# ========================
#
# Every key is optional; the values below are the defaults.
# Point FAST_IMAGE_CONFIG at this file, or pass --config to the CLI.

[loader]
# Directory holding native/<library file>. Searched before the libraries
# embedded in the binary. Also settable with FAST_IMAGE_RESOURCE_DIR.
# resource_dir = "/opt/fast-image"

# Where the codec library is extracted before loading. Defaults to the
# system temp directory. Also settable with FAST_IMAGE_TEMP_DIR.
# temp_dir = "/var/tmp"

# Allow only one native call at a time. Disable only for codec builds
# known to be safe under concurrent calls.
serialize_native_calls = true

[batch]
# Compression quality for the batch command (0 = smallest, 100 = best).
quality = 70

# Rotated variants written per image. Allowed: 90, 180, 270.
rotations = [90, 180, 270]

# Maximum parallel workers (omit for auto = CPU cores).
# max_processes = 4
"##
}
