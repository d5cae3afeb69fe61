// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Configuration loading.
//!
//! Settings come from, in increasing priority:
//! 1. the user file `<config dir>/modshim/config.toml`
//! 2. the project file `modshim.toml`
//! 3. `MODSHIM_*` environment variables
//!
//! Files may set any subset of keys; later sources override earlier ones
//! key by key.

use std::path::{Path, PathBuf};

use modshim_core::{AnalyzerOptions, ModuleKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Name of the project configuration file.
pub const PROJECT_FILE: &str = "modshim.toml";

/// Prefix of configuration environment variables.
pub const ENV_PREFIX: &str = "MODSHIM_";

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors raised while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A configuration file could not be read
    #[error("cannot read {path}: {source}")]
    Io {
        /// The file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// A configuration file is not valid TOML or has wrong value types
    #[error("invalid configuration in {origin}: {source}")]
    Toml {
        /// File path or `<inline>`
        origin: String,
        /// Underlying error
        #[source]
        source: toml::de::Error,
    },

    /// An environment variable has a value of the wrong type
    #[error("invalid value {value:?} for {key}")]
    InvalidValue {
        /// Variable name
        key: String,
        /// The rejected value
        value: String,
    },
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One line per event
    #[default]
    Compact,
    /// Multi-line, human oriented
    Pretty,
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `EnvFilter` directive used when `MODSHIM_LOG` is unset
    pub level: String,
    /// Output format
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: LogFormat::Compact,
        }
    }
}

/// Complete configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Analyzer settings
    pub analyzer: AnalyzerOptions,
    /// Logging settings
    pub log: LogConfig,
}

impl Config {
    /// Loads configuration for the project rooted at `project_dir`.
    pub fn load(project_dir: &Path) -> Result<Self> {
        Self::load_from(user_config_path().as_deref(), project_dir, std::env::vars())
    }

    /// Loads configuration from an explicit user file and environment.
    pub fn load_from(
        user_file: Option<&Path>,
        project_dir: &Path,
        env: impl IntoIterator<Item = (String, String)>,
    ) -> Result<Self> {
        let mut table = toml::Table::new();
        let project_file = project_dir.join(PROJECT_FILE);
        for path in user_file.into_iter().chain(std::iter::once(project_file.as_path())) {
            if !path.exists() {
                continue;
            }
            let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            let overlay = parse_table(&content, &path.display().to_string())?;
            merge(&mut table, overlay);
            tracing::debug!(path = %path.display(), "Loaded configuration file");
        }

        let mut config: Config = toml::Value::Table(table).try_into().map_err(|source| ConfigError::Toml {
            origin: "merged configuration".to_string(),
            source,
        })?;
        config.load_from_env(env)?;
        Ok(config)
    }

    /// Parses a complete configuration document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|source| ConfigError::Toml {
            origin: "<inline>".to_string(),
            source,
        })
    }

    fn load_from_env(&mut self, env: impl IntoIterator<Item = (String, String)>) -> Result<()> {
        for (key, value) in env {
            if let Some(name) = key.strip_prefix(ENV_PREFIX) {
                self.set(&name.to_lowercase(), &value).map_err(|()| ConfigError::InvalidValue {
                    key: key.clone(),
                    value: value.clone(),
                })?;
            }
        }
        Ok(())
    }

    /// Sets one value by its environment name (`MODSHIM_` stripped,
    /// lowercased). Unknown keys are ignored.
    fn set(&mut self, key: &str, value: &str) -> std::result::Result<(), ()> {
        let analyzer = &mut self.analyzer;
        match key {
            "log" => self.log.level = value.to_string(),
            "log_format" => {
                self.log.format = match value {
                    "compact" => LogFormat::Compact,
                    "pretty" => LogFormat::Pretty,
                    _ => return Err(()),
                }
            }
            "live_default_bindings" => analyzer.live_default_bindings = parse_bool(value)?,
            "parallel" => analyzer.parallel = parse_bool(value)?,
            "emit_info" => analyzer.emit_info = parse_bool(value)?,
            "rewrite_requires" => analyzer.rewrite_requires = parse_bool(value)?,
            "context_shims" => analyzer.context_shims = parse_bool(value)?,
            "strip_use_strict" => analyzer.strip_use_strict = parse_bool(value)?,
            "assume_unknown_as" => {
                analyzer.assume_unknown_as = match value {
                    "" | "none" => None,
                    "commonjs" => Some(ModuleKind::CommonJs),
                    "esm" => Some(ModuleKind::Esm),
                    _ => return Err(()),
                }
            }
            _ => tracing::trace!(key, "Ignoring unknown configuration variable"),
        }
        Ok(())
    }
}

/// The user configuration file.
fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("modshim").join("config.toml"))
}

fn parse_table(content: &str, origin: &str) -> Result<toml::Table> {
    content.parse::<toml::Table>().map_err(|source| ConfigError::Toml {
        origin: origin.to_string(),
        source,
    })
}

/// Merges `overlay` into `base`, descending into nested tables.
fn merge(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(nested)) => merge(existing, nested),
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

fn parse_bool(value: &str) -> std::result::Result<bool, ()> {
    match value {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_defaults_without_files() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(None, dir.path(), Vec::new()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_project_overrides_user_per_key() {
        let dir = TempDir::new().unwrap();
        let user = dir.path().join("user.toml");
        fs::write(&user, "[analyzer]\nparallel = false\nemit_info = true\n\n[log]\nlevel = \"info\"\n").unwrap();
        fs::write(dir.path().join(PROJECT_FILE), "[analyzer]\nemit_info = false\n").unwrap();

        let config = Config::load_from(Some(&user), dir.path(), Vec::new()).unwrap();
        assert!(!config.analyzer.parallel);
        assert!(!config.analyzer.emit_info);
        assert_eq!(config.log.level, "info");
        assert!(config.analyzer.rewrite_requires);
    }

    #[test]
    fn test_environment_wins() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(PROJECT_FILE), "[analyzer]\nparallel = true\n").unwrap();
        let vars = env(&[
            ("MODSHIM_PARALLEL", "false"),
            ("MODSHIM_ASSUME_UNKNOWN_AS", "commonjs"),
            ("MODSHIM_LOG", "modshim=debug"),
            ("MODSHIM_LOG_FORMAT", "pretty"),
            ("PATH", "/usr/bin"),
        ]);
        let config = Config::load_from(None, dir.path(), vars).unwrap();
        assert!(!config.analyzer.parallel);
        assert_eq!(config.analyzer.assume_unknown_as, Some(ModuleKind::CommonJs));
        assert_eq!(config.log.level, "modshim=debug");
        assert_eq!(config.log.format, LogFormat::Pretty);
    }

    #[test]
    fn test_invalid_environment_value() {
        let dir = TempDir::new().unwrap();
        let err = Config::load_from(None, dir.path(), env(&[("MODSHIM_PARALLEL", "sometimes")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "MODSHIM_PARALLEL"));
    }

    #[test]
    fn test_invalid_file_names_its_path() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(PROJECT_FILE), "[analyzer\n").unwrap();
        let err = Config::load_from(None, dir.path(), Vec::new()).unwrap_err();
        assert!(err.to_string().contains(PROJECT_FILE), "{}", err);
    }

    #[test]
    fn test_from_toml_str() {
        let config = Config::from_toml_str("[analyzer]\nassume_unknown_as = \"esm\"\nlive_default_bindings = false\n").unwrap();
        assert_eq!(config.analyzer.assume_unknown_as, Some(ModuleKind::Esm));
        assert!(!config.analyzer.live_default_bindings);
        assert_eq!(config.log, LogConfig::default());
    }
}
