//! Configuration file loading with precedence handling.

use crate::state::bulk::DEFAULT_MIN_JUSTIFICATION_LEN;
use crate::state::controller::TableOptions;
use crate::state::query::{DEFAULT_PAGE_SIZE, DEFAULT_SEARCH_DEBOUNCE_MS};
use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;
use tracing::warn;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "TABLECTL_CONFIG";

/// Environment variable overriding the default page size.
pub const PAGE_SIZE_ENV: &str = "TABLECTL_PAGE_SIZE";

/// Errors that can occur during config loading.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Failed to read config file (file may not exist or have permission issues).
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError {
        /// Path that failed to read.
        path: PathBuf,
        /// Reason for failure.
        reason: String,
    },

    /// Config file contains invalid TOML syntax.
    #[error("Invalid TOML in {path}: {reason}")]
    ParseError {
        /// Path with invalid TOML.
        path: PathBuf,
        /// Parse error details.
        reason: String,
    },
}

/// TOML configuration file structure.
///
/// All fields are optional - if not specified, hardcoded defaults are used.
/// Corresponds to `~/.config/tablectl/config.toml`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Rows per page when a table mounts.
    #[serde(default)]
    pub page_size: Option<usize>,

    /// Debounce for search keystrokes, for UIs layered on top.
    #[serde(default)]
    pub search_debounce_ms: Option<u64>,

    /// Minimum export justification length in characters.
    #[serde(default)]
    pub min_justification_len: Option<usize>,

    /// Fields the search box matches against.
    #[serde(default)]
    pub searchable_fields: Option<Vec<String>>,

    /// Path to log file for tracing output.
    #[serde(default)]
    pub log_file_path: Option<PathBuf>,
}

/// Resolved configuration after applying precedence rules.
///
/// Created by merging defaults, config file, env vars, and CLI args.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    /// Rows per page.
    pub page_size: usize,
    /// Search debounce in milliseconds.
    pub search_debounce_ms: u64,
    /// Minimum export justification length.
    pub min_justification_len: usize,
    /// Searchable fields.
    pub searchable_fields: Vec<String>,
    /// Path to log file for tracing output.
    pub log_file_path: PathBuf,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            search_debounce_ms: DEFAULT_SEARCH_DEBOUNCE_MS,
            min_justification_len: DEFAULT_MIN_JUSTIFICATION_LEN,
            searchable_fields: vec!["name".to_string()],
            log_file_path: default_log_path(),
        }
    }
}

impl ResolvedConfig {
    /// Controller options for a table using this configuration.
    pub fn table_options(&self) -> TableOptions {
        TableOptions {
            page_size: self.page_size,
            searchable: self.searchable_fields.clone(),
            min_justification_len: self.min_justification_len,
            search_debounce_ms: self.search_debounce_ms,
        }
    }
}

/// Resolve default log file path.
///
/// Returns `~/.local/state/tablectl/tablectl.log` on Unix-like systems,
/// or the platform's state directory elsewhere.
///
/// If state directory cannot be determined, falls back to current directory.
pub fn default_log_path() -> PathBuf {
    if let Some(state_dir) = dirs::state_dir() {
        state_dir.join("tablectl").join("tablectl.log")
    } else {
        PathBuf::from("tablectl.log")
    }
}

/// Load configuration file from a specific path.
///
/// Returns `Ok(None)` if file doesn't exist (not an error - use defaults).
///
/// # Errors
///
/// Returns error if file exists but has read or parse errors.
pub fn load_config_file(path: impl Into<PathBuf>) -> Result<Option<ConfigFile>, ConfigError> {
    let path = path.into();

    // Missing file is not an error - use defaults
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path).map_err(|e| ConfigError::ReadError {
        path: path.clone(),
        reason: e.to_string(),
    })?;

    let config: ConfigFile = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
        path: path.clone(),
        reason: e.to_string(),
    })?;

    Ok(Some(config))
}

/// Resolve default config file path.
///
/// Returns `~/.config/tablectl/config.toml` on Unix, appropriate path on other platforms.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("tablectl").join("config.toml"))
}

/// Load configuration with precedence handling.
///
/// Precedence (highest to lowest):
/// 1. Explicit `config_path` argument (CLI `--config`)
/// 2. `TABLECTL_CONFIG` environment variable
/// 3. Default path `~/.config/tablectl/config.toml`
///
/// Missing config files are NOT errors - defaults are used.
pub fn load_config_with_precedence(
    config_path: Option<PathBuf>,
) -> Result<Option<ConfigFile>, ConfigError> {
    if let Some(path) = config_path {
        return load_config_file(path);
    }

    if let Ok(env_path) = std::env::var(CONFIG_ENV) {
        return load_config_file(PathBuf::from(env_path));
    }

    if let Some(default_path) = default_config_path() {
        return load_config_file(default_path);
    }

    Ok(None)
}

/// Merge config file into defaults to create resolved config.
///
/// Values a table cannot work with (zero page size, empty searchable list)
/// are replaced by the default with a warning.
pub fn merge_config(config_file: Option<ConfigFile>) -> ResolvedConfig {
    let defaults = ResolvedConfig::default();

    let Some(config) = config_file else {
        return defaults;
    };

    let page_size = match config.page_size {
        Some(0) => {
            warn!("page_size = 0 in config file, using default");
            defaults.page_size
        }
        Some(size) => size,
        None => defaults.page_size,
    };

    let searchable_fields = match config.searchable_fields {
        Some(fields) if fields.is_empty() => {
            warn!("searchable_fields is empty in config file, using default");
            defaults.searchable_fields
        }
        Some(fields) => fields,
        None => defaults.searchable_fields,
    };

    ResolvedConfig {
        page_size,
        search_debounce_ms: config
            .search_debounce_ms
            .unwrap_or(defaults.search_debounce_ms),
        min_justification_len: config
            .min_justification_len
            .unwrap_or(defaults.min_justification_len),
        searchable_fields,
        log_file_path: config.log_file_path.unwrap_or(defaults.log_file_path),
    }
}

/// Apply environment variable overrides to resolved config.
///
/// Checks for:
/// - `TABLECTL_PAGE_SIZE`: Override page size (ignored unless a positive integer)
pub fn apply_env_overrides(mut config: ResolvedConfig) -> ResolvedConfig {
    if let Ok(raw) = std::env::var(PAGE_SIZE_ENV) {
        match raw.trim().parse::<usize>() {
            Ok(size) if size > 0 => config.page_size = size,
            _ => warn!(value = %raw, "ignoring invalid {}", PAGE_SIZE_ENV),
        }
    }

    config
}

/// Apply CLI argument overrides to resolved config.
///
/// CLI args have the highest precedence and override all other sources.
/// Only applies overrides for flags that were explicitly set by the user.
///
/// Precedence chain: Defaults → Config File → Env Vars → CLI Args (highest)
pub fn apply_cli_overrides(
    mut config: ResolvedConfig,
    page_size_override: Option<usize>,
    searchable_override: Option<Vec<String>>,
) -> ResolvedConfig {
    if let Some(size) = page_size_override.filter(|size| *size > 0) {
        config.page_size = size;
    }

    if let Some(fields) = searchable_override.filter(|fields| !fields.is_empty()) {
        config.searchable_fields = fields;
    }

    config
}

#[cfg(test)]
#[path = "loader_tests.rs"]
mod tests;
