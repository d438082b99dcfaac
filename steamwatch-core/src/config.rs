//! YAML configuration.
//!
//! # File layout
//!
//! ```text
//! ~/.config/steamwatch/config.yaml   (optional; every key has a default)
//! ~/.local/share/steamwatch/steamwatch.db   (default database location)
//! ```
//!
//! # API pattern
//!
//! Every function that touches `$HOME` takes it as an `_at(home: &Path, …)`
//! argument so tests can point it at a temp dir. [`home`] resolves the real
//! one from `dirs::home_dir()`.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::EventKind;

pub const DEFAULT_API_BASE_URL: &str = "https://store.steampowered.com/api";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_RECENT_LIMIT: usize = 10;

/// How `ls`, `report` and `recent` render their output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Tree,
    #[default]
    Tab,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Tree => write!(f, "tree"),
            OutputFormat::Tab => write!(f, "tab"),
        }
    }
}

/// Process-wide options. Command-line flags override these per invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// SQLite database file. `~/` is expanded against the home directory.
    pub db_path: Option<PathBuf>,
    /// Two-letter store country; decides currency and regional prices.
    pub country_code: Option<String>,
    pub api_base_url: String,
    pub http_timeout_secs: u64,
    /// Entries per package in `report`; unlimited when unset.
    pub report_limit: Option<usize>,
    pub recent_limit: usize,
    pub list_format: OutputFormat,
    pub report_format: OutputFormat,
    pub recent_format: OutputFormat,
    /// Shell commands run for each event kind.
    pub hooks: BTreeMap<EventKind, Vec<String>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: None,
            country_code: None,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            report_limit: None,
            recent_limit: DEFAULT_RECENT_LIMIT,
            list_format: OutputFormat::Tab,
            report_format: OutputFormat::Tree,
            recent_format: OutputFormat::Tab,
            hooks: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Resolve the database path against `home`.
    pub fn db_path_at(&self, home: &Path) -> PathBuf {
        match &self.db_path {
            Some(path) => expand_home(path, home),
            None => default_db_path_at(home),
        }
    }
}

// ---------------------------------------------------------------------------
// Paths
// ---------------------------------------------------------------------------

/// `<home>/.config/steamwatch/config.yaml`. Pure, no I/O.
pub fn config_path_at(home: &Path) -> PathBuf {
    home.join(".config").join("steamwatch").join("config.yaml")
}

/// `<home>/.local/share/steamwatch/steamwatch.db`. Pure, no I/O.
pub fn default_db_path_at(home: &Path) -> PathBuf {
    home.join(".local")
        .join("share")
        .join("steamwatch")
        .join("steamwatch.db")
}

fn expand_home(path: &Path, home: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => home.join(rest),
        Err(_) => path.to_path_buf(),
    }
}

// ---------------------------------------------------------------------------
// Load
// ---------------------------------------------------------------------------

/// Load the default config file under `home`; defaults if it does not exist.
pub fn load_at(home: &Path) -> Result<Config, ConfigError> {
    let path = config_path_at(home);
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        return Ok(Config::default());
    }
    load_from(&path)
}

/// Load an explicitly named config file. The file must exist.
pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    // An empty file is valid and means "all defaults".
    if contents.trim().is_empty() {
        return Ok(Config::default());
    }
    let config: Config = serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!(path = %path.display(), "loaded config");
    Ok(config)
}

/// The current user's home directory.
pub fn home() -> Result<PathBuf, ConfigError> {
    dirs::home_dir().ok_or(ConfigError::HomeNotFound)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
