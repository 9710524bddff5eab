//! Layered search settings.
//!
//! Settings are merged with figment, later layers winning:
//!
//! 1. Built-in defaults
//! 2. TOML config file (`--config`, or the platform config directory)
//! 3. `DUPESCOUT_*` environment variables (`__` separates nested keys)
//! 4. CLI flags (applied by the caller)
//!
//! # Example config file
//!
//! ```toml
//! roots = ["/home/user/Pictures", "/mnt/backup"]
//! workers = 8
//! key = "full"
//!
//! [filters]
//! include_hidden = false
//! exclude_dirs = ["node_modules", ".git"]
//! include_exts = ["jpg", "png"]
//! ```
//!
//! The same values from the environment:
//! `DUPESCOUT_WORKERS=8`, `DUPESCOUT_KEY=full`,
//! `DUPESCOUT_FILTERS__INCLUDE_HIDDEN=true`.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::duplicates::SearchConfig;
use crate::scanner::{Filters, KeyStrategy};

/// Prefix for environment variable overrides.
pub const ENV_PREFIX: &str = "DUPESCOUT_";

/// Errors that can occur while loading settings.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// The config file could not be parsed or a value had the wrong type.
    #[error("Invalid configuration: {0}")]
    Invalid(#[from] Box<figment::Error>),
}

/// User-facing search settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directories to search.
    pub roots: Vec<PathBuf>,
    /// Concurrent key generations; zero or negative means one per CPU.
    pub workers: i64,
    /// Built-in key strategy.
    pub key: KeyStrategy,
    /// Directory and file filter rules.
    pub filters: Filters,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            workers: 0,
            key: KeyStrategy::default(),
            filters: Filters::default(),
        }
    }
}

impl Settings {
    /// Load settings from defaults, `config_file` (or the default config
    /// path when `None`) and the environment.
    ///
    /// A missing config file is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a layer cannot be parsed.
    pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        let file = config_file
            .map(Path::to_path_buf)
            .or_else(Self::default_path);

        let mut figment = Self::figment(file.as_deref());
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        Self::from_figment(&figment)
    }

    /// Defaults merged with an optional TOML file, without the environment.
    #[must_use]
    pub fn figment(config_file: Option<&Path>) -> Figment {
        let figment = Figment::from(Serialized::defaults(Settings::default()));
        match config_file {
            Some(path) => {
                log::debug!("Reading settings from {}", path.display());
                figment.merge(Toml::file(path))
            }
            None => figment,
        }
    }

    /// Extract settings from a prepared figment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if extraction fails.
    pub fn from_figment(figment: &Figment) -> Result<Self, ConfigError> {
        figment.extract().map_err(|e| ConfigError::Invalid(Box::new(e)))
    }

    /// Get the default platform-specific configuration path.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "dupescout", "dupescout")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Worker count with non-positive values mapped to "auto" (0).
    #[must_use]
    pub fn worker_count(&self) -> usize {
        usize::try_from(self.workers).unwrap_or(0)
    }

    /// Build the search configuration these settings describe.
    ///
    /// Searches the current directory when no roots are set.
    #[must_use]
    pub fn into_search_config(self) -> SearchConfig {
        let workers = self.worker_count();
        let roots = if self.roots.is_empty() {
            vec![PathBuf::from(".")]
        } else {
            self.roots
        };

        SearchConfig::new(roots)
            .with_filters(self.filters)
            .with_key_strategy(self.key)
            .with_workers(workers)
    }
}
