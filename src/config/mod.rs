//! Shell settings.
//!
//! Settings are layered: built-in defaults, then an optional TOML file
//! (`rustydoc.toml`, or the path in `RUSTYDOC_CONFIG`), then `RUSTYDOC_*`
//! environment variables such as `RUSTYDOC_DATABASE=ecommerce`.

use crate::common::constants::{
    CONFIG_FILE, CONFIG_FILE_ENV, DEFAULT_DATABASE, DEFAULT_HISTORY_SIZE, DEFAULT_LOG_LEVEL, ENV_PREFIX,
};
use crate::common::{Error, Result};
use serde::Deserialize;

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Settings {
    /// The database a session starts in.
    pub database: String,
    /// Log filter directive, e.g. "info" or "rustydoc::query=debug".
    /// RUST_LOG takes precedence when set.
    pub log_level: String,
    /// How statement results are printed.
    pub output: OutputFormat,
    /// Maximum number of shell history entries.
    pub history_size: usize,
}

/// Result output format.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Mongo shell notation.
    #[default]
    Shell,
    /// One JSON object per result.
    Json,
}

impl Settings {
    /// Loads settings from the default file location and the environment.
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_FILE_ENV).unwrap_or_else(|_| CONFIG_FILE.to_string());
        Self::load_from(&path)
    }

    /// Loads settings from the given file, if it exists, and the environment.
    pub fn load_from(path: &str) -> Result<Self> {
        let settings: Self = config::Config::builder()
            .set_default("database", DEFAULT_DATABASE)?
            .set_default("log_level", DEFAULT_LOG_LEVEL)?
            .set_default("output", "shell")?
            .set_default("history_size", DEFAULT_HISTORY_SIZE as u64)?
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.database.is_empty() {
            return Err(Error::Config("database name can't be empty".into()));
        }
        if self.history_size == 0 {
            return Err(Error::Config("history_size must be positive".into()));
        }
        Ok(())
    }
}
