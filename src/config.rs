use crate::constants::{DEFAULT_DB_PATH, DEFAULT_INPUT_CSV, DEFAULT_OUTPUT_DIR};
use crate::error::{PollError, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Source CSV of party-support survey rows.
    pub input_csv: PathBuf,
    /// SQLite store used by the seed/query variants.
    pub db_path: PathBuf,
    /// Directory the JSON export is written into.
    pub output_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_csv: PathBuf::from(DEFAULT_INPUT_CSV),
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
        }
    }
}

impl Config {
    /// Loads `config.toml` from the working directory; falls back to the
    /// built-in defaults when the file is absent. CLI flags override either.
    pub fn load() -> Result<Self> {
        let config_path = "config.toml";
        if !Path::new(config_path).exists() {
            debug!("No config.toml found, using defaults");
            return Ok(Self::default());
        }
        let config_content = fs::read_to_string(config_path).map_err(|e| {
            PollError::Config(format!("Failed to read config file '{config_path}': {e}"))
        })?;
        let config: Config = toml::from_str(&config_content)?;
        Ok(config)
    }
}
