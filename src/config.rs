//! Configuration file handling.
//!
//! # Configuration Location
//!
//! The configuration file is stored at:
//! - Linux: `~/.config/advisory-index/config.toml`
//! - macOS: `~/Library/Application Support/advisory-index/config.toml`
//! - Windows: `%APPDATA%\advisory-index\config.toml`
//!
//! `ADVISORY_DB_PATH` and `GITHUB_TOKEN` take precedence over the file.
//!
//! # Example Configuration
//!
//! ```toml
//! database_path = "/srv/advisory-database"
//! advisories_subdir = "advisories/github-reviewed"
//! source = "local"
//! bind_address = "0.0.0.0"
//! port = 8080
//! default_format = "table"
//! ```

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

const DB_PATH_ENV: &str = "ADVISORY_DB_PATH";
const GITHUB_TOKEN_ENV: &str = "GITHUB_TOKEN";

/// Which backing store answers queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// In-memory index over a local clone of the advisory database.
    #[default]
    Local,
    /// The GitHub global advisories REST API.
    Github,
}

/// Application configuration.
///
/// # Example
///
/// ```no_run
/// use advisory_index::Config;
///
/// let config = Config::load().unwrap();
/// println!("Indexing {}", config.advisories_root().display());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root of a clone of github/advisory-database.
    ///
    /// Default: `./advisory-database`
    pub database_path: PathBuf,

    /// Subtree of `database_path` holding the reviewed OSV records.
    ///
    /// Default: `advisories/github-reviewed`
    pub advisories_subdir: PathBuf,

    /// Default: `local`
    pub source: SourceKind,

    /// Sent as a bearer token when `source = "github"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub github_token: Option<String>,

    /// Address `serve` binds to.
    ///
    /// Default: `127.0.0.1`
    pub bind_address: String,

    /// Default: 8080
    pub port: u16,

    /// Output format when no `--format` flag is provided.
    ///
    /// Valid values: "table", "json"
    /// Default: "table"
    pub default_format: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("./advisory-database"),
            advisories_subdir: PathBuf::from("advisories/github-reviewed"),
            source: SourceKind::Local,
            github_token: None,
            bind_address: "127.0.0.1".to_string(),
            port: 8080,
            default_format: "table".to_string(),
        }
    }
}

impl Config {
    /// Loads configuration from the config file, then applies environment
    /// overrides.
    ///
    /// If the config file doesn't exist, starts from the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        let path = Self::config_path();

        let mut config = if path.exists() {
            let content = fs::read_to_string(&path)?;
            toml::from_str(&content)?
        } else {
            Self::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Saves the configuration to the config file.
    ///
    /// Creates the parent directory if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path();

        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;
        Ok(())
    }

    /// Returns the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("advisory-index")
            .join("config.toml")
    }

    /// Generates a string containing the default configuration.
    pub fn generate_default_config() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }

    /// Directory the index walks.
    pub fn advisories_root(&self) -> PathBuf {
        self.database_path.join(&self.advisories_subdir)
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup(DB_PATH_ENV).filter(|v| !v.is_empty()) {
            self.database_path = PathBuf::from(path);
        }
        if let Some(token) = lookup(GITHUB_TOKEN_ENV).filter(|v| !v.is_empty()) {
            self.github_token = Some(token);
        }
    }
}
