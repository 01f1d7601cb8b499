//! Service configuration.
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! `SHEETCARDS_*` environment variables. Command-line flags are applied on top
//! by the binaries.

use std::env;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cards::source::DEFAULT_EXPORT_BASE;

pub const ENV_HOST: &str = "SHEETCARDS_HOST";
pub const ENV_PORT: &str = "SHEETCARDS_PORT";
pub const ENV_DB: &str = "SHEETCARDS_DB";
pub const ENV_STATIC_DIR: &str = "SHEETCARDS_STATIC_DIR";
pub const ENV_FETCH_TIMEOUT: &str = "SHEETCARDS_FETCH_TIMEOUT";

/// Environment variable holding the spreadsheet share link.
pub const DEFAULT_SHEET_URL_ENV: &str = "GOOGLE_SHEET_URL";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// SQLite file for the attempt log, relative to the working directory by default
    pub database_path: PathBuf,
    /// Directory served under `/static`
    pub static_dir: PathBuf,
    /// Fixed share link. When unset the link is read from `sheet_url_env` on every fetch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sheet_url: Option<String>,
    pub sheet_url_env: String,
    pub fetch_timeout_secs: u64,
    pub export_base_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            database_path: PathBuf::from("learning_progress.db"),
            static_dir: PathBuf::from("static"),
            sheet_url: None,
            sheet_url_env: DEFAULT_SHEET_URL_ENV.to_string(),
            fetch_timeout_secs: 30,
            export_base_url: DEFAULT_EXPORT_BASE.to_string(),
        }
    }
}

impl Config {
    /// Defaults, overlaid with `path` when given, overlaid with the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_vars(|key| env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply `SHEETCARDS_*` overrides using `lookup` to read variables.
    pub fn apply_vars<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup(ENV_HOST) {
            log::info!("{} set, binding to host {}", ENV_HOST, host);
            self.host = host;
        }
        if let Some(port) = lookup(ENV_PORT) {
            self.port = parse_value(ENV_PORT, &port)?;
        }
        if let Some(db) = lookup(ENV_DB) {
            self.database_path = PathBuf::from(db);
        }
        if let Some(dir) = lookup(ENV_STATIC_DIR) {
            self.static_dir = PathBuf::from(dir);
        }
        if let Some(timeout) = lookup(ENV_FETCH_TIMEOUT) {
            self.fetch_timeout_secs = parse_value(ENV_FETCH_TIMEOUT, &timeout)?;
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs.max(1))
    }
}

/// Load `KEY=value` pairs from a `.env` file into the process environment.
///
/// With no `path`, `.env` is searched for from the working directory upwards.
/// Variables that are already set keep their value. Returns the file read.
pub fn load_env_file(path: Option<&Path>) -> Option<PathBuf> {
    let loaded = match path {
        Some(path) => dotenvy::from_path(path).map(|_| path.to_path_buf()),
        None => dotenvy::dotenv(),
    };

    match loaded {
        Ok(path) => {
            log::info!("Loaded environment from {}", path.display());
            Some(path)
        }
        Err(e) if e.not_found() => {
            log::debug!("No .env file found");
            None
        }
        Err(e) => {
            log::warn!("Failed to load .env file: {}", e);
            None
        }
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: Display,
{
    value.trim().parse().map_err(|e: T::Err| {
        log::warn!("Invalid {} value: {}", key, e);
        ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("{:?}: {}", value, e),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::Locator;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.bind_address(), "127.0.0.1:8000");
        assert_eq!(config.database_path, PathBuf::from("learning_progress.db"));
        assert_eq!(config.sheet_url_env, "GOOGLE_SHEET_URL");
        assert_eq!(config.fetch_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            port = 9100
            sheet_url = "https://docs.google.com/spreadsheets/d/abc/edit"
            "#,
        )
        .unwrap();

        assert_eq!(config.port, 9100);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(
            config.sheet_url.as_deref(),
            Some("https://docs.google.com/spreadsheets/d/abc/edit")
        );
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            Config::from_toml("port = \"not a number\""),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config
            .apply_vars(lookup_from(&[
                (ENV_HOST, "0.0.0.0"),
                (ENV_PORT, "8080"),
                (ENV_DB, "/tmp/progress.db"),
                (ENV_FETCH_TIMEOUT, "5"),
            ]))
            .unwrap();

        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.database_path, PathBuf::from("/tmp/progress.db"));
        assert_eq!(config.fetch_timeout(), Duration::from_secs(5));
        assert_eq!(config.static_dir, PathBuf::from("static"));
    }

    #[test]
    fn test_invalid_env_port() {
        let mut config = Config::default();
        let err = config
            .apply_vars(lookup_from(&[(ENV_PORT, "eighty")]))
            .unwrap_err();
        assert!(err.to_string().starts_with("Invalid value for SHEETCARDS_PORT"));
    }

    #[test]
    fn test_load_env_file_sets_missing_vars() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(".env");
        std::fs::write(
            &path,
            "SHEETCARDS_TEST_DOTENV_SHEET=https://docs.google.com/spreadsheets/d/fromdotenv/edit\n",
        )
        .unwrap();

        assert_eq!(load_env_file(Some(&path)), Some(path.clone()));

        let locator = Locator::Env("SHEETCARDS_TEST_DOTENV_SHEET".to_string());
        assert_eq!(
            locator.resolve().unwrap(),
            "https://docs.google.com/spreadsheets/d/fromdotenv/edit"
        );
    }

    #[test]
    fn test_load_env_file_missing_is_ignored() {
        let temp = TempDir::new().unwrap();
        assert_eq!(load_env_file(Some(&temp.path().join(".env"))), None);
    }

    #[test]
    fn test_load_from_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("sheetcards.toml");
        std::fs::write(&path, "host = \"192.168.1.5\"\nfetch_timeout_secs = 0\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.host, "192.168.1.5");
        assert_eq!(config.fetch_timeout(), Duration::from_secs(1));

        assert!(matches!(
            Config::from_file(&temp.path().join("missing.toml")),
            Err(ConfigError::Io { .. })
        ));
    }
}
