//! Configuration loading for the poller
//!
//! Resolution priority, highest first:
//! 1. Command-line argument
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable carrying the provider API key
pub const API_KEY_ENV: &str = "KEEPA_API_KEY";
/// Environment variable carrying the Slack webhook URL
pub const WEBHOOK_ENV: &str = "SLACK_WEBHOOK_URL";

/// Marketplace selector for amazon.co.jp
pub const DEFAULT_DOMAIN_ID: u8 = 5;
/// Default SQLite database file, relative to the working directory
pub const DEFAULT_DATABASE: &str = "rankwatch.db";

/// Resolved poller configuration
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Provider API credential; `None` is a valid idle state, the pipeline
    /// exits with an empty report before doing any work
    pub api_key: Option<String>,
    /// Outbound notification webhook; `None` disables delivery
    pub slack_webhook_url: Option<String>,
    /// Fixed marketplace selector sent with every provider call
    pub domain_id: u8,
    pub database_path: PathBuf,
}

/// On-disk TOML shape (all fields optional)
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    api_key: Option<String>,
    slack_webhook_url: Option<String>,
    domain_id: Option<u8>,
    database_path: Option<PathBuf>,
}

impl PollerConfig {
    /// Resolve configuration from the CLI flags, the environment, and an
    /// optional TOML file.
    pub fn resolve(
        config_file: Option<&Path>,
        cli_database: Option<&Path>,
    ) -> Result<Self> {
        let file = match config_file {
            Some(path) => load_file(path)?,
            None => FileConfig::default(),
        };

        let api_key = env_non_empty(API_KEY_ENV).or(file.api_key);
        let slack_webhook_url = env_non_empty(WEBHOOK_ENV).or(file.slack_webhook_url);

        let database_path = cli_database
            .map(Path::to_path_buf)
            .or(file.database_path)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE));

        Ok(Self {
            api_key,
            slack_webhook_url,
            domain_id: file.domain_id.unwrap_or(DEFAULT_DOMAIN_ID),
            database_path,
        })
    }

    /// Whether the pipeline has the credential it needs to do any work
    pub fn is_configured(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }
}

fn load_file(path: &Path) -> Result<FileConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("cannot parse {}: {}", path.display(), e)))
}

fn env_non_empty(name: &str) -> Option<String> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = PollerConfig::resolve(None, None).unwrap();
        assert_eq!(config.domain_id, DEFAULT_DOMAIN_ID);
        assert_eq!(config.database_path, PathBuf::from(DEFAULT_DATABASE));
    }

    #[test]
    fn file_values_are_picked_up() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "api_key = \"k123\"\nslack_webhook_url = \"https://hooks.example/x\"\ndomain_id = 1"
        )
        .unwrap();

        let config = PollerConfig::resolve(Some(file.path()), None).unwrap();
        assert_eq!(config.api_key.as_deref(), Some("k123"));
        assert_eq!(
            config.slack_webhook_url.as_deref(),
            Some("https://hooks.example/x")
        );
        assert_eq!(config.domain_id, 1);
        assert!(config.is_configured());
    }

    #[test]
    fn cli_database_beats_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "database_path = \"from_file.db\"").unwrap();

        let config =
            PollerConfig::resolve(Some(file.path()), Some(Path::new("from_cli.db"))).unwrap();
        assert_eq!(config.database_path, PathBuf::from("from_cli.db"));
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = PollerConfig::resolve(Some(Path::new("/no/such/rankwatch.toml")), None)
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn missing_credential_is_idle_not_error() {
        let config = PollerConfig {
            api_key: None,
            slack_webhook_url: None,
            domain_id: DEFAULT_DOMAIN_ID,
            database_path: PathBuf::from(DEFAULT_DATABASE),
        };
        assert!(!config.is_configured());
    }
}
