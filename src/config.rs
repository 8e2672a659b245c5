use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable consulted when `[telegram] bot_token` is empty
pub const BOT_TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default = "default_database_config")]
    pub database: DatabaseConfig,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ExportConfig {
    /// Chat id (e.g. `-1001234567890`) or username (`@channel`)
    #[serde(default)]
    pub chat: Option<String>,
    /// Read messages from this Bot API JSON dump instead of the network
    #[serde(default)]
    pub dump_file: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        default_database_config()
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("data/db.sqlite3")
}

fn default_database_config() -> DatabaseConfig {
    DatabaseConfig {
        path: default_db_path(),
    }
}

impl Config {
    /// Load the config file. A missing file at the default location yields
    /// defaults; a missing file the user named explicitly is an error.
    pub fn load(path: &Path, explicit: bool) -> Result<Self> {
        if !path.exists() {
            if explicit {
                bail!("Config file not found: {}", path.display());
            }
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Bot token from the config file, falling back to the environment
    pub fn bot_token(&self) -> Option<String> {
        if !self.telegram.bot_token.is_empty() {
            return Some(self.telegram.bot_token.clone());
        }
        std::env::var(BOT_TOKEN_ENV).ok().filter(|t| !t.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.database.path, PathBuf::from("data/db.sqlite3"));
        assert!(config.export.chat.is_none());
        assert!(config.export.dump_file.is_none());
        assert!(config.telegram.bot_token.is_empty());
    }

    #[test]
    fn test_full_config() {
        let config = Config::parse(
            r#"
            [telegram]
            bot_token = "123:abc"

            [export]
            chat = "@news"
            dump_file = "updates.json"

            [database]
            path = "/tmp/export.db"
            "#,
        )
        .unwrap();
        assert_eq!(config.bot_token().as_deref(), Some("123:abc"));
        assert_eq!(config.export.chat.as_deref(), Some("@news"));
        assert_eq!(config.export.dump_file, Some(PathBuf::from("updates.json")));
        assert_eq!(config.database.path, PathBuf::from("/tmp/export.db"));
    }

    #[test]
    fn test_database_section_without_path() {
        let config = Config::parse("[database]\n").unwrap();
        assert_eq!(config.database.path, PathBuf::from("data/db.sqlite3"));
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        assert!(Config::parse("[export\nchat = 1").is_err());
    }

    #[test]
    fn test_missing_default_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        assert!(Config::load(&path, false).is_ok());
        assert!(Config::load(&path, true).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[export]\nchat = \"-100\"\n").unwrap();
        let config = Config::load(&path, true).unwrap();
        assert_eq!(config.export.chat.as_deref(), Some("-100"));
    }
}
