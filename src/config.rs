use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;

use crate::db::DEFAULT_BUSY_TIMEOUT_MS;
use crate::error::{Error, Result};
use crate::service::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub listing: ListingConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// SQLite file path, or `:memory:`.
    pub path: Option<String>,
    pub busy_timeout_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    pub level: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListingConfig {
    pub page_size: Option<usize>,
}

/// `$HOME/.taskdesk`, or `./.taskdesk` when `HOME` is unset.
pub fn config_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
    Path::new(&home).join(".taskdesk")
}

impl Config {
    /// Load config from `~/.taskdesk/config.toml`.
    /// Returns default config if the file doesn't exist.
    pub fn load() -> Result<Self> {
        Self::load_from(&config_dir().join("config.toml"))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let config: Config = match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).map_err(|e| Error::Config {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Config::default()),
            Err(e) => return Err(e.into()),
        };
        config.validate(path)?;
        log::debug!("loaded config from {}", path.display());
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        let invalid = |message: String| Error::Config {
            path: path.to_path_buf(),
            message,
        };
        if let Some(level) = &self.log.level {
            log::LevelFilter::from_str(level)
                .map_err(|_| invalid(format!("log.level '{level}' is not a log level")))?;
        }
        if let Some(size) = self.listing.page_size {
            if !(1..=MAX_PAGE_SIZE).contains(&size) {
                return Err(invalid(format!(
                    "listing.page_size must be between 1 and {MAX_PAGE_SIZE}"
                )));
            }
        }
        if self.database.path.as_deref() == Some("") {
            return Err(invalid("database.path must not be empty".into()));
        }
        Ok(())
    }

    pub fn db_path(&self) -> String {
        match &self.database.path {
            Some(path) => path.clone(),
            None => config_dir().join("tasks.db").to_string_lossy().into_owned(),
        }
    }

    pub fn busy_timeout_ms(&self) -> u64 {
        self.database
            .busy_timeout_ms
            .unwrap_or(DEFAULT_BUSY_TIMEOUT_MS)
    }

    pub fn log_level(&self) -> log::LevelFilter {
        self.log
            .level
            .as_deref()
            .and_then(|l| log::LevelFilter::from_str(l).ok())
            .unwrap_or(log::LevelFilter::Warn)
    }

    pub fn page_size(&self) -> usize {
        self.listing.page_size.unwrap_or(DEFAULT_PAGE_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    #[test]
    fn missing_file_returns_default() {
        let config = Config::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert!(config.database.path.is_none());
        assert_eq!(config.busy_timeout_ms(), DEFAULT_BUSY_TIMEOUT_MS);
        assert_eq!(config.log_level(), log::LevelFilter::Warn);
        assert_eq!(config.page_size(), DEFAULT_PAGE_SIZE);
        assert!(config.db_path().ends_with("tasks.db"));
    }

    #[test]
    fn parse_full_config() {
        let f = write_config(
            r#"
[database]
path = "/tmp/tasks.db"
busy_timeout_ms = 250

[log]
level = "debug"

[listing]
page_size = 50
"#,
        );
        let config = Config::load_from(f.path()).unwrap();
        assert_eq!(config.db_path(), "/tmp/tasks.db");
        assert_eq!(config.busy_timeout_ms(), 250);
        assert_eq!(config.log_level(), log::LevelFilter::Debug);
        assert_eq!(config.page_size(), 50);
    }

    #[test]
    fn parse_partial_config() {
        let f = write_config("[log]\nlevel = \"info\"\n");
        let config = Config::load_from(f.path()).unwrap();
        assert_eq!(config.log_level(), log::LevelFilter::Info);
        assert_eq!(config.busy_timeout_ms(), DEFAULT_BUSY_TIMEOUT_MS);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let f = write_config("[database]\nhost = \"localhost\"\n");
        let err = Config::load_from(f.path()).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
        assert!(err.to_string().contains("host"));
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let f = write_config("[listing]\npage_size = 0\n");
        assert!(Config::load_from(f.path()).is_err());
        let f = write_config("[log]\nlevel = \"loud\"\n");
        assert!(Config::load_from(f.path()).is_err());
        let f = write_config("[database]\npath = \"\"\n");
        assert!(Config::load_from(f.path()).is_err());
    }
}
