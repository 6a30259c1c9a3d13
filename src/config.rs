//! Configuration file.
//!
//! ```toml
//! host = "data.example.com"
//! user = "alice"
//! timeout_secs = 60
//! history_file = "/home/alice/.odsql_history"
//!
//! [options]
//! timezone = "Europe/Paris"
//! force_records = 1
//! ```

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::ast::OptionValue;
use crate::error::{OdsqlError, OdsqlResult};
use crate::options::OptionStore;

pub const HISTORY_FILE_NAME: &str = ".odsql_history";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub host: Option<String>,
    pub user: Option<String>,
    pub timeout_secs: Option<u64>,
    pub history_file: Option<PathBuf>,
    /// Initial values for session options.
    pub options: BTreeMap<String, toml::Value>,
}

impl Config {
    /// `<config dir>/odsql/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("odsql").join("config.toml"))
    }

    pub fn from_toml(content: &str) -> OdsqlResult<Self> {
        toml::from_str(content).map_err(|e| OdsqlError::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> OdsqlResult<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| OdsqlError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Load `path` if given, else the default file if it exists, else defaults.
    pub fn discover(path: Option<&Path>) -> OdsqlResult<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => {
                tracing::debug!(path = %path.display(), "loading config");
                Self::load(&path)
            }
            _ => Ok(Self::default()),
        }
    }

    /// Apply `[options]` through the normal `set` path, so unknown names and
    /// bad types are reported the same way as in the REPL.
    pub fn apply_options(&self, store: &mut OptionStore) -> OdsqlResult<()> {
        for (name, value) in &self.options {
            let value = match value {
                toml::Value::Integer(n) => OptionValue::Int(*n),
                toml::Value::Boolean(b) => OptionValue::Int(*b as i64),
                toml::Value::String(s) => OptionValue::String(s.clone()),
                other => {
                    return Err(OdsqlError::Config(format!(
                        "option '{}' must be an integer, boolean or string, got {}",
                        name,
                        other.type_str()
                    )));
                }
            };
            store.set(name, value)?;
        }
        Ok(())
    }

    pub fn history_path(&self) -> PathBuf {
        self.history_file.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .map(|p| p.join(HISTORY_FILE_NAME))
                .unwrap_or_else(|| PathBuf::from(HISTORY_FILE_NAME))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_file() {
        let config = Config::from_toml(
            r#"
            host = "data.example.com"
            user = "alice"
            timeout_secs = 5
            history_file = "/tmp/h"

            [options]
            timezone = "Europe/Paris"
            force_records = true
            "#,
        )
        .unwrap();
        assert_eq!(config.host.as_deref(), Some("data.example.com"));
        assert_eq!(config.timeout_secs, Some(5));
        assert_eq!(config.history_path(), PathBuf::from("/tmp/h"));

        let mut store = OptionStore::new();
        config.apply_options(&mut store).unwrap();
        assert_eq!(store.timezone(), "Europe/Paris");
        assert!(store.force_records());
    }

    #[test]
    fn test_empty_file() {
        let config = Config::from_toml("").unwrap();
        assert!(config.host.is_none());
        assert!(config.options.is_empty());
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(matches!(
            Config::from_toml("hots = \"x\""),
            Err(OdsqlError::Config(_))
        ));
    }

    #[test]
    fn test_unknown_option_rejected() {
        let config = Config::from_toml("[options]\ncolour = 1").unwrap();
        let err = config.apply_options(&mut OptionStore::new()).unwrap_err();
        assert!(matches!(err, OdsqlError::UnknownOption(_)));
    }

    #[test]
    fn test_float_option_rejected() {
        let config = Config::from_toml("[options]\ndebug = 1.5").unwrap();
        let err = config.apply_options(&mut OptionStore::new()).unwrap_err();
        assert!(matches!(err, OdsqlError::Config(_)));
    }
}
