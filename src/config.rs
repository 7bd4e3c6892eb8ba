// ⚙️ Settings - TOML configuration shared by the CLI and the server
// Every field is optional in the file; missing ones take defaults

use crate::classifier::Classifier;
use crate::parser::{Columns, StatementReader};
use crate::rules::RulesConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_DB_PATH: &str = "finta.db";
pub const DEFAULT_BIND: &str = "0.0.0.0:3000";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// SQLite file holding the persisted collection
    pub db_path: PathBuf,

    /// JSON pattern tables; the embedded tables are used when unset
    pub rules_path: Option<PathBuf>,

    /// Statement header names
    pub columns: Columns,

    /// Server listen address
    pub bind: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            rules_path: None,
            columns: Columns::default(),
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

impl Settings {
    /// Read settings from `path`, or defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Settings::default());
        };

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;

        let settings = Self::from_toml_str(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        debug!(path = %path.display(), "Loaded settings");
        Ok(settings)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Invalid config TOML")
    }

    /// Classifier from `rules_path`, or the embedded tables.
    pub fn classifier(&self) -> Result<Classifier> {
        match &self.rules_path {
            Some(path) => {
                let config = RulesConfig::from_file(path)?;
                Classifier::from_config(config)
                    .with_context(|| format!("Invalid rules in {}", path.display()))
            }
            None => Classifier::with_defaults(),
        }
    }

    pub fn reader(&self) -> StatementReader {
        StatementReader::new(self.columns.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_no_path_gives_defaults() {
        let settings = Settings::load(None).unwrap();

        assert_eq!(settings, Settings::default());
        assert_eq!(settings.db_path, PathBuf::from("finta.db"));
        assert_eq!(settings.columns.amount, "Montante");
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let settings = Settings::from_toml_str(
            r#"
            db_path = "/tmp/ledger.db"

            [columns]
            date = "Date"
            "#,
        )
        .unwrap();

        assert_eq!(settings.db_path, PathBuf::from("/tmp/ledger.db"));
        assert_eq!(settings.columns.date, "Date");
        assert_eq!(settings.columns.description, "Descrição");
        assert_eq!(settings.bind, DEFAULT_BIND);
        assert!(settings.rules_path.is_none());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "bind = \"127.0.0.1:8080\"").unwrap();

        let settings = Settings::load(Some(file.path())).unwrap();
        assert_eq!(settings.bind, "127.0.0.1:8080");
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = Settings::load(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to read config"));
    }

    #[test]
    fn test_malformed_toml_is_an_error() {
        assert!(Settings::from_toml_str("db_path = [").is_err());
    }

    #[test]
    fn test_classifier_from_rules_path() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "categories": {{ "fallback": "misc", "rules": [{{ "pattern": "CAFE", "label": "coffee" }}] }},
                "entities": {{ "fallback": "someone", "rules": [] }}
            }}"#
        )
        .unwrap();

        let settings = Settings {
            rules_path: Some(file.path().to_path_buf()),
            ..Settings::default()
        };
        let classifier = settings.classifier().unwrap();

        assert_eq!(classifier.category_of("CAFE CENTRAL"), "coffee");
        assert_eq!(classifier.category_of("PINGO DOCE"), "misc");
        assert_eq!(classifier.entity_of("CAFE CENTRAL"), "someone");
    }

    #[test]
    fn test_default_classifier() {
        let classifier = Settings::default().classifier().unwrap();
        assert_eq!(classifier.category_of("UNKNOWN MERCHANT XYZ"), "🅾️ Outros");
    }
}
