use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::catalogue::{CatalogueKind, compose};
use crate::error::{MtagError, Result};
use crate::models::MergeTags;
use crate::suggestion::DEFAULT_TRIGGER;
use crate::tags::validate;

pub const APP_DIR: &str = "mtag";
const CONFIG_FILE: &str = "config.toml";
const TEMPLATES_FILE: &str = "templates.md";
const LOG_FILE: &str = "mtag.log";

/// Settings read from `~/.config/mtag/config.toml`. Every key is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Characters that open the suggestion popup.
    pub trigger: String,
    /// Built-in catalogues, layered in order.
    pub catalogues: Vec<CatalogueKind>,
    /// Extra JSON catalogues layered after the built-in ones.
    pub catalogue_files: Vec<PathBuf>,
    pub templates_path: Option<PathBuf>,
    pub max_suggestions: usize,
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            trigger: DEFAULT_TRIGGER.to_string(),
            catalogues: vec![CatalogueKind::Base],
            catalogue_files: Vec::new(),
            templates_path: None,
            max_suggestions: 8,
            log_file: None,
        }
    }
}

impl Config {
    /// Reads the config at `path`, or the default location when `path` is
    /// `None`. A missing default file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (config_dir()?.join(CONFIG_FILE), false),
        };
        if !explicit && !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&path).map_err(|source| MtagError::ReadFile {
            path: path.clone(),
            source,
        })?;
        let config = Self::from_toml(&content)?;
        tracing::info!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.trigger.trim().is_empty() {
            return Err(MtagError::config("trigger must not be empty"));
        }
        if self.trigger.chars().any(char::is_whitespace) {
            return Err(MtagError::config("trigger must not contain whitespace"));
        }
        if self.max_suggestions == 0 {
            return Err(MtagError::config("max_suggestions must be at least 1"));
        }
        if self.catalogues.is_empty() && self.catalogue_files.is_empty() {
            return Err(MtagError::config("at least one catalogue is required"));
        }
        Ok(())
    }

    /// Applies command-line flags on top of the file settings. An empty
    /// catalogue list keeps the configured catalogues.
    pub fn apply_overrides(&mut self, catalogues: &[CatalogueKind], templates: Option<&Path>) -> Result<()> {
        if !catalogues.is_empty() {
            self.catalogues = catalogues.to_vec();
        }
        if let Some(path) = templates {
            self.templates_path = Some(path.to_path_buf());
        }
        self.validate()
    }

    pub fn templates_path(&self) -> Result<PathBuf> {
        match &self.templates_path {
            Some(path) => Ok(path.clone()),
            None => Ok(config_dir()?.join(TEMPLATES_FILE)),
        }
    }

    pub fn log_path(&self) -> Result<PathBuf> {
        match &self.log_file {
            Some(path) => Ok(path.clone()),
            None => Ok(config_dir()?.join(LOG_FILE)),
        }
    }

    /// The configured catalogues layered into one tree and checked.
    pub fn merge_tags(&self) -> Result<MergeTags> {
        let mut merge_tags = compose(&self.catalogues);
        for path in &self.catalogue_files {
            let content = fs::read_to_string(path).map_err(|source| MtagError::ReadFile {
                path: path.clone(),
                source,
            })?;
            let extra: MergeTags = serde_json::from_str(&content)?;
            tracing::debug!(path = %path.display(), entries = extra.len(), "layered catalogue file");
            merge_tags.merge(extra);
        }
        validate(&merge_tags)?;
        Ok(merge_tags)
    }
}

pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or(MtagError::NoHomeDir)?;
    Ok(home.join(".config").join(APP_DIR))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_file_gives_defaults() {
        assert_eq!(Config::from_toml("").unwrap(), Config::default());
    }

    #[test]
    fn reads_partial_config() {
        let config = Config::from_toml(
            r#"
trigger = "@"
catalogues = ["base", "pod"]
max_suggestions = 4
"#,
        )
        .unwrap();
        assert_eq!(config.trigger, "@");
        assert_eq!(config.catalogues, vec![CatalogueKind::Base, CatalogueKind::Pod]);
        assert_eq!(config.max_suggestions, 4);
        assert!(config.templates_path.is_none());
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            Config::from_toml("trigger = \" \""),
            Err(MtagError::Config { .. })
        ));
        assert!(matches!(
            Config::from_toml("max_suggestions = 0"),
            Err(MtagError::Config { .. })
        ));
        assert!(matches!(
            Config::from_toml("catalogues = [\"nope\"]"),
            Err(MtagError::Toml(_))
        ));
    }

    #[test]
    fn catalogue_files_layer_on_top() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("extra.json");
        fs::write(
            &path,
            r#"{ "invoice": { "name": "Invoice", "mergeTags": {
                "invoiceNumber": { "name": "Number", "value": "{{ invoice.number }}", "sample": "INV-1" }
            } } }"#,
        )
        .unwrap();
        let config = Config {
            catalogue_files: vec![path],
            ..Config::default()
        };
        let merge_tags = config.merge_tags().unwrap();
        assert_eq!(merge_tags.keys().last(), Some("invoice"));
    }

    #[test]
    fn flags_override_file_settings() {
        let mut config = Config::from_toml("catalogues = [\"base\", \"run\"]\ntemplates_path = \"/tmp/a.md\"").unwrap();
        config.apply_overrides(&[], None).unwrap();
        assert_eq!(config.catalogues, vec![CatalogueKind::Base, CatalogueKind::Run]);
        assert_eq!(config.templates_path().unwrap(), PathBuf::from("/tmp/a.md"));

        config
            .apply_overrides(&[CatalogueKind::Pod], Some(Path::new("/tmp/b.md")))
            .unwrap();
        assert_eq!(config.catalogues, vec![CatalogueKind::Pod]);
        assert_eq!(config.templates_path().unwrap(), PathBuf::from("/tmp/b.md"));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        assert!(matches!(
            Config::load(Some(&missing)),
            Err(MtagError::ReadFile { .. })
        ));
    }
}
