//! Seeding configuration: built-in defaults, an optional YAML file, then CLI/env overrides.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::permission_profile::BUILTIN_PERMISSIONS;
use crate::data::tag::FALLBACK_LOCALE;
use crate::data::{CatalogKind, PermissionCatalog};

pub const DEFAULT_DATA_DIR: &str = "resources/data";
pub const DEFAULT_STORE_DIR: &str = "var/seedbank";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedConfig {
    /// Locales every tag title is populated for. Must include `en`.
    pub locales: Vec<String>,
    /// Known permission keys; `all` in a profile row expands to this list.
    pub permissions: Vec<String>,
    /// Root of the per-catalog default input directories.
    pub data_dir: PathBuf,
    /// Directory of the JSON store.
    pub store_dir: PathBuf,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            locales: vec!["en".to_string(), "es".to_string(), "gl".to_string()],
            permissions: BUILTIN_PERMISSIONS.iter().map(|key| key.to_string()).collect(),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            store_dir: PathBuf::from(DEFAULT_STORE_DIR),
        }
    }
}

impl SeedConfig {
    /// Loads a YAML file; keys it omits keep their defaults.
    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: SeedConfig =
            serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults, or the given YAML file when present.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_yaml_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.locales.is_empty() {
            return Err(ConfigError::Invalid("at least one locale is required".into()));
        }
        if !self.locales.iter().any(|locale| locale == FALLBACK_LOCALE) {
            return Err(ConfigError::Invalid(format!(
                "locales must include the fallback locale '{FALLBACK_LOCALE}'"
            )));
        }
        Ok(())
    }

    pub fn with_data_dir(mut self, dir: Option<PathBuf>) -> Self {
        if let Some(dir) = dir {
            self.data_dir = dir;
        }
        self
    }

    pub fn with_store_dir(mut self, dir: Option<PathBuf>) -> Self {
        if let Some(dir) = dir {
            self.store_dir = dir;
        }
        self
    }

    /// Directory scanned for a catalog when no explicit file is given.
    pub fn catalog_dir(&self, kind: CatalogKind) -> PathBuf {
        self.data_dir.join(kind.dir_name())
    }

    pub fn permission_catalog(&self) -> PermissionCatalog {
        PermissionCatalog::from_keys(self.permissions.iter().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::unique_temp_dir;

    #[test]
    fn partial_yaml_keeps_defaults() {
        let dir = unique_temp_dir("config-partial");
        let path = dir.join("seedbank.yaml");
        fs::write(&path, "locales: [en, fr]\npermissions: [view, edit]\n").expect("fixture");

        let config = SeedConfig::from_yaml_file(&path).expect("config loads");
        assert_eq!(config.locales, vec!["en", "fr"]);
        assert!(config.permission_catalog().contains("edit"));
        assert_eq!(config.data_dir, PathBuf::from(DEFAULT_DATA_DIR));
        assert_eq!(
            config.catalog_dir(CatalogKind::PermissionProfile),
            PathBuf::from(DEFAULT_DATA_DIR).join("permissionprofiles")
        );
    }

    #[test]
    fn locales_without_english_are_rejected() {
        let dir = unique_temp_dir("config-no-en");
        let path = dir.join("seedbank.yaml");
        fs::write(&path, "locales: [es]\n").expect("fixture");
        assert!(matches!(
            SeedConfig::from_yaml_file(&path),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn overrides_replace_directories() {
        let config = SeedConfig::default()
            .with_data_dir(Some(PathBuf::from("/srv/seed")))
            .with_store_dir(None);
        assert_eq!(config.catalog_dir(CatalogKind::Tag), PathBuf::from("/srv/seed/tags"));
        assert_eq!(config.store_dir, PathBuf::from(DEFAULT_STORE_DIR));
    }
}
