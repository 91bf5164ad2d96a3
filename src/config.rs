use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use indoc::indoc;
use serde::{Deserialize, Deserializer};
use simple_expand_tilde::expand_tilde;

use crate::SortKey;

/// Expand '~' in the given path.
pub fn normalize_path(path: impl AsRef<Path>) -> Result<PathBuf> {
    expand_tilde(path.as_ref()).ok_or_else(|| anyhow!("Cannot expand ~ to a home directory"))
}

/// The application configuration as read from config.toml.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Locations of paths used by the program.
    pub paths: StoragePaths,
    /// Defaults for searching the records list.
    #[serde(default)]
    pub search: SearchOptions,
    /// Defaults for listing records.
    #[serde(default)]
    pub list: ListOptions,
}

impl AppConfig {
    /// Create a new AppConfig from raw string data.
    pub fn new(raw_data: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(raw_data)?;
        config.paths.validate()?;
        Ok(config)
    }
}

/// Paths used by the program for various purposes.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct StoragePaths {
    /// The directory holding the records and settings files.
    #[serde(deserialize_with = "deserialize_path")]
    pub storage: PathBuf,
}

impl StoragePaths {
    // Ensure the contained data is correct.
    fn validate(&self) -> Result<()> {
        if !self.storage.is_dir() {
            return Err(anyhow!(
                "The storage path {} is not a directory.",
                self.storage.display()
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SearchOptions {
    #[serde(default)]
    pub case_sensitive: bool,
}

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ListOptions {
    #[serde(default)]
    pub sort: SortKey,
}

/// Instructions on how to deserialize a path object.
fn deserialize_path<'de, D>(deserializer: D) -> Result<PathBuf, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    normalize_path(s).map_err(serde::de::Error::custom)
}

/// The starting contents of a new config.toml.
pub fn config_template() -> &'static str {
    indoc! {
        r#"
        [paths]
        storage = "/path/to/storage/directory"

        [search]
        case_sensitive = false

        [list]
        # One of date-desc, date-asc, desc-asc, desc-desc, amount-asc, amount-desc.
        sort = "date-desc"
        "#
    }
}
