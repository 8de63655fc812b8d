use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::hasher::HashAlgorithm;

pub const DEFAULT_DATABASE: &str = "character_hashes.json";
pub const DEFAULT_DISPLAY_PREFIX: &str = "thumbnails/";
pub const DEFAULT_MAX_RESULTS: usize = 5;

/// Settings for loading references and presenting matches.
///
/// Every field has a default, so a config file only needs the keys it changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Where the reference database is read from.
    pub database: PathBuf,
    pub max_results: usize,
    /// Prepended to a reference identifier to get its display location.
    pub display_prefix: String,
    pub algorithm: HashAlgorithm,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from(DEFAULT_DATABASE),
            max_results: DEFAULT_MAX_RESULTS,
            display_prefix: DEFAULT_DISPLAY_PREFIX.to_string(),
            algorithm: HashAlgorithm::default(),
        }
    }
}

impl MatcherConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_reader(BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("database path must not be empty".into()));
        }
        Ok(())
    }
}
