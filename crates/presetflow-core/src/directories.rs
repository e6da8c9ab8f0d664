use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::ConfigurationError;

/// Alias to path table. Paths are stored as given; no normalization.
#[derive(Debug, Clone, Default)]
pub struct Directories {
    paths: BTreeMap<String, PathBuf>,
}

impl Directories {
    pub fn set(&mut self, alias: impl Into<String>, path: impl Into<PathBuf>) {
        self.paths.insert(alias.into(), path.into());
    }

    pub fn get(&self, alias: &str) -> Result<&Path, ConfigurationError> {
        self.paths
            .get(alias)
            .map(PathBuf::as_path)
            .ok_or_else(|| ConfigurationError::DirectoryNotDefined(alias.to_string()))
    }
}
