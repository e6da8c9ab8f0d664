use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::constants::MODE_ENV_VAR;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    Development,
    Production,
}

impl Default for BuildMode {
    fn default() -> Self {
        Self::Development
    }
}

impl BuildMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
        }
    }

    /// Reads the mode from an environment snapshot; unknown values fall back
    /// to development.
    pub fn from_env(env: &BTreeMap<String, String>) -> Self {
        match env.get(MODE_ENV_VAR).map(String::as_str) {
            None | Some("") | Some("development") => Self::Development,
            Some("production") => Self::Production,
            Some(other) => {
                warn!("unknown {} '{}', using development", MODE_ENV_VAR, other);
                Self::Development
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(value: Option<&str>) -> BTreeMap<String, String> {
        value
            .map(|v| BTreeMap::from([(MODE_ENV_VAR.to_string(), v.to_string())]))
            .unwrap_or_default()
    }

    #[test]
    fn defaults_to_development() {
        assert_eq!(BuildMode::from_env(&env(None)), BuildMode::Development);
        assert_eq!(BuildMode::from_env(&env(Some("staging"))), BuildMode::Development);
    }

    #[test]
    fn reads_production() {
        assert_eq!(BuildMode::from_env(&env(Some("production"))), BuildMode::Production);
    }
}
