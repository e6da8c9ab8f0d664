use thiserror::Error;

use crate::lifecycle::Stage;

/// Lookups against the runtime context that reference something never registered.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("directory '{0}' is not defined")]
    DirectoryNotDefined(String),
    #[error("config file '{0}' is not defined")]
    FileNotDefined(String),
}

/// Raw command-line values that do not fit an action's argument schema.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ArgumentError {
    #[error("argument '{name}' expects a {expected}, got '{raw}'")]
    InvalidValue {
        name: String,
        expected: &'static str,
        raw: String,
    },
    #[error("argument '{0}' is required")]
    MissingRequired(String),
}

#[derive(Debug, Error)]
pub enum ActionError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Argument(#[from] ArgumentError),
    #[error("failed to materialize config file '{name}'")]
    Materialization {
        name: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("command '{command}' {reason}")]
    Execution { command: String, reason: String },
    #[error("{stage} stage of action '{action}' failed")]
    Lifecycle {
        action: String,
        stage: Stage,
        #[source]
        source: anyhow::Error,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
