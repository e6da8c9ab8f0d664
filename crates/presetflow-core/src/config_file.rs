//! Named config-file artifacts and the record of which ones a run touched.

use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use indexmap::{IndexMap, IndexSet};
use serde_json::Value;

use crate::context::RuntimeContext;
use crate::error::ConfigurationError;

/// The payload of a config-file artifact.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigContent {
    Text(String),
    Bytes(Vec<u8>),
    /// Written as pretty-printed JSON.
    Structured(Value),
}

impl ConfigContent {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        match self {
            Self::Text(text) => Ok(text.as_bytes().to_vec()),
            Self::Bytes(bytes) => Ok(bytes.clone()),
            Self::Structured(value) => {
                let mut out = serde_json::to_vec_pretty(value)
                    .context("failed to serialize structured config content")?;
                out.push(b'\n');
                Ok(out)
            }
        }
    }

    /// Renders the content as a JSON value, parsing text and bytes.
    pub fn to_json(&self) -> Result<Value> {
        match self {
            Self::Structured(value) => Ok(value.clone()),
            Self::Text(text) => {
                serde_json::from_str(text).context("config content is not valid JSON")
            }
            Self::Bytes(bytes) => {
                serde_json::from_slice(bytes).context("config content is not valid JSON")
            }
        }
    }
}

/// Produces config content on demand from the current runtime context.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, ctx: &RuntimeContext) -> Result<ConfigContent>;
}

/// A registered artifact definition.
#[derive(Clone)]
pub enum ConfigFile {
    /// Content known at registration time, returned verbatim.
    Static(ConfigContent),
    /// Content produced by a generator when the artifact is consumed.
    Deferred(Arc<dyn Generator>),
}

impl ConfigFile {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Static(ConfigContent::Text(text.into()))
    }

    pub fn structured(value: Value) -> Self {
        Self::Static(ConfigContent::Structured(value))
    }

    pub fn deferred(generator: impl Generator + 'static) -> Self {
        Self::Deferred(Arc::new(generator))
    }
}

impl Debug for ConfigFile {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Static(content) => f.debug_tuple("Static").field(content).finish(),
            Self::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

/// Definitions keyed by artifact name, plus the names touched so far.
///
/// A `None` definition is the placeholder left by a path lookup for a name
/// that has not been registered yet.
#[derive(Debug, Clone, Default)]
pub struct ConfigFiles {
    definitions: IndexMap<String, Option<ConfigFile>>,
    used: IndexSet<String>,
}

impl ConfigFiles {
    pub fn set(&mut self, name: impl Into<String>, definition: ConfigFile) {
        self.definitions.insert(name.into(), Some(definition));
    }

    pub fn mark_used(&mut self, name: &str) {
        if !self.used.contains(name) {
            self.used.insert(name.to_string());
        }
    }

    pub fn reserve(&mut self, name: &str) {
        if !self.definitions.contains_key(name) {
            self.definitions.insert(name.to_string(), None);
        }
    }

    pub fn definition(&self, name: &str) -> Result<&ConfigFile, ConfigurationError> {
        self.definitions
            .get(name)
            .and_then(Option::as_ref)
            .ok_or_else(|| ConfigurationError::FileNotDefined(name.to_string()))
    }

    pub fn is_defined(&self, name: &str) -> bool {
        matches!(self.definitions.get(name), Some(Some(_)))
    }

    /// Names in the order they were first touched.
    pub fn used(&self) -> impl Iterator<Item = &str> {
        self.used.iter().map(String::as_str)
    }
}
