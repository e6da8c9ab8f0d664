use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::constants::{DEFAULT_PRESET, DIR_PROJECT};
use crate::context::RuntimeContext;

/// Contents of a project's `presetflow.toml`.
#[derive(Debug, Deserialize, Default)]
pub struct ProjectConfig {
    #[serde(default)]
    pub project: ProjectSection,
    /// Alias overrides, relative to the project root unless absolute.
    #[serde(default)]
    pub directories: BTreeMap<String, PathBuf>,
    /// Option tree layered over the preset defaults.
    pub options: Option<Value>,
}

#[derive(Debug, Deserialize, Default)]
pub struct ProjectSection {
    pub name: Option<String>,
    pub preset: Option<String>,
}

impl ProjectConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let cfg = toml::from_str::<Self>(&text)
            .with_context(|| format!("failed to parse TOML config: {}", path.display()))?;
        Ok(cfg)
    }

    /// Loads `path` if it exists, otherwise returns an empty config.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("no project config at {}, using preset defaults", path.display());
            return Ok(Self::default());
        }
        Self::load_from_file(path)
    }

    pub fn preset_name(&self) -> &str {
        self.project.preset.as_deref().unwrap_or(DEFAULT_PRESET)
    }

    /// Layers the project's directories and options into `ctx`.
    pub fn apply(&self, ctx: &mut RuntimeContext) -> Result<()> {
        let project = ctx.directory(DIR_PROJECT)?.to_path_buf();
        for (alias, path) in &self.directories {
            ctx.set_directory(alias.clone(), project.join(path));
        }
        if let Some(options) = &self.options {
            ctx.update_options(options.clone());
        }
        Ok(())
    }
}
