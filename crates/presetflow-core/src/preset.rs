use std::path::PathBuf;

use indexmap::IndexMap;
use serde_json::{json, Value};
use tracing::debug;

use crate::action::Action;
use crate::config_file::ConfigFile;
use crate::constants::DIR_PROJECT;
use crate::context::RuntimeContext;
use crate::error::ConfigurationError;

/// A bundle of actions, default options and config-file templates for a
/// class of projects.
#[derive(Debug)]
pub struct Preset {
    pub name: String,
    pub options: Value,
    /// Alias to path relative to the project root.
    pub directories: IndexMap<String, PathBuf>,
    pub files: IndexMap<String, ConfigFile>,
    pub actions: IndexMap<String, Action>,
}

impl Preset {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            options: json!({}),
            directories: IndexMap::new(),
            files: IndexMap::new(),
            actions: IndexMap::new(),
        }
    }

    pub fn options(mut self, defaults: Value) -> Self {
        self.options = defaults;
        self
    }

    pub fn directory(mut self, alias: impl Into<String>, relative: impl Into<PathBuf>) -> Self {
        self.directories.insert(alias.into(), relative.into());
        self
    }

    pub fn file(mut self, name: impl Into<String>, definition: ConfigFile) -> Self {
        self.files.insert(name.into(), definition);
        self
    }

    pub fn action(mut self, name: impl Into<String>, action: Action) -> Self {
        self.actions.insert(name.into(), action);
        self
    }

    pub fn find_action(&self, name: &str) -> Option<&Action> {
        self.actions.get(name)
    }

    /// Layers the preset's defaults into `ctx` and registers the preset's
    /// files followed by the action's own, so action files win on name
    /// clashes.
    pub fn prepare(&self, action: &Action, ctx: &mut RuntimeContext) -> Result<(), ConfigurationError> {
        debug!("preparing context from preset '{}'", self.name);
        ctx.update_options(self.options.clone());

        let project = ctx.directory(DIR_PROJECT)?.to_path_buf();
        for (alias, relative) in &self.directories {
            ctx.set_directory(alias.clone(), project.join(relative));
        }

        for (name, definition) in &self.files {
            ctx.set_config_file(name.clone(), definition.clone());
        }
        action.register_files(ctx);
        Ok(())
    }
}
