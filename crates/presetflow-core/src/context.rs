//! The per-invocation runtime context shared by an action's lifecycle hooks.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::args::{ArgBag, ArgValue, Args};
use crate::config_file::{ConfigContent, ConfigFile, ConfigFiles};
use crate::constants::{DIR_DIST, DIR_DIST_CONFIG, DIR_PROJECT, DIR_SRC, DIST_CONFIG_RELATIVE};
use crate::directories::Directories;
use crate::error::{ActionError, ConfigurationError};
use crate::materialize::{Materializer, ProxyMaterializer};
use crate::mode::BuildMode;
use crate::options::Options;

/// Merged options, directories, config files and arguments for one action
/// invocation. Owned by that invocation and passed to each hook by `&mut`.
pub struct RuntimeContext {
    env: BTreeMap<String, String>,
    directories: Directories,
    options: Options,
    config_files: ConfigFiles,
    args: Args,
    materializer: Arc<dyn Materializer>,
}

impl RuntimeContext {
    /// Creates a context rooted at `project` with the `src`, `dist` and
    /// `dist.config` aliases derived from it.
    pub fn new(env: BTreeMap<String, String>, project: impl Into<PathBuf>) -> Self {
        let project = project.into();
        let mut directories = Directories::default();
        directories.set(DIR_SRC, project.join("src"));
        directories.set(DIR_DIST, project.join("dist"));
        directories.set(DIR_DIST_CONFIG, project.join(DIST_CONFIG_RELATIVE));
        directories.set(DIR_PROJECT, project);

        Self {
            env,
            directories,
            options: Options::new(),
            config_files: ConfigFiles::default(),
            args: Args::default(),
            materializer: Arc::new(ProxyMaterializer::default()),
        }
    }

    /// Creates a context from the current process environment.
    pub fn from_process(project: impl Into<PathBuf>) -> Self {
        Self::new(std::env::vars().collect(), project)
    }

    pub fn set_materializer(&mut self, materializer: Arc<dyn Materializer>) {
        self.materializer = materializer;
    }

    pub fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    pub fn env_var(&self, name: &str) -> Option<&str> {
        self.env.get(name).map(String::as_str)
    }

    pub fn mode(&self) -> BuildMode {
        BuildMode::from_env(&self.env)
    }

    pub fn update_options(&mut self, partial: Value) {
        self.options.update(partial);
    }

    pub fn option(&self, name: &str) -> Option<&Value> {
        self.options.get(name)
    }

    pub fn option_or(&self, name: &str, default: Value) -> Value {
        self.options.get_or(name, default)
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn set_directory(&mut self, alias: impl Into<String>, path: impl Into<PathBuf>) {
        self.directories.set(alias, path);
    }

    pub fn directory(&self, alias: &str) -> Result<&Path, ConfigurationError> {
        self.directories.get(alias)
    }

    pub fn set_config_file(&mut self, name: impl Into<String>, definition: ConfigFile) {
        self.config_files.set(name, definition);
    }

    /// Output path of `name` under `dist.config`. Succeeds for names that
    /// have no definition yet, leaving a placeholder for them.
    pub fn config_file_path(&mut self, name: &str) -> Result<PathBuf, ConfigurationError> {
        self.config_files.mark_used(name);
        let path = self.directories.get(DIR_DIST_CONFIG)?.join(name);
        self.config_files.reserve(name);
        Ok(path)
    }

    pub fn config_file_definition(&mut self, name: &str) -> Result<ConfigFile, ConfigurationError> {
        self.config_files.mark_used(name);
        self.config_files.definition(name).cloned()
    }

    /// Materializes the content of `name` through the context's materializer.
    #[instrument(skip(self))]
    pub async fn config_file_contents(&mut self, name: &str) -> Result<ConfigContent, ActionError> {
        let definition = self.config_file_definition(name)?;
        let path = self.config_file_path(name)?;
        let materializer = Arc::clone(&self.materializer);
        materializer
            .materialize(&*self, name, &path, &definition)
            .await
            .map_err(|source| ActionError::Materialization {
                name: name.to_string(),
                source,
            })
    }

    /// Materializes `name` and writes it to its output path.
    pub async fn write_config_file(&mut self, name: &str) -> Result<PathBuf, ActionError> {
        let content = self.config_file_contents(name).await?;
        let path = self.config_file_path(name)?;
        let bytes = content
            .to_bytes()
            .map_err(|source| ActionError::Materialization {
                name: name.to_string(),
                source,
            })?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        info!("wrote {}", path.display());
        Ok(path)
    }

    /// Distinct names passed to the path, definition or contents accessors,
    /// in first-seen order.
    pub fn used_config_files(&self) -> Vec<String> {
        self.config_files.used().map(ToOwned::to_owned).collect()
    }

    pub fn has_config_file(&self, name: &str) -> bool {
        self.config_files.is_defined(name)
    }

    pub fn update_args(&mut self, partial: ArgBag) {
        debug!("binding {} argument(s)", partial.len());
        self.args.update(partial);
    }

    pub fn arg(&self, name: &str) -> Option<&ArgValue> {
        self.args.get(name)
    }

    pub fn arg_or(&self, name: &str, default: ArgValue) -> ArgValue {
        self.args.get_or(name, default)
    }

    /// Every bound argument, including the unset ones.
    pub fn args(&self) -> &ArgBag {
        self.args.values()
    }
}

impl std::fmt::Debug for RuntimeContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeContext")
            .field("directories", &self.directories)
            .field("options", &self.options)
            .field("config_files", &self.config_files)
            .field("args", &self.args)
            .finish_non_exhaustive()
    }
}
