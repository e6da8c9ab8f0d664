//! Turns registered definitions into artifact content.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::config_file::{ConfigContent, ConfigFile};
use crate::constants::{
    DIR_PROJECT, EXECUTABLE_CONFIG_EXTENSIONS, RENDER_ARGS_FLAG, RENDER_CONFIG_COMMAND,
};
use crate::context::RuntimeContext;

/// Produces the content of a config-file artifact from its definition.
#[async_trait]
pub trait Materializer: Send + Sync {
    async fn materialize(
        &self,
        ctx: &RuntimeContext,
        name: &str,
        path: &Path,
        definition: &ConfigFile,
    ) -> Result<ConfigContent>;
}

/// Default materializer.
///
/// Static content is returned verbatim. A deferred definition whose output is
/// an executable config (`.js`, `.cjs`) becomes a proxy stub that re-runs the
/// generator through `<runner> ... render-config <action> <name>` when the
/// consuming tool loads it. The stub's command line carries the project root,
/// config file, debug level and bound arguments of the invocation that wrote
/// it. Any other deferred definition is generated immediately.
#[derive(Debug, Clone)]
pub struct ProxyMaterializer {
    runner: PathBuf,
    action: Option<String>,
    config: Option<PathBuf>,
    debug: u8,
}

impl Default for ProxyMaterializer {
    fn default() -> Self {
        Self {
            runner: PathBuf::from("pflow"),
            action: None,
            config: None,
            debug: 0,
        }
    }
}

impl ProxyMaterializer {
    pub fn new(runner: impl Into<PathBuf>, action: impl Into<String>) -> Self {
        Self {
            runner: runner.into(),
            action: Some(action.into()),
            ..Self::default()
        }
    }

    /// Project config file the rendering process should load.
    pub fn with_config(mut self, path: impl Into<PathBuf>) -> Self {
        self.config = Some(path.into());
        self
    }

    pub fn with_debug(mut self, level: u8) -> Self {
        self.debug = level;
        self
    }

    /// Arguments passed to the runner to render `name` in a fresh process.
    pub fn render_argv(&self, ctx: &RuntimeContext, name: &str) -> Result<Vec<String>> {
        let action = self
            .action
            .as_deref()
            .ok_or_else(|| anyhow!("no action bound for proxy config '{name}'"))?;
        let project = ctx.directory(DIR_PROJECT)?;

        let mut argv = vec!["--cwd".to_string(), project.display().to_string()];
        if let Some(config) = &self.config {
            argv.push("--config".to_string());
            argv.push(config.display().to_string());
        }
        if self.debug > 0 {
            argv.push(format!("-{}", "D".repeat(usize::from(self.debug))));
        }
        argv.extend([
            RENDER_CONFIG_COMMAND.to_string(),
            action.to_string(),
            name.to_string(),
        ]);
        if !ctx.args().is_empty() {
            let sorted: BTreeMap<_, _> = ctx.args().iter().collect();
            argv.push(format!("--{RENDER_ARGS_FLAG}"));
            argv.push(serde_json::to_string(&sorted)?);
        }
        Ok(argv)
    }
}

#[async_trait]
impl Materializer for ProxyMaterializer {
    #[instrument(skip(self, ctx, definition))]
    async fn materialize(
        &self,
        ctx: &RuntimeContext,
        name: &str,
        path: &Path,
        definition: &ConfigFile,
    ) -> Result<ConfigContent> {
        let generator = match definition {
            ConfigFile::Static(content) => return Ok(content.clone()),
            ConfigFile::Deferred(generator) => generator,
        };

        if !is_executable_config(path) {
            debug!("generating {} eagerly", name);
            return generator.generate(ctx).await;
        }

        let argv = self.render_argv(ctx, name)?;
        debug!("emitting proxy for {}: {:?}", name, argv);
        proxy_stub(&self.runner, &argv).map(ConfigContent::Text)
    }
}

/// Whether the consuming tool evaluates files at `path` as code.
pub fn is_executable_config(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| EXECUTABLE_CONFIG_EXTENSIONS.contains(&ext))
}

fn proxy_stub(runner: &Path, argv: &[String]) -> Result<String> {
    let argv = serde_json::to_string(argv)?;
    let runner = serde_json::to_string(&runner.to_string_lossy())?;

    Ok(format!(
        r#"// Generated by presetflow. Rendered when loaded by the consuming tool.
const {{ execFileSync }} = require("child_process");

module.exports = JSON.parse(
  execFileSync({runner}, {argv}, {{
    encoding: "utf8",
    stdio: ["ignore", "pipe", "inherit"],
  }})
);
"#
    ))
}
