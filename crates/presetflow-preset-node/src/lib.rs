//! Built-in preset for Node-style projects: `build` (webpack + babel),
//! `test` (jest) and `lint` (eslint).

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::info;

use presetflow_core::constants::{DIR_DIST, DIR_PROJECT, DIR_SRC};
use presetflow_core::{
    Action, ActionArgument, ArgType, ArgValue, BuildMode, ConfigContent, ConfigFile, ExecOptions,
    Generator, Preset, RuntimeContext,
};

pub const PRESET_NAME: &str = "node";

pub const BABEL_CONFIG: &str = ".babelrc";
pub const WEBPACK_CONFIG: &str = "webpack.config.js";
pub const JEST_CONFIG: &str = "jest.config.json";
pub const ESLINT_CONFIG: &str = ".eslintrc.json";

/// Builds the preset with its default options and actions.
pub fn preset() -> Preset {
    Preset::new(PRESET_NAME)
        .options(default_options())
        .file(BABEL_CONFIG, ConfigFile::deferred(BabelConfig))
        .action("build", build_action())
        .action("test", test_action())
        .action("lint", lint_action())
}

fn default_options() -> Value {
    json!({
        "babel": {
            "presets": ["@babel/preset-env"],
            "plugins": []
        },
        "webpack": {
            "entry": [],
            "devtool": "source-map"
        },
        "jest": {
            "testEnvironment": "node"
        },
        "eslint": {
            "extends": ["eslint:recommended"]
        }
    })
}

/// `.babelrc` built from the `babel` option.
#[derive(Debug)]
pub struct BabelConfig;

#[async_trait]
impl Generator for BabelConfig {
    async fn generate(&self, ctx: &RuntimeContext) -> Result<ConfigContent> {
        let babel = ctx.option_or("babel", json!({"presets": [], "plugins": []}));
        Ok(ConfigContent::Structured(babel))
    }
}

/// webpack configuration built from the `webpack` option, the build mode and
/// the bound `entry` argument.
#[derive(Debug)]
pub struct WebpackConfig;

#[async_trait]
impl Generator for WebpackConfig {
    async fn generate(&self, ctx: &RuntimeContext) -> Result<ConfigContent> {
        let webpack = ctx.option_or("webpack", json!({}));
        let mut entry = webpack
            .get("entry")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        if let Some(arg) = ctx.arg("entry").and_then(ArgValue::as_str) {
            entry.push(Value::String(arg.to_string()));
        }
        if entry.is_empty() {
            entry.push(Value::String(
                ctx.directory(DIR_SRC)?.join("index.js").display().to_string(),
            ));
        }

        let mode = ctx.mode();
        let devtool = match mode {
            BuildMode::Production => Value::Bool(false),
            BuildMode::Development => webpack
                .get("devtool")
                .cloned()
                .unwrap_or(Value::Bool(false)),
        };

        Ok(ConfigContent::Structured(json!({
            "mode": mode.as_str(),
            "entry": entry,
            "devtool": devtool,
            "output": {
                "path": ctx.directory(DIR_DIST)?.display().to_string(),
                "filename": "[name].js"
            },
            "module": {
                "rules": [{
                    "test": "\\.jsx?$",
                    "exclude": "node_modules",
                    "loader": "babel-loader",
                    "options": ctx.option_or("babel", json!({}))
                }]
            }
        })))
    }
}

/// eslint configuration taken verbatim from the `eslint` option.
#[derive(Debug)]
pub struct EslintConfig;

#[async_trait]
impl Generator for EslintConfig {
    async fn generate(&self, ctx: &RuntimeContext) -> Result<ConfigContent> {
        Ok(ConfigContent::Structured(ctx.option_or("eslint", json!({}))))
    }
}

/// jest configuration built from the `jest` option.
#[derive(Debug)]
pub struct JestConfig;

#[async_trait]
impl Generator for JestConfig {
    async fn generate(&self, ctx: &RuntimeContext) -> Result<ConfigContent> {
        let root = ctx.directory(DIR_PROJECT)?.display().to_string();
        let src = ctx.directory(DIR_SRC)?.display().to_string();

        let mut jest = ctx.option_or("jest", json!({}));
        if let Value::Object(map) = &mut jest {
            map.insert("rootDir".to_string(), Value::String(root));
            map.entry("roots").or_insert_with(|| json!([src]));
        }
        Ok(ConfigContent::Structured(jest))
    }
}

fn build_action() -> Action {
    Action::new(|ctx| {
        Box::pin(async move {
            ctx.write_config_file(BABEL_CONFIG).await?;
            let config = ctx.write_config_file(WEBPACK_CONFIG).await?;

            let mut argv = vec![
                "--config".to_string(),
                config.display().to_string(),
                "--mode".to_string(),
                ctx.mode().as_str().to_string(),
            ];
            if ctx.arg_or("watch", ArgValue::Boolean(false)).as_bool() == Some(true) {
                argv.push("--watch".to_string());
            }
            ctx.exec("webpack", &argv, ExecOptions::default())?.wait().await?;
            Ok(())
        })
    })
    .description("Bundle the project with webpack")
    .argument(
        "entry",
        ActionArgument::new(ArgType::String)
            .positional()
            .description("Additional entry point"),
    )
    .argument(
        "watch",
        ActionArgument::new(ArgType::Boolean)
            .short('w')
            .description("Rebuild on file changes")
            .default_value(ArgValue::Boolean(false)),
    )
    .file(WEBPACK_CONFIG, ConfigFile::deferred(WebpackConfig))
    .post_run(|ctx| {
        Box::pin(async move {
            info!("bundle written to {}", ctx.directory(DIR_DIST)?.display());
            Ok(())
        })
    })
}

fn test_action() -> Action {
    Action::new(|ctx| {
        Box::pin(async move {
            ctx.write_config_file(BABEL_CONFIG).await?;
            let config = ctx.write_config_file(JEST_CONFIG).await?;

            let mut argv = vec!["--config".to_string(), config.display().to_string()];
            if ctx.arg_or("coverage", ArgValue::Boolean(false)).as_bool() == Some(true) {
                argv.push("--coverage".to_string());
            }
            if let Some(pattern) = ctx.arg("pattern").and_then(ArgValue::as_str) {
                argv.push(pattern.to_string());
            }
            ctx.exec("jest", &argv, ExecOptions::default())?.wait().await?;
            Ok(())
        })
    })
    .description("Run unit tests with jest")
    .argument(
        "pattern",
        ActionArgument::new(ArgType::String)
            .positional()
            .description("Only run tests matching this pattern"),
    )
    .argument(
        "coverage",
        ActionArgument::new(ArgType::Boolean)
            .short('c')
            .description("Collect coverage"),
    )
    .file(JEST_CONFIG, ConfigFile::deferred(JestConfig))
    .pre_run(|ctx| {
        Box::pin(async move {
            let setup = ctx.directory(DIR_SRC)?.join("setupTests.js");
            if setup.is_file() {
                ctx.update_options(json!({
                    "jest": {"setupFilesAfterEnv": [setup.display().to_string()]}
                }));
            }
            Ok(())
        })
    })
}

fn lint_action() -> Action {
    Action::new(|ctx| {
        Box::pin(async move {
            let config = ctx.write_config_file(ESLINT_CONFIG).await?;

            let mut argv = vec![
                "--no-eslintrc".to_string(),
                "--config".to_string(),
                config.display().to_string(),
            ];
            if ctx.arg_or("fix", ArgValue::Boolean(false)).as_bool() == Some(true) {
                argv.push("--fix".to_string());
            }
            argv.push(ctx.directory(DIR_SRC)?.display().to_string());
            ctx.exec("eslint", &argv, ExecOptions::default())?.wait().await?;
            Ok(())
        })
    })
    .description("Lint sources with eslint")
    .argument(
        "fix",
        ActionArgument::new(ArgType::Boolean)
            .short('f')
            .description("Apply automatic fixes"),
    )
    .file(ESLINT_CONFIG, ConfigFile::deferred(EslintConfig))
}
