use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use serde_json::{json, Value};
use tracing::{debug, info, instrument};

use presetflow_core::{
    emit_used_config_files, run_action, Action, ActionError, ArgBag, ConfigFile, Preset,
    ProjectConfig, ProxyMaterializer, RuntimeContext,
};

use crate::cli::{Globals, RenderRequest};

/// Builds the runtime context for one action invocation.
///
/// Options are layered as preset defaults, then the project file, then
/// CLI-derived overrides.
pub fn create_context(
    globals: &Globals,
    project: &ProjectConfig,
    preset: &Preset,
    action_name: &str,
    action: &Action,
) -> Result<RuntimeContext> {
    let mut ctx = RuntimeContext::from_process(&globals.cwd);
    ctx.set_materializer(Arc::new(proxy_materializer(globals, action_name)));

    preset.prepare(action, &mut ctx)?;
    project.apply(&mut ctx)?;

    let mode = ctx.mode();
    ctx.update_options(json!({ "mode": mode.as_str() }));
    if globals.debug > 0 {
        ctx.update_options(json!({ "debug": true }));
    }
    debug!("context ready: {:?}", ctx);
    Ok(ctx)
}

/// Proxy configs written for `action_name` call back into this binary with
/// the same global options.
pub fn proxy_materializer(globals: &Globals, action_name: &str) -> ProxyMaterializer {
    let runner = std::env::current_exe().unwrap_or_else(|_| PathBuf::from("pflow"));
    ProxyMaterializer::new(runner, action_name)
        .with_config(&globals.config)
        .with_debug(globals.debug)
}

/// Runs the action's lifecycle, then writes every config file it touched.
#[instrument(skip(action, ctx))]
pub async fn run(
    name: &str,
    action: &Action,
    ctx: &mut RuntimeContext,
    args: ArgBag,
) -> Result<Vec<PathBuf>, ActionError> {
    ctx.update_args(args);
    info!(target: "presetflow", "run {} ({})", name, ctx.mode().as_str());
    run_action(name, action, ctx).await?;

    let written = emit_used_config_files(ctx).await?;
    debug!("{} config file(s) written", written.len());
    Ok(written)
}

/// Handles `render-config`: rebuilds the invocation described by the stub's
/// command line and renders one file.
pub async fn render(
    globals: &Globals,
    project: &ProjectConfig,
    preset: &Preset,
    request: &RenderRequest,
) -> Result<Value> {
    let action = find_action(preset, &request.action)?;
    let mut ctx = create_context(globals, project, preset, &request.action, action)?;
    ctx.update_args(request.args.clone());
    render_config(&mut ctx, &request.file).await
}

/// Evaluates `file` for the proxy stub that asked for it.
pub async fn render_config(ctx: &mut RuntimeContext, file: &str) -> Result<Value> {
    let content = match ctx.config_file_definition(file)? {
        ConfigFile::Static(content) => content,
        ConfigFile::Deferred(generator) => generator
            .generate(ctx)
            .await
            .with_context(|| format!("failed to generate '{file}'"))?,
    };
    content.to_json()
}

/// Looks up an action or explains which ones exist.
pub fn find_action<'p>(preset: &'p Preset, name: &str) -> Result<&'p Action> {
    preset.find_action(name).ok_or_else(|| {
        let known = preset.actions.keys().cloned().collect::<Vec<_>>().join(", ");
        anyhow!(
            "preset '{}' has no action '{}' (available: {})",
            preset.name,
            name,
            known
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    use presetflow_core::constants::RENDER_CONFIG_COMMAND;
    use presetflow_core::{ArgValue, ConfigContent, Generator, Stage};
    use presetflow_preset_node::WEBPACK_CONFIG;

    use crate::cli;

    struct Echo;

    #[async_trait::async_trait]
    impl Generator for Echo {
        async fn generate(&self, ctx: &RuntimeContext) -> Result<ConfigContent> {
            Ok(ConfigContent::Structured(json!({
                "mode": ctx.option("mode").cloned().unwrap_or(Value::Null),
                "debug": ctx.option_or("debug", json!(false)),
            })))
        }
    }

    fn globals(cwd: PathBuf, debug: u8) -> Globals {
        Globals {
            config: cwd.join("presetflow.toml"),
            cwd,
            debug,
        }
    }

    fn preset(post_ran: Arc<AtomicBool>, fail: bool) -> Preset {
        let action = Action::new(move |ctx| {
            Box::pin(async move {
                ctx.config_file_contents("tool.config.js").await?;
                if fail {
                    anyhow::bail!("tool exited");
                }
                Ok(())
            })
        })
        .file("tool.config.js", ConfigFile::deferred(Echo))
        .post_run(move |_ctx| {
            let post_ran = Arc::clone(&post_ran);
            Box::pin(async move {
                post_ran.store(true, Ordering::SeqCst);
                Ok(())
            })
        });
        Preset::new("demo").action("build", action)
    }

    #[tokio::test]
    async fn successful_run_writes_touched_files() {
        let dir = tempfile::tempdir().unwrap();
        let post_ran = Arc::new(AtomicBool::new(false));
        let preset = preset(Arc::clone(&post_ran), false);
        let action = find_action(&preset, "build").unwrap();
        let g = globals(dir.path().to_path_buf(), 0);
        let mut ctx = create_context(&g, &ProjectConfig::default(), &preset, "build", action).unwrap();

        let written = run("build", action, &mut ctx, ArgBag::new()).await.unwrap();
        assert!(post_ran.load(Ordering::SeqCst));
        assert_eq!(written, vec![dir.path().join(".presetflow/tool.config.js")]);
        let stub = std::fs::read_to_string(&written[0]).unwrap();
        assert!(stub.contains(r#""build","tool.config.js""#));
    }

    #[tokio::test]
    async fn failed_run_skips_post_run_and_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let post_ran = Arc::new(AtomicBool::new(false));
        let preset = preset(Arc::clone(&post_ran), true);
        let action = find_action(&preset, "build").unwrap();
        let g = globals(dir.path().to_path_buf(), 0);
        let mut ctx = create_context(&g, &ProjectConfig::default(), &preset, "build", action).unwrap();

        let err = run("build", action, &mut ctx, ArgBag::new()).await.unwrap_err();
        assert!(matches!(err, ActionError::Lifecycle { stage: Stage::Run, .. }));
        assert!(!post_ran.load(Ordering::SeqCst));
        assert!(!dir.path().join(".presetflow").exists());
    }

    #[tokio::test]
    async fn render_config_evaluates_generator_with_cli_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let preset = preset(Arc::new(AtomicBool::new(false)), false);
        let action = find_action(&preset, "build").unwrap();
        let g = globals(dir.path().to_path_buf(), 1);
        let mut ctx = create_context(&g, &ProjectConfig::default(), &preset, "build", action).unwrap();

        let rendered = render_config(&mut ctx, "tool.config.js").await.unwrap();
        assert_eq!(rendered["debug"], json!(true));
        assert!(rendered["mode"].is_string());
    }

    #[tokio::test]
    async fn proxy_render_sees_arguments_and_config_of_the_writing_run() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("custom.toml");
        std::fs::write(&config, "[options.webpack]\nentry = [\"./src/vendor.js\"]\n").unwrap();
        let g = Globals {
            cwd: dir.path().to_path_buf(),
            config: config.clone(),
            debug: 1,
        };
        let project = ProjectConfig::load_from_file(&config).unwrap();
        let preset = presetflow_preset_node::preset();
        let action = find_action(&preset, "build").unwrap();

        let mut ctx = create_context(&g, &project, &preset, "build", action).unwrap();
        ctx.update_args(ArgBag::from([
            ("entry".to_string(), Some(ArgValue::String("./src/admin.js".into()))),
            ("watch".to_string(), Some(ArgValue::Boolean(false))),
        ]));
        let argv = proxy_materializer(&g, "build")
            .render_argv(&ctx, WEBPACK_CONFIG)
            .unwrap();
        let ConfigContent::Text(stub) = ctx.config_file_contents(WEBPACK_CONFIG).await.unwrap()
        else {
            panic!("webpack config must be a proxy stub");
        };
        assert!(stub.contains(&serde_json::to_string(&argv).unwrap()));

        let command_line: Vec<String> = std::iter::once("pflow".to_string()).chain(argv).collect();
        let replayed = cli::bootstrap(&command_line, PathBuf::from("/elsewhere"));
        assert_eq!(replayed, g);

        let matches = cli::build_cli(&preset)
            .try_get_matches_from(&command_line)
            .unwrap();
        let (name, sub) = matches.subcommand().unwrap();
        assert_eq!(name, RENDER_CONFIG_COMMAND);
        let request = cli::RenderRequest::from_matches(sub).unwrap();
        let project = ProjectConfig::load_or_default(&replayed.config).unwrap();

        let rendered = render(&replayed, &project, &preset, &request).await.unwrap();
        assert_eq!(rendered["entry"], json!(["./src/vendor.js", "./src/admin.js"]));
    }

    #[test]
    fn unknown_action_lists_available_ones() {
        let preset = preset(Arc::new(AtomicBool::new(false)), false);
        let err = find_action(&preset, "deploy").unwrap_err();
        assert_eq!(
            err.to_string(),
            "preset 'demo' has no action 'deploy' (available: build)"
        );
    }
}
