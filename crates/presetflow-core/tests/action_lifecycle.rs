use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use presetflow_core::{
    emit_used_config_files, run_action, Action, ActionError, ConfigContent, ConfigFile,
    RuntimeContext, Stage,
};

fn ctx(project: &std::path::Path) -> RuntimeContext {
    RuntimeContext::new(BTreeMap::new(), project)
}

#[tokio::test]
async fn run_receives_bytes_registered_in_pre_run() {
    let dir = tempfile::tempdir().unwrap();
    let seen: Arc<Mutex<Option<ConfigContent>>> = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&seen);

    let action = Action::new(move |ctx| {
        let sink = Arc::clone(&sink);
        Box::pin(async move {
            let content = ctx.config_file_contents("tool.bin").await?;
            *sink.lock().unwrap() = Some(content);
            Ok(())
        })
    })
    .pre_run(|ctx| {
        Box::pin(async move {
            ctx.set_config_file(
                "tool.bin",
                ConfigFile::Static(ConfigContent::Bytes(vec![0, 159, 146, 150])),
            );
            Ok(())
        })
    });

    let mut ctx = ctx(dir.path());
    run_action("build", &action, &mut ctx).await.unwrap();

    assert_eq!(
        *seen.lock().unwrap(),
        Some(ConfigContent::Bytes(vec![0, 159, 146, 150]))
    );
}

#[tokio::test]
async fn rejected_run_never_reaches_post_run() {
    let dir = tempfile::tempdir().unwrap();
    let post_ran = Arc::new(Mutex::new(false));
    let flag = Arc::clone(&post_ran);

    let action = Action::new(|_ctx| {
        Box::pin(async { Err::<(), _>(anyhow::anyhow!("compiler crashed")) })
    })
    .post_run(move |_ctx| {
        let flag = Arc::clone(&flag);
        Box::pin(async move {
            *flag.lock().unwrap() = true;
            Ok(())
        })
    });

    let err = run_action("build", &action, &mut ctx(dir.path()))
        .await
        .unwrap_err();

    assert!(!*post_ran.lock().unwrap());
    match err {
        ActionError::Lifecycle { action, stage, source } => {
            assert_eq!(action, "build");
            assert_eq!(stage, Stage::Run);
            assert_eq!(source.to_string(), "compiler crashed");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn only_touched_and_defined_files_are_written() {
    let dir = tempfile::tempdir().unwrap();
    let action = Action::new(|ctx| {
        Box::pin(async move {
            ctx.config_file_definition(".babelrc")?;
            ctx.config_file_path("not-yet-defined.json")?;
            Ok(())
        })
    })
    .file(".babelrc", ConfigFile::text("{\"presets\":[\"env\"]}"))
    .file(".eslintrc.json", ConfigFile::text("{}"));

    let mut ctx = ctx(dir.path());
    action.register_files(&mut ctx);
    run_action("build", &action, &mut ctx).await.unwrap();

    let written = emit_used_config_files(&mut ctx).await.unwrap();
    let config_dir = dir.path().join(".presetflow");
    assert_eq!(written, vec![config_dir.join(".babelrc")]);
    assert_eq!(
        std::fs::read_to_string(config_dir.join(".babelrc")).unwrap(),
        "{\"presets\":[\"env\"]}"
    );
    assert!(!config_dir.join(".eslintrc.json").exists());
    assert!(!config_dir.join("not-yet-defined.json").exists());
}
