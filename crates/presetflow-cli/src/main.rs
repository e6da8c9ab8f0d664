use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::ArgMatches;
use tracing::{debug, error, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use presetflow_core::constants::RENDER_CONFIG_COMMAND;
use presetflow_core::ProjectConfig;

mod cli;
mod presets;
mod runner;
mod styles;

use cli::Globals;
use styles as s;

#[tokio::main]
async fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    let current_dir = match std::env::current_dir() {
        Ok(dir) => dir,
        Err(err) => {
            eprintln!(
                "{}error:{} cannot read current directory: {err}",
                s::ERROR.render(),
                s::ERROR.render_reset()
            );
            return ExitCode::FAILURE;
        }
    };

    let globals = cli::bootstrap(&args, current_dir);
    init_tracing(globals.debug);
    debug!("global options: {:?}", globals);

    match dispatch(&globals, &args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(failure) => {
            error!(action = %failure.action, "{:#}", failure.error);
            eprintln!(
                "{}✗ {} failed:{} {:#}",
                s::ERROR.render(),
                failure.action,
                s::ERROR.render_reset(),
                failure.error
            );
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(debug: u8) {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(log_filter(debug, rust_log.as_deref()))
        .init();
}

/// `-D` enables debug output, `-DD` everything. Without `-D`, a set
/// `RUST_LOG` is used as is; otherwise the default is `info`.
fn log_filter(debug: u8, rust_log: Option<&str>) -> EnvFilter {
    let level = match debug {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::builder().parse_lossy(rust_log.unwrap_or_default());
    match rust_log {
        Some(_) if debug == 0 => filter,
        _ => filter.add_directive(level.into()),
    }
}

struct Failure {
    action: String,
    error: anyhow::Error,
}

impl Failure {
    fn new(action: impl Into<String>, error: impl Into<anyhow::Error>) -> Self {
        Self {
            action: action.into(),
            error: error.into(),
        }
    }
}

async fn dispatch(globals: &Globals, args: &[String]) -> Result<(), Failure> {
    let project = ProjectConfig::load_or_default(&globals.config)
        .with_context(|| format!("unable to load config '{}'", globals.config.display()))
        .map_err(|e| Failure::new("pflow", e))?;
    let preset = presets::load(project.preset_name()).map_err(|e| Failure::new("pflow", e))?;

    let matches = cli::build_cli(&preset).get_matches_from(args);
    let Some((name, sub)) = matches.subcommand() else {
        return Ok(());
    };

    if name == RENDER_CONFIG_COMMAND {
        return render(globals, &project, &preset, sub).await;
    }

    execute(globals, &project, &preset, name, sub)
        .await
        .map_err(|e| Failure::new(name, e))
}

async fn execute(
    globals: &Globals,
    project: &ProjectConfig,
    preset: &presetflow_core::Preset,
    name: &str,
    matches: &ArgMatches,
) -> Result<()> {
    let action = runner::find_action(preset, name)?;
    let bound = cli::bind_args(action, matches)?;
    let mut ctx = runner::create_context(globals, project, preset, name, action)?;

    let written = runner::run(name, action, &mut ctx, bound).await?;
    println!(
        "{}✓ {}{} ({} config file(s) written)",
        s::SUCCESS.render(),
        name,
        s::SUCCESS.render_reset(),
        written.len()
    );
    Ok(())
}

async fn render(
    globals: &Globals,
    project: &ProjectConfig,
    preset: &presetflow_core::Preset,
    matches: &ArgMatches,
) -> Result<(), Failure> {
    let request = cli::RenderRequest::from_matches(matches)
        .map_err(|e| Failure::new(RENDER_CONFIG_COMMAND, e))?;
    let label = format!("{RENDER_CONFIG_COMMAND} {} {}", request.action, request.file);

    let result = async {
        let rendered = runner::render(globals, project, preset, &request).await?;
        println!("{}", serde_json::to_string(&rendered)?);
        Ok::<_, anyhow::Error>(())
    }
    .await;

    result.map_err(|e| Failure::new(label, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rust_log_is_kept_without_debug_flags() {
        assert_eq!(log_filter(0, Some("warn")).to_string(), "warn");
        assert_eq!(log_filter(0, None).to_string(), "info");
    }

    #[test]
    fn debug_flags_raise_the_level() {
        assert!(log_filter(1, None).to_string().contains("debug"));
        assert!(log_filter(2, Some("presetflow=warn")).to_string().contains("trace"));
    }
}
