//! Builds the `pflow` command tree from a preset's action schema and binds
//! parsed values back into an argument bag.

use std::path::PathBuf;

use anyhow::Context;
use clap::parser::ValueSource;
use clap::{Arg, ArgAction, ArgMatches, Command};

use presetflow_core::constants::{
    ARG_ENV_PREFIX, CONFIG_FILE, RENDER_ARGS_FLAG, RENDER_CONFIG_COMMAND,
};
use presetflow_core::{Action, ActionArgument, ArgBag, ArgType, ArgValue, ArgumentError, Preset};

use crate::styles as s;

/// Global options, read before the preset is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Globals {
    pub cwd: PathBuf,
    pub config: PathBuf,
    pub debug: u8,
}

impl Globals {
    /// Reads the global options from `matches`, resolving `--config`
    /// against `--cwd`.
    pub fn from_matches(matches: &ArgMatches, current_dir: PathBuf) -> Self {
        let cwd = match matches.get_one::<PathBuf>("cwd") {
            Some(dir) => current_dir.join(dir),
            None => current_dir,
        };
        let config = match matches.get_one::<PathBuf>("config") {
            Some(path) => cwd.join(path),
            None => cwd.join(CONFIG_FILE),
        };
        Self {
            cwd,
            config,
            debug: matches.get_count("debug"),
        }
    }
}

/// The root command with its global options and no actions. Global options
/// must precede the action name.
pub fn root_command() -> Command {
    Command::new("pflow")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Preset-driven build actions")
        .styles(s::get_clap_styles())
        .arg(
            Arg::new("cwd")
                .long("cwd")
                .value_name("DIR")
                .value_parser(clap::value_parser!(PathBuf))
                .help("Project root (defaults to the current directory)"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("FILE")
                .value_parser(clap::value_parser!(PathBuf))
                .help("Project config file, relative to the project root"),
        )
        .arg(
            Arg::new("debug")
                .short('D')
                .long("debug")
                .action(ArgAction::Count)
                .help("Debug output (-DD for maximum verbosity)"),
        )
}

/// Parses only the global options, tolerating whatever follows them.
pub fn bootstrap<I, T>(args: I, current_dir: PathBuf) -> Globals
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let globals_only = root_command()
        .allow_external_subcommands(true)
        .disable_help_flag(true)
        .disable_version_flag(true)
        .ignore_errors(true);
    match globals_only.try_get_matches_from(args) {
        Ok(matches) => Globals::from_matches(&matches, current_dir),
        Err(_) => Globals {
            config: current_dir.join(CONFIG_FILE),
            cwd: current_dir,
            debug: 0,
        },
    }
}

/// The full command tree: one subcommand per action plus the hidden
/// `render-config` used by proxy config files.
pub fn build_cli(preset: &Preset) -> Command {
    let mut root = root_command()
        .subcommand_required(true)
        .arg_required_else_help(true)
        .after_help(format!("Preset: {}", preset.name));

    for (name, action) in &preset.actions {
        root = root.subcommand(action_command(name, action));
    }

    root.subcommand(
        Command::new(RENDER_CONFIG_COMMAND)
            .hide(true)
            .about("Render a deferred config file as JSON")
            .arg(Arg::new("action").required(true))
            .arg(Arg::new("file").required(true))
            .arg(
                Arg::new(RENDER_ARGS_FLAG)
                    .long(RENDER_ARGS_FLAG)
                    .value_name("JSON")
                    .help("Arguments bound by the invocation that wrote the proxy"),
            ),
    )
}

/// A parsed `render-config` request.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderRequest {
    pub action: String,
    pub file: String,
    pub args: ArgBag,
}

impl RenderRequest {
    pub fn from_matches(matches: &ArgMatches) -> anyhow::Result<Self> {
        let args = match matches.get_one::<String>(RENDER_ARGS_FLAG) {
            Some(raw) => serde_json::from_str(raw)
                .with_context(|| format!("invalid --{RENDER_ARGS_FLAG} value '{raw}'"))?,
            None => ArgBag::new(),
        };
        Ok(Self {
            action: matches.get_one::<String>("action").cloned().unwrap_or_default(),
            file: matches.get_one::<String>("file").cloned().unwrap_or_default(),
            args,
        })
    }
}

/// Builds the subcommand for a single action.
pub fn action_command(name: &str, action: &Action) -> Command {
    let mut command = Command::new(name.to_string());
    if let Some(description) = &action.description {
        command = command.about(description.clone());
    }
    for (arg_name, argument) in &action.arguments {
        command = command.arg(action_arg(arg_name, argument));
    }
    command
}

fn action_arg(name: &str, argument: &ActionArgument) -> Arg {
    let mut arg = Arg::new(name.to_string()).required(argument.required);
    if let Some(description) = &argument.description {
        arg = arg.help(description.clone());
    }

    if argument.positional {
        return arg.value_name(name.to_string()).action(ArgAction::Set);
    }

    arg = arg.long(name.to_string()).env(env_var_name(name));
    if let Some(short) = argument.short {
        arg = arg.short(short);
    }

    match argument.arg_type {
        ArgType::Boolean => arg.action(ArgAction::SetTrue),
        ArgType::String | ArgType::Number => {
            arg = arg
                .action(ArgAction::Set)
                .value_name(argument.arg_type.as_str().to_uppercase());
            if let Some(default) = &argument.default_value {
                arg = arg.default_value(default.to_string());
            }
            arg
        }
    }
}

/// `PRESETFLOW_<NAME>` with dashes turned into underscores.
pub fn env_var_name(name: &str) -> String {
    format!("{}{}", ARG_ENV_PREFIX, name.to_uppercase().replace('-', "_"))
}

/// Converts parsed values into typed ones. Arguments that were not supplied
/// take their declared default, or stay unset.
pub fn bind_args(action: &Action, matches: &ArgMatches) -> Result<ArgBag, ArgumentError> {
    let mut bag = ArgBag::new();
    for (name, argument) in &action.arguments {
        let value = match argument.arg_type {
            ArgType::Boolean if !argument.positional => {
                match matches.value_source(name) {
                    Some(ValueSource::CommandLine) | Some(ValueSource::EnvVariable) => {
                        Some(ArgValue::Boolean(matches.get_flag(name)))
                    }
                    _ => argument.default_value.clone(),
                }
            }
            arg_type => match matches.get_one::<String>(name) {
                Some(raw) => Some(arg_type.parse(name, raw)?),
                None => argument.default_value.clone(),
            },
        };
        if argument.required && value.is_none() {
            return Err(ArgumentError::MissingRequired(name.clone()));
        }
        bag.insert(name.clone(), value);
    }
    Ok(bag)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demo_action() -> Action {
        Action::new(|_ctx| Box::pin(async { Ok(()) }))
            .description("Demo")
            .argument("entry", ActionArgument::new(ArgType::String).positional())
            .argument(
                "port",
                ActionArgument::new(ArgType::Number)
                    .short('p')
                    .default_value(ArgValue::Number(3000.0)),
            )
            .argument("watch", ActionArgument::new(ArgType::Boolean).short('w'))
            .argument(
                "open",
                ActionArgument::new(ArgType::Boolean).default_value(ArgValue::Boolean(true)),
            )
    }

    fn parse(args: &[&str]) -> Result<ArgBag, ArgumentError> {
        let action = demo_action();
        let matches = action_command("serve", &action)
            .try_get_matches_from(std::iter::once("serve").chain(args.iter().copied()))
            .expect("clap parse should succeed");
        bind_args(&action, &matches)
    }

    #[test]
    fn binds_typed_values_and_defaults() {
        let bag = parse(&["src/main.js", "-p", "8080", "--watch"]).unwrap();
        assert_eq!(bag["entry"], Some(ArgValue::String("src/main.js".into())));
        assert_eq!(bag["port"], Some(ArgValue::Number(8080.0)));
        assert_eq!(bag["watch"], Some(ArgValue::Boolean(true)));
        assert_eq!(bag["open"], Some(ArgValue::Boolean(true)));
    }

    #[test]
    fn unsupplied_arguments_without_defaults_stay_unset() {
        let bag = parse(&[]).unwrap();
        assert_eq!(bag["entry"], None);
        assert_eq!(bag["watch"], None);
        assert_eq!(bag["port"], Some(ArgValue::Number(3000.0)));
    }

    #[test]
    fn rejects_non_numeric_values() {
        let err = parse(&["--port", "eighty"]).unwrap_err();
        assert!(matches!(err, ArgumentError::InvalidValue { ref name, .. } if name == "port"));
    }

    #[test]
    fn positional_arguments_render_as_optional_segments() {
        let usage = action_command("serve", &demo_action())
            .render_usage()
            .to_string();
        assert!(usage.contains("[entry]"), "usage was: {usage}");
    }

    #[test]
    fn bootstrap_reads_globals_before_the_action() {
        let globals = bootstrap(
            ["pflow", "-DD", "--cwd", "app", "build", "--watch"],
            PathBuf::from("/work"),
        );
        assert_eq!(globals.cwd, PathBuf::from("/work/app"));
        assert_eq!(globals.config, PathBuf::from("/work/app/presetflow.toml"));
        assert_eq!(globals.debug, 2);
    }

    #[test]
    fn environment_variables_supply_unset_options() {
        std::env::set_var("PRESETFLOW_ENV_PORT", "9090");
        std::env::set_var("PRESETFLOW_ENV_WATCH", "true");
        let action = Action::new(|_ctx| Box::pin(async { Ok(()) }))
            .argument("env-port", ActionArgument::new(ArgType::Number))
            .argument("env-watch", ActionArgument::new(ArgType::Boolean));
        let command = action_command("serve", &action);

        let matches = command.clone().try_get_matches_from(["serve"]).unwrap();
        let bag = bind_args(&action, &matches).unwrap();
        assert_eq!(bag["env-port"], Some(ArgValue::Number(9090.0)));
        assert_eq!(bag["env-watch"], Some(ArgValue::Boolean(true)));

        let matches = command
            .try_get_matches_from(["serve", "--env-port", "1234"])
            .unwrap();
        let bag = bind_args(&action, &matches).unwrap();
        assert_eq!(bag["env-port"], Some(ArgValue::Number(1234.0)));
    }

    #[test]
    fn render_request_decodes_bound_arguments() {
        let preset = Preset::new("demo").action("serve", demo_action());
        let matches = build_cli(&preset)
            .try_get_matches_from([
                "pflow",
                "render-config",
                "serve",
                "webpack.config.js",
                "--args",
                r#"{"entry":"src/main.js","port":8080.0,"watch":null}"#,
            ])
            .unwrap();
        let (_, sub) = matches.subcommand().unwrap();
        let request = RenderRequest::from_matches(sub).unwrap();
        assert_eq!(request.action, "serve");
        assert_eq!(request.file, "webpack.config.js");
        assert_eq!(request.args["entry"], Some(ArgValue::String("src/main.js".into())));
        assert_eq!(request.args["port"], Some(ArgValue::Number(8080.0)));
        assert_eq!(request.args["watch"], None);
    }

    #[test]
    fn env_var_names_use_the_fixed_prefix() {
        assert_eq!(env_var_name("dev-server"), "PRESETFLOW_DEV_SERVER");
    }

    #[test]
    fn cli_lists_actions_and_hides_render_config() {
        let preset = Preset::new("demo").action("serve", demo_action());
        let cli = build_cli(&preset);
        let serve = cli.find_subcommand("serve").expect("serve subcommand");
        assert_eq!(serve.get_about().map(ToString::to_string).as_deref(), Some("Demo"));
        assert!(cli.find_subcommand(RENDER_CONFIG_COMMAND).unwrap().is_hide_set());
    }
}
