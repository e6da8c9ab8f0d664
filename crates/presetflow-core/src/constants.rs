//! Constants used across the Presetflow workspace.

/// The filename for a project's Presetflow configuration.
pub const CONFIG_FILE: &str = "presetflow.toml";

/// The preset used when the project file does not name one.
pub const DEFAULT_PRESET: &str = "node";

/// Directory aliases every runtime context starts with.
pub const DIR_PROJECT: &str = "project";
pub const DIR_SRC: &str = "src";
pub const DIR_DIST: &str = "dist";
pub const DIR_DIST_CONFIG: &str = "dist.config";

/// Default location of generated config files, relative to the project root.
pub const DIST_CONFIG_RELATIVE: &str = ".presetflow";

/// Where locally installed tool binaries live, relative to the project root.
pub const LOCAL_BIN_DIR: &str = "node_modules/.bin";

/// Environment variable selecting the build mode.
pub const MODE_ENV_VAR: &str = "NODE_ENV";

/// Prefix for environment variables that override action arguments.
pub const ARG_ENV_PREFIX: &str = "PRESETFLOW_";

/// File extensions whose config files are evaluated by the consuming tool.
pub const EXECUTABLE_CONFIG_EXTENSIONS: &[&str] = &["js", "cjs"];

/// Hidden CLI subcommand used by proxy config files.
pub const RENDER_CONFIG_COMMAND: &str = "render-config";

/// Long option of `render-config` holding the bound arguments as JSON.
pub const RENDER_ARGS_FLAG: &str = "args";
