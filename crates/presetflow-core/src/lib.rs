//! Core logic for the Presetflow runner.
//!
//! This crate defines the runtime context shared by an action's lifecycle
//! hooks: layered options, directory aliases, the config-file registry,
//! bound arguments and process execution, plus the action and preset
//! declarations that drive it.

pub mod action;
pub mod args;
pub mod config;
pub mod config_file;
pub mod constants;
pub mod context;
pub mod directories;
pub mod error;
pub mod exec;
pub mod lifecycle;
pub mod materialize;
pub mod mode;
pub mod options;
pub mod preset;

pub use action::{hook, Action, Hook, HookFuture};
pub use args::{ActionArgument, ArgBag, ArgType, ArgValue};
pub use config::ProjectConfig;
pub use config_file::{ConfigContent, ConfigFile, Generator};
pub use context::RuntimeContext;
pub use error::{ActionError, ArgumentError, ConfigurationError};
pub use exec::{ExecOptions, ProcessHandle, StdioMode};
pub use lifecycle::{emit_used_config_files, run_action, Lifecycle, LifecycleState, Stage};
pub use materialize::{Materializer, ProxyMaterializer};
pub use mode::BuildMode;
pub use preset::Preset;
