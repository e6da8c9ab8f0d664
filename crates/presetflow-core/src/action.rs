use std::fmt::{Debug, Formatter};

use futures_util::future::BoxFuture;
use indexmap::IndexMap;

use crate::args::ActionArgument;
use crate::config_file::ConfigFile;
use crate::context::RuntimeContext;

/// The future returned by a lifecycle hook.
pub type HookFuture<'a> = BoxFuture<'a, anyhow::Result<()>>;

/// A lifecycle hook. Receives exclusive access to the invocation's context.
pub type Hook = Box<dyn for<'a> Fn(&'a mut RuntimeContext) -> HookFuture<'a> + Send + Sync>;

/// Boxes a closure as a [`Hook`].
pub fn hook<F>(f: F) -> Hook
where
    F: for<'a> Fn(&'a mut RuntimeContext) -> HookFuture<'a> + Send + Sync + 'static,
{
    Box::new(f)
}

/// A named unit of work declared by a preset.
///
/// ```rust,ignore
/// let action = Action::new(|ctx| Box::pin(async move {
///     ctx.exec("webpack", ["--mode", "production"], ExecOptions::default())?
///         .wait()
///         .await?;
///     Ok(())
/// }))
/// .description("Bundle the project");
/// ```
pub struct Action {
    pub description: Option<String>,
    pub arguments: IndexMap<String, ActionArgument>,
    pub files: IndexMap<String, ConfigFile>,
    pub(crate) pre_run: Option<Hook>,
    pub(crate) run: Hook,
    pub(crate) post_run: Option<Hook>,
}

impl Action {
    pub fn new<F>(run: F) -> Self
    where
        F: for<'a> Fn(&'a mut RuntimeContext) -> HookFuture<'a> + Send + Sync + 'static,
    {
        Self {
            description: None,
            arguments: IndexMap::new(),
            files: IndexMap::new(),
            pre_run: None,
            run: hook(run),
            post_run: None,
        }
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    /// Declares an argument. A later declaration with the same name replaces
    /// the earlier one.
    pub fn argument(mut self, name: impl Into<String>, argument: ActionArgument) -> Self {
        self.arguments.insert(name.into(), argument);
        self
    }

    pub fn file(mut self, name: impl Into<String>, definition: ConfigFile) -> Self {
        self.files.insert(name.into(), definition);
        self
    }

    pub fn pre_run<F>(mut self, f: F) -> Self
    where
        F: for<'a> Fn(&'a mut RuntimeContext) -> HookFuture<'a> + Send + Sync + 'static,
    {
        self.pre_run = Some(Box::new(f));
        self
    }

    pub fn post_run<F>(mut self, f: F) -> Self
    where
        F: for<'a> Fn(&'a mut RuntimeContext) -> HookFuture<'a> + Send + Sync + 'static,
    {
        self.post_run = Some(Box::new(f));
        self
    }

    pub fn has_pre_run(&self) -> bool {
        self.pre_run.is_some()
    }

    pub fn has_post_run(&self) -> bool {
        self.post_run.is_some()
    }

    /// Registers this action's files into `ctx`.
    pub fn register_files(&self, ctx: &mut RuntimeContext) {
        for (name, definition) in &self.files {
            ctx.set_config_file(name.clone(), definition.clone());
        }
    }
}

impl Debug for Action {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Action")
            .field("description", &self.description)
            .field("arguments", &self.arguments)
            .field("files", &self.files.keys().collect::<Vec<_>>())
            .field("pre_run", &self.has_pre_run())
            .field("post_run", &self.has_post_run())
            .finish()
    }
}
