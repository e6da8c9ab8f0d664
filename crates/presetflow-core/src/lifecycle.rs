//! Sequencing of an action's `pre_run -> run -> post_run` hooks.

use std::fmt::{Display, Formatter};
use std::path::PathBuf;

use tracing::{debug, instrument};

use crate::action::{Action, Hook};
use crate::context::RuntimeContext;
use crate::error::ActionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    PreRun,
    Run,
    PostRun,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PreRun => "preRun",
            Self::Run => "run",
            Self::PostRun => "postRun",
        }
    }
}

impl Display for Stage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Idle,
    Running(Stage),
    Done,
    Failed(Stage),
}

/// One invocation of an action against one runtime context.
#[derive(Debug)]
pub struct Lifecycle<'a> {
    name: &'a str,
    action: &'a Action,
    state: LifecycleState,
}

impl<'a> Lifecycle<'a> {
    pub fn new(name: &'a str, action: &'a Action) -> Self {
        Self {
            name,
            action,
            state: LifecycleState::Idle,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Runs each defined stage in order. The first failure stops the
    /// sequence; later stages never run.
    #[instrument(skip(self, ctx), fields(action = self.name))]
    pub async fn execute(&mut self, ctx: &mut RuntimeContext) -> Result<(), ActionError> {
        let stages: [(Stage, Option<&Hook>); 3] = [
            (Stage::PreRun, self.action.pre_run.as_ref()),
            (Stage::Run, Some(&self.action.run)),
            (Stage::PostRun, self.action.post_run.as_ref()),
        ];

        for (stage, hook) in stages {
            let Some(hook) = hook else {
                debug!("{} not defined, skipping", stage);
                continue;
            };
            self.state = LifecycleState::Running(stage);
            debug!("entering {}", stage);
            if let Err(source) = hook(&mut *ctx).await {
                self.state = LifecycleState::Failed(stage);
                return Err(ActionError::Lifecycle {
                    action: self.name.to_string(),
                    stage,
                    source,
                });
            }
        }

        self.state = LifecycleState::Done;
        debug!("done");
        Ok(())
    }
}

/// Runs `action` to completion or first failure.
pub async fn run_action(
    name: &str,
    action: &Action,
    ctx: &mut RuntimeContext,
) -> Result<(), ActionError> {
    Lifecycle::new(name, action).execute(ctx).await
}

/// Writes every used config file that has a definition. Names that were only
/// ever path-queried are skipped.
pub async fn emit_used_config_files(ctx: &mut RuntimeContext) -> Result<Vec<PathBuf>, ActionError> {
    let mut written = Vec::new();
    for name in ctx.used_config_files() {
        if !ctx.has_config_file(&name) {
            debug!("{} was requested but never defined, not writing", name);
            continue;
        }
        written.push(ctx.write_config_file(&name).await?);
    }
    Ok(written)
}
