//! Spawning external tools from a runtime context.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Output, Stdio};

use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStdout, Command};
use tracing::debug;

use crate::constants::{DIR_PROJECT, LOCAL_BIN_DIR};
use crate::context::RuntimeContext;
use crate::error::ActionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StdioMode {
    #[default]
    Inherit,
    Piped,
    Null,
}

impl StdioMode {
    fn to_stdio(self) -> Stdio {
        match self {
            Self::Inherit => Stdio::inherit(),
            Self::Piped => Stdio::piped(),
            Self::Null => Stdio::null(),
        }
    }
}

/// Overrides for [`RuntimeContext::exec`]. The defaults run in the `project`
/// directory, prefer binaries under `node_modules/.bin`, inherit stdio and
/// use the context's environment snapshot.
#[derive(Debug, Clone)]
pub struct ExecOptions {
    pub cwd: Option<PathBuf>,
    pub prefer_local: bool,
    pub stdio: StdioMode,
    pub env: Option<BTreeMap<String, String>>,
}

impl Default for ExecOptions {
    fn default() -> Self {
        Self {
            cwd: None,
            prefer_local: true,
            stdio: StdioMode::Inherit,
            env: None,
        }
    }
}

impl ExecOptions {
    pub fn piped() -> Self {
        Self {
            stdio: StdioMode::Piped,
            ..Self::default()
        }
    }

    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn global_only(mut self) -> Self {
        self.prefer_local = false;
        self
    }
}

/// A spawned child process.
#[derive(Debug)]
pub struct ProcessHandle {
    child: Child,
    command: String,
}

impl ProcessHandle {
    pub fn take_stdout(&mut self) -> Option<ChildStdout> {
        self.child.stdout.take()
    }

    /// Line stream over piped stdout.
    pub fn stdout_lines(&mut self) -> Option<Lines<BufReader<ChildStdout>>> {
        self.take_stdout().map(|out| BufReader::new(out).lines())
    }

    /// Waits for the process; a non-zero exit is an error.
    pub async fn wait(mut self) -> Result<ExitStatus, ActionError> {
        let status = self.child.wait().await.map_err(|e| ActionError::Execution {
            command: self.command.clone(),
            reason: format!("could not be awaited: {e}"),
        })?;
        check_status(&self.command, status)?;
        Ok(status)
    }

    /// Waits for the process and collects any piped output.
    pub async fn output(self) -> Result<Output, ActionError> {
        let command = self.command;
        let output = self
            .child
            .wait_with_output()
            .await
            .map_err(|e| ActionError::Execution {
                command: command.clone(),
                reason: format!("could not be awaited: {e}"),
            })?;
        check_status(&command, output.status)?;
        Ok(output)
    }
}

fn check_status(command: &str, status: ExitStatus) -> Result<(), ActionError> {
    if status.success() {
        return Ok(());
    }
    Err(ActionError::Execution {
        command: command.to_string(),
        reason: format!("failed with status {status}"),
    })
}

impl RuntimeContext {
    /// Spawns `binary` with `args`. See [`ExecOptions`] for the defaults.
    pub fn exec<I, S>(
        &self,
        binary: &str,
        args: I,
        options: ExecOptions,
    ) -> Result<ProcessHandle, ActionError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let cwd = match options.cwd {
            Some(cwd) => cwd,
            None => self.directory(DIR_PROJECT)?.to_path_buf(),
        };
        let program = if options.prefer_local {
            resolve_local(&cwd, binary)
        } else {
            PathBuf::from(binary)
        };
        let args: Vec<String> = args.into_iter().map(|a| a.as_ref().to_string()).collect();
        let env = options.env.as_ref().unwrap_or(self.env());

        let command = format!("{} {}", program.display(), args.join(" "))
            .trim_end()
            .to_string();
        debug!("exec: {} (cwd {})", command, cwd.display());

        let mut cmd = Command::new(&program);
        cmd.args(&args)
            .current_dir(&cwd)
            .env_clear()
            .envs(env)
            .stdin(options.stdio.to_stdio())
            .stdout(options.stdio.to_stdio())
            .stderr(options.stdio.to_stdio());

        let child = cmd.spawn().map_err(|e| ActionError::Execution {
            command: command.clone(),
            reason: format!("could not be launched: {e}"),
        })?;

        Ok(ProcessHandle { child, command })
    }
}

/// Prefers `<cwd>/node_modules/.bin/<binary>` when it exists.
fn resolve_local(cwd: &Path, binary: &str) -> PathBuf {
    if binary.contains(std::path::MAIN_SEPARATOR) {
        return PathBuf::from(binary);
    }
    let local = cwd.join(LOCAL_BIN_DIR).join(binary);
    if local.is_file() {
        local
    } else {
        PathBuf::from(binary)
    }
}
