//! Utilities for running external tools with proper error handling and timeouts

use super::interrupt::Interrupt;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::time::Duration;
use tracing::{debug, error};

/// Errors raised while running an external tool
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Failed to execute {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{program} failed with exit code {code:?}: {stderr}")]
    Failed {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("{program} timed out after {timeout:?}")]
    TimedOut { program: String, timeout: Duration },

    #[error("{program} was interrupted")]
    Interrupted { program: String },
}

/// Description of a single command invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub envs: Vec<(String, String)>,
    /// Redirect stdout into this file instead of capturing it
    pub stdout_path: Option<PathBuf>,
    pub timeout: Option<Duration>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    /// Run a line through the platform shell
    pub fn shell(command: &str) -> Self {
        #[cfg(unix)]
        let (shell, flag) = ("sh", "-c");

        #[cfg(windows)]
        let (shell, flag) = ("cmd", "/C");

        Self::new(shell).arg(flag).arg(command)
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    pub fn stdout_to(mut self, path: &Path) -> Self {
        self.stdout_path = Some(path.to_path_buf());
        self
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Command line for log output (environment values are never included)
    pub fn display(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }
}

/// Run a command, failing on a non-zero exit status
///
/// The child is killed when the timeout passes or `interrupt` fires.
pub fn run_command(spec: &CommandSpec, interrupt: &Interrupt) -> Result<Output, CommandError> {
    let spawn_error = |source: io::Error| CommandError::Spawn {
        program: spec.program.clone(),
        source,
    };

    if interrupt.is_triggered() {
        return Err(CommandError::Interrupted {
            program: spec.program.clone(),
        });
    }

    let mut cmd = Command::new(&spec.program);
    cmd.args(&spec.args);
    cmd.stdin(Stdio::null());
    cmd.stderr(Stdio::piped());
    for (key, value) in &spec.envs {
        cmd.env(key, value);
    }

    match spec.stdout_path {
        Some(ref path) => {
            let file = File::create(path).map_err(spawn_error)?;
            cmd.stdout(Stdio::from(file));
        }
        None => {
            cmd.stdout(Stdio::piped());
        }
    }

    debug!("Running command: {}", spec.display());
    if !spec.envs.is_empty() {
        let keys: Vec<&str> = spec.envs.iter().map(|(k, _)| k.as_str()).collect();
        debug!("Command environment overrides: {}", keys.join(", "));
    }

    let output = wait_for_child(cmd, &spec.program, spec.timeout, interrupt)?;

    if killed_by_interrupt(&output) {
        // Ctrl-C in a terminal reaches the whole process group
        interrupt.trigger();
        return Err(CommandError::Interrupted {
            program: spec.program.clone(),
        });
    }

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        error!("Command failed: {}", spec.display());
        error!("Stderr: {}", stderr);
        return Err(CommandError::Failed {
            program: spec.program.clone(),
            code: output.status.code(),
            stderr,
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    if !stdout.is_empty() {
        debug!("Command output: {}", stdout.trim_end());
    }

    Ok(output)
}

/// Run a command and return stdout as string
pub fn run_command_stdout(spec: &CommandSpec, interrupt: &Interrupt) -> Result<String, CommandError> {
    let output = run_command(spec, interrupt)?;
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// Wait for the child on a private current-thread runtime; the child is killed
/// on drop when the deadline passes or the interrupt fires first.
fn wait_for_child(
    cmd: Command,
    program: &str,
    timeout: Option<Duration>,
    interrupt: &Interrupt,
) -> Result<Output, CommandError> {
    let spawn_error = |source: io::Error| CommandError::Spawn {
        program: program.to_string(),
        source,
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(spawn_error)?;

    runtime.block_on(async {
        let mut cmd = tokio::process::Command::from(cmd);
        cmd.kill_on_drop(true);
        let child = cmd.spawn().map_err(spawn_error)?;

        let deadline = async {
            match timeout {
                Some(timeout) => {
                    tokio::time::sleep(timeout).await;
                    timeout
                }
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            biased;
            _ = interrupt.triggered() => Err(CommandError::Interrupted {
                program: program.to_string(),
            }),
            timeout = deadline => Err(CommandError::TimedOut {
                program: program.to_string(),
                timeout,
            }),
            output = child.wait_with_output() => output.map_err(spawn_error),
        }
    })
}

#[cfg(unix)]
fn killed_by_interrupt(output: &Output) -> bool {
    use std::os::unix::process::ExitStatusExt;
    const SIGINT: i32 = 2;
    output.status.signal() == Some(SIGINT)
}

#[cfg(not(unix))]
fn killed_by_interrupt(_output: &Output) -> bool {
    false
}
