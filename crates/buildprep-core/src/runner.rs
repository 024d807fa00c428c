//! External command execution.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use toolchain_env::EnvironmentMapping;
use tracing::{debug, error, info};

/// A command to run without shell interpretation.
///
/// Every token reaches the program literally. The child sees exactly `env`:
/// nothing is inherited from the running process.
#[derive(Debug, Clone)]
pub struct CommandSpec<'a> {
    /// Program name or path; resolved against `PATH` from `env`.
    pub program: String,

    pub args: Vec<String>,

    /// Working directory (inherited when `None`).
    pub cwd: Option<PathBuf>,

    pub env: &'a EnvironmentMapping,
}

impl<'a> CommandSpec<'a> {
    pub fn new(program: impl Into<String>, env: &'a EnvironmentMapping) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env,
        }
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

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Program and arguments joined by spaces, for display only.
    pub fn display_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// How a command ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandStatus {
    /// Exit status zero.
    Success,

    /// The program ran and exited nonzero (-1 when killed by a signal).
    ExitFailure { exit_code: i32 },

    /// The program could not be located.
    NotFound,

    /// The program could not be started or waited on for another reason.
    Error { reason: String },
}

/// Outcome of one command.
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub status: CommandStatus,

    /// stdout and stderr, merged in arrival order.
    pub output: String,

    pub duration_ms: u64,
}

impl CommandResult {
    pub fn success(&self) -> bool {
        self.status == CommandStatus::Success
    }

    pub fn is_not_found(&self) -> bool {
        self.status == CommandStatus::NotFound
    }

    /// Exit code when the program ran to completion.
    pub fn exit_code(&self) -> Option<i32> {
        match self.status {
            CommandStatus::Success => Some(0),
            CommandStatus::ExitFailure { exit_code } => Some(exit_code),
            _ => None,
        }
    }
}

/// Runs commands for the pipeline.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run a command to completion. Failures are reported in the result,
    /// never raised.
    async fn run(&self, command: &CommandSpec<'_>) -> CommandResult;
}

/// [`CommandRunner`] that spawns real processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, command: &CommandSpec<'_>) -> CommandResult {
        info!("[CMD] {}", command.display_line());
        let start = Instant::now();
        let (status, output) = execute(command).await;
        let result = CommandResult {
            status,
            output,
            duration_ms: start.elapsed().as_millis() as u64,
        };
        trace_result(command, &result);
        result
    }
}

async fn execute(command: &CommandSpec<'_>) -> (CommandStatus, String) {
    // A missing working directory makes spawn fail with NotFound too; keep
    // that distinct from a missing program.
    if let Some(dir) = &command.cwd {
        if !dir.is_dir() {
            return (
                CommandStatus::Error {
                    reason: format!("working directory {} does not exist", dir.display()),
                },
                String::new(),
            );
        }
    }

    let mut cmd = Command::new(&command.program);
    cmd.args(&command.args)
        .env_clear()
        .envs(command.env.iter())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = &command.cwd {
        cmd.current_dir(dir);
    }

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return (CommandStatus::NotFound, String::new());
        }
        Err(e) => {
            return (
                CommandStatus::Error {
                    reason: e.to_string(),
                },
                String::new(),
            );
        }
    };

    let output = match read_merged_output(&mut child).await {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) => {
            return (
                CommandStatus::Error {
                    reason: format!("failed to read output: {e}"),
                },
                String::new(),
            );
        }
    };

    match child.wait().await {
        Ok(status) if status.success() => (CommandStatus::Success, output),
        Ok(status) => (
            CommandStatus::ExitFailure {
                exit_code: status.code().unwrap_or(-1),
            },
            output,
        ),
        Err(e) => (
            CommandStatus::Error {
                reason: format!("failed to wait for process: {e}"),
            },
            output,
        ),
    }
}

/// Interleave stdout and stderr line by line until both reach EOF.
async fn read_merged_output(child: &mut Child) -> std::io::Result<Vec<u8>> {
    let mut stdout = child.stdout.take().map(BufReader::new);
    let mut stderr = child.stderr.take().map(BufReader::new);
    let mut out_buf = Vec::new();
    let mut err_buf = Vec::new();
    let mut merged = Vec::new();

    while stdout.is_some() || stderr.is_some() {
        tokio::select! {
            read = read_line(&mut stdout, &mut out_buf), if stdout.is_some() => {
                merged.append(&mut out_buf);
                if read? == 0 {
                    stdout = None;
                }
            }
            read = read_line(&mut stderr, &mut err_buf), if stderr.is_some() => {
                merged.append(&mut err_buf);
                if read? == 0 {
                    stderr = None;
                }
            }
        }
    }

    Ok(merged)
}

// `read_until` keeps partially read bytes in `buf` if the other branch wins
// the select, so nothing is lost between iterations.
async fn read_line<R: AsyncRead + Unpin>(
    reader: &mut Option<BufReader<R>>,
    buf: &mut Vec<u8>,
) -> std::io::Result<usize> {
    match reader {
        Some(reader) => reader.read_until(b'\n', buf).await,
        None => Ok(0),
    }
}

fn trace_result(command: &CommandSpec<'_>, result: &CommandResult) {
    match &result.status {
        CommandStatus::Success => {
            if !result.output.trim().is_empty() {
                info!("{}", result.output.trim_end());
            }
            debug!(program = %command.program, duration_ms = result.duration_ms, "Command succeeded");
        }
        CommandStatus::ExitFailure { exit_code } => {
            error!(
                program = %command.program,
                exit_code,
                "Command failed:\n{}",
                result.output.trim_end()
            );
        }
        CommandStatus::NotFound => {
            error!(program = %command.program, "Command not found: {}", command.program);
        }
        CommandStatus::Error { reason } => {
            error!(program = %command.program, "Could not run command: {reason}");
        }
    }
}
