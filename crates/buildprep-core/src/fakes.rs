//! In-memory [`CommandRunner`] for testing
//!
//! `FakeRunner` records every command it is asked to run and answers with a
//! scripted status instead of spawning a process.

use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use toolchain_env::EnvironmentMapping;

use crate::runner::{CommandResult, CommandRunner, CommandSpec, CommandStatus};

/// A command seen by [`FakeRunner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub env: EnvironmentMapping,
}

/// Records calls; succeeds unless a rule matches.
#[derive(Debug, Default)]
pub struct FakeRunner {
    calls: Mutex<Vec<RecordedCall>>,
    rules: Vec<(String, CommandStatus)>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer with `status` for any command whose arguments contain `arg`.
    /// The first matching rule wins.
    pub fn respond_when(mut self, arg: impl Into<String>, status: CommandStatus) -> Self {
        self.rules.push((arg.into(), status));
        self
    }

    /// Commands run so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandRunner for FakeRunner {
    async fn run(&self, command: &CommandSpec<'_>) -> CommandResult {
        self.calls.lock().unwrap().push(RecordedCall {
            program: command.program.clone(),
            args: command.args.clone(),
            cwd: command.cwd.clone(),
            env: command.env.clone(),
        });

        let status = self
            .rules
            .iter()
            .find(|(arg, _)| command.args.iter().any(|a| a == arg))
            .map(|(_, status)| status.clone())
            .unwrap_or(CommandStatus::Success);

        CommandResult {
            status,
            output: String::new(),
            duration_ms: 0,
        }
    }
}
