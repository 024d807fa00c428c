//! Error types for toolchain-env

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while preparing the toolchain environment
#[derive(Error, Debug)]
pub enum EnvError {
    /// The vendor initialisation script does not exist
    #[error("vendor environment script not found: {}", .0.display())]
    ScriptNotFound(PathBuf),

    /// The script path cannot be safely interpolated into the interpreter command
    #[error("refusing to run environment script {}: {reason}", path.display())]
    UntrustedScriptPath { path: PathBuf, reason: String },

    /// The target architecture is not a plain identifier
    #[error("invalid target architecture: {0:?}")]
    InvalidArch(String),

    /// The command interpreter could not be started
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The script did not finish within the configured limit
    #[error("environment initialisation timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The script (or the dump command) exited nonzero
    #[error("environment script exited with code {exit_code}: {stderr}")]
    ScriptFailed { exit_code: i32, stderr: String },

    /// IO error while waiting on the interpreter
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
