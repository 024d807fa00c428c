//! Error types for buildprep-core

use std::path::PathBuf;
use thiserror::Error;
use toolchain_env::EnvError;

/// Errors that abort a pipeline run before or outside the build stages.
///
/// A failing configure or build command is not an error: it is reported in
/// [`crate::PipelineReport`].
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Bootstrap failed under the strict fallback policy
    #[error("toolchain environment: {0}")]
    Env(#[from] EnvError),

    /// The build directory could not be created
    #[error("failed to create build directory {}: {source}", path.display())]
    BuildDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors while loading `buildprep.toml`
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
