//! buildprep core - toolchain bootstrap and CMake pipeline
//!
//! Provides the build orchestrator that:
//! - Captures the native toolchain environment (via `toolchain-env`)
//! - Ensures the build directory exists
//! - Runs CMake configure and build stages, failing fast
//! - Copies `compile_commands.json` to the project root

pub mod artifact;
pub mod config;
pub mod error;
pub mod fakes;
pub mod pipeline;
pub mod runner;
pub mod spec;
pub mod stage;
pub mod telemetry;

// Re-export key types
pub use artifact::{copy_compile_commands, ArtifactOutcome};
pub use config::{BuildConfig, CONFIG_FILE_NAME};
pub use error::{ConfigError, PipelineError, Result};
pub use pipeline::{BuildPipeline, PipelineReport, PipelineState, StageResult};
pub use runner::{CommandResult, CommandRunner, CommandSpec, CommandStatus, ProcessRunner};
pub use spec::{BuildSpec, COMPILE_COMMANDS_FILE};
pub use stage::BuildStage;
pub use telemetry::init_tracing;
