//! buildprep - native toolchain bootstrap and CMake driver
//!
//! Captures the MSVC developer environment (on Windows), configures and
//! builds a CMake project under it, and copies `compile_commands.json` to
//! the project root.
//!
//! ## Commands
//!
//! - `run` (default): bootstrap, configure, build, export the compilation database
//! - `configure`: bootstrap and configure only
//! - `env`: capture the toolchain environment and report it

use anyhow::{Context, Result};
use buildprep_core::{
    ArtifactOutcome, BuildConfig, BuildPipeline, BuildStage, PipelineReport, ProcessRunner,
};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use toolchain_env::{BootstrapOutcome, EnvBootstrapper, FallbackPolicy};
use tracing::{error, info, warn, Level};

#[derive(Parser)]
#[command(name = "buildprep")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Bootstrap the native toolchain and build a CMake project", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Project root (CMake source directory)
    #[arg(long, global = true, default_value = ".", env = "BUILDPREP_PROJECT_ROOT")]
    project_root: PathBuf,

    /// Config file (default: <project-root>/buildprep.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// CMake generator
    #[arg(short = 'G', long, global = true)]
    generator: Option<String>,

    /// CMake build type / configuration
    #[arg(long, global = true)]
    build_type: Option<String>,

    /// CMake executable
    #[arg(long, global = true)]
    cmake: Option<String>,

    /// Target architecture passed to vcvarsall
    #[arg(long, global = true)]
    arch: Option<String>,

    /// Fail instead of continuing when the toolchain environment cannot be captured
    #[arg(long, global = true)]
    strict: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Commands {
    /// Bootstrap, configure, build and export compile_commands.json
    Run,

    /// Bootstrap and configure only
    Configure,

    /// Capture the toolchain environment and report it
    Env {
        /// Print every captured KEY=VALUE pair
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    buildprep_core::init_tracing(cli.json, level);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("{e:#}");
            ExitCode::from(2)
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let project_root = std::path::absolute(&cli.project_root)
        .with_context(|| format!("Invalid project root {}", cli.project_root.display()))?;
    let config = load_config(&cli, &project_root)?;
    let bootstrapper = EnvBootstrapper::new(config.env.clone());

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            let pipeline = BuildPipeline::new(
                config.build_spec(&project_root),
                bootstrapper,
                Arc::new(ProcessRunner::new()),
            );
            cmd_run(pipeline).await
        }
        Commands::Configure => {
            let pipeline = BuildPipeline::new(
                config.build_spec(&project_root),
                bootstrapper,
                Arc::new(ProcessRunner::new()),
            )
            .with_stages(vec![BuildStage::Configure]);
            cmd_run(pipeline).await
        }
        Commands::Env { show } => cmd_env(&bootstrapper, show).await,
    }
}

fn load_config(cli: &Cli, project_root: &Path) -> Result<BuildConfig> {
    let config = match &cli.config {
        Some(path) => BuildConfig::load(path)?,
        None => BuildConfig::discover(project_root)?,
    };
    let mut config = config.with_env_overrides();
    apply_cli_overrides(&mut config, cli);
    Ok(config)
}

fn apply_cli_overrides(config: &mut BuildConfig, cli: &Cli) {
    if let Some(generator) = &cli.generator {
        config.generator = generator.clone();
    }
    if let Some(build_type) = &cli.build_type {
        config.build_type = build_type.clone();
    }
    if let Some(cmake) = &cli.cmake {
        config.cmake = cmake.clone();
    }
    if let Some(arch) = &cli.arch {
        config.env.arch = arch.clone();
    }
    if cli.strict {
        config.env.fallback = FallbackPolicy::Fail;
    }
}

async fn cmd_run(pipeline: BuildPipeline) -> Result<ExitCode> {
    let report = pipeline.run().await.context("Build pipeline aborted")?;
    print_summary(&report);

    Ok(if report.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}

fn print_summary(report: &PipelineReport) {
    if let BootstrapOutcome::Degraded { reason } = &report.bootstrap {
        warn!("Ran without the vendor toolchain environment: {reason}");
    }

    match report.failure_message() {
        Some(message) => error!(
            passed = report.passed_count(),
            failed = report.failed_count(),
            "Pipeline stopped: {message}"
        ),
        None => {
            let artifact = match &report.artifact {
                Some(ArtifactOutcome::Copied { .. }) => "exported",
                Some(ArtifactOutcome::Missing { .. }) => "missing",
                Some(ArtifactOutcome::CopyFailed { .. }) => "copy failed",
                None => "not reached",
            };
            info!(
                duration_ms = report.duration_ms,
                compile_commands = artifact,
                "Build finished"
            );
        }
    }
}

async fn cmd_env(bootstrapper: &EnvBootstrapper, show: bool) -> Result<ExitCode> {
    let bootstrap = bootstrapper
        .bootstrap()
        .await
        .context("Toolchain environment initialisation failed")?;

    match &bootstrap.outcome {
        BootstrapOutcome::Passthrough => {
            info!(platform = %bootstrapper.platform(), "No vendor initialisation on this platform")
        }
        BootstrapOutcome::Captured { vars } => info!(vars, "Captured toolchain environment"),
        BootstrapOutcome::Degraded { reason } => warn!("Using current environment: {reason}"),
    }

    if show {
        for (key, value) in bootstrap.env.iter() {
            println!("{}={}", key.to_string_lossy(), value.to_string_lossy());
        }
    } else {
        println!("{} variables", bootstrap.env.len());
    }

    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_default_command_is_run() {
        let cli = Cli::try_parse_from(["buildprep"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.command.unwrap_or(Commands::Run), Commands::Run);
    }

    #[test]
    fn test_env_show_flag() {
        let cli = Cli::try_parse_from(["buildprep", "env", "--show"]).unwrap();
        assert_eq!(cli.command, Some(Commands::Env { show: true }));
    }

    #[test]
    fn test_cli_overrides_config() {
        let cli = Cli::try_parse_from([
            "buildprep",
            "-G",
            "Visual Studio 18 2026",
            "--build-type",
            "Release",
            "--arch",
            "x86",
            "--strict",
            "configure",
        ])
        .unwrap();

        let mut config = BuildConfig::default();
        apply_cli_overrides(&mut config, &cli);

        assert_eq!(config.generator, "Visual Studio 18 2026");
        assert_eq!(config.build_type, "Release");
        assert_eq!(config.cmake, "cmake");
        assert_eq!(config.env.arch, "x86");
        assert_eq!(config.env.fallback, FallbackPolicy::Fail);
        assert_eq!(cli.command, Some(Commands::Configure));
    }

    #[test]
    fn test_no_flags_keep_config() {
        let cli = Cli::try_parse_from(["buildprep", "run"]).unwrap();
        let mut config = BuildConfig::default();
        apply_cli_overrides(&mut config, &cli);
        assert_eq!(config, BuildConfig::default());
    }

    #[test]
    fn test_load_config_from_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "generator = \"Unix Makefiles\"\n").unwrap();

        let cli = Cli::try_parse_from([
            "buildprep".to_string(),
            "--config".to_string(),
            path.to_string_lossy().into_owned(),
        ])
        .unwrap();
        let config = load_config(&cli, dir.path()).unwrap();
        assert_eq!(config.generator, "Unix Makefiles");
    }
}
