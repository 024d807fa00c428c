//! Bootstrap → configure → build → export pipeline.

use crate::artifact::{copy_compile_commands, ArtifactOutcome};
use crate::error::{PipelineError, Result};
use crate::runner::{CommandResult, CommandRunner};
use crate::spec::BuildSpec;
use crate::stage::BuildStage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use toolchain_env::{Bootstrap, BootstrapOutcome, EnvBootstrapper};
use tracing::{debug, error, info};

/// Progress through a run. A failed run stops at the last state it reached.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Start,
    EnvironmentReady,
    BuildDirEnsured,
    Configured,
    Built,
    ArtifactCopied,
    Done,
}

impl PipelineState {
    /// State reached once `stage` has succeeded.
    fn after(stage: BuildStage) -> Self {
        match stage {
            BuildStage::Configure => PipelineState::Configured,
            BuildStage::Build => PipelineState::Built,
        }
    }
}

/// Result of one stage.
#[derive(Debug, Clone)]
pub struct StageResult {
    pub stage: BuildStage,
    pub result: CommandResult,
}

impl StageResult {
    pub fn passed(&self) -> bool {
        self.result.success()
    }
}

/// Result of a complete pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    /// Whether every required stage passed.
    pub success: bool,

    /// Last state reached.
    pub state: PipelineState,

    /// Stage that ended the run, if any.
    pub failed_stage: Option<BuildStage>,

    /// Results of the stages that ran, in order.
    pub stages: Vec<StageResult>,

    /// Outcome of the compilation database copy (`None` if not reached).
    pub artifact: Option<ArtifactOutcome>,

    pub bootstrap: BootstrapOutcome,

    /// Total duration in milliseconds.
    pub duration_ms: u64,
}

impl PipelineReport {
    /// Number of stages that passed.
    pub fn passed_count(&self) -> usize {
        self.stages.iter().filter(|s| s.passed()).count()
    }

    /// Number of stages that failed.
    pub fn failed_count(&self) -> usize {
        self.stages.iter().filter(|s| !s.passed()).count()
    }

    /// `configuration failed` / `build failed`, if the run failed.
    pub fn failure_message(&self) -> Option<&'static str> {
        self.failed_stage.map(|stage| stage.failure_message())
    }

    /// Whether `stage` ran at all.
    pub fn ran(&self, stage: BuildStage) -> bool {
        self.stages.iter().any(|s| s.stage == stage)
    }
}

/// Fail-fast build orchestrator.
///
/// Runs the environment bootstrap once and threads the resulting mapping
/// through every stage command.
pub struct BuildPipeline {
    spec: BuildSpec,
    bootstrapper: EnvBootstrapper,
    runner: Arc<dyn CommandRunner>,
    stages: Vec<BuildStage>,
}

impl BuildPipeline {
    pub fn new(spec: BuildSpec, bootstrapper: EnvBootstrapper, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            spec,
            bootstrapper,
            runner,
            stages: BuildStage::ALL.to_vec(),
        }
    }

    /// Restrict the run to a prefix of the stages (e.g. configure only).
    pub fn with_stages(mut self, stages: Vec<BuildStage>) -> Self {
        self.stages = stages;
        self
    }

    /// Execute the pipeline.
    ///
    /// Errors only for failures outside the stages: a strict bootstrap
    /// failure or an unusable build directory. A failing stage ends the run
    /// with `success == false`; a missing or uncopyable compilation database
    /// does not affect `success`.
    pub async fn run(&self) -> Result<PipelineReport> {
        let start = Instant::now();
        info!(project_root = %self.spec.project_root.display(), "Starting build pipeline");

        let mut state = PipelineState::Start;
        let Bootstrap { env, outcome } = self.bootstrapper.bootstrap().await?;
        advance(&mut state, PipelineState::EnvironmentReady);

        tokio::fs::create_dir_all(&self.spec.build_dir).await.map_err(|source| {
            error!(path = %self.spec.build_dir.display(), error = %source, "Cannot create build directory");
            PipelineError::BuildDir {
                path: self.spec.build_dir.clone(),
                source,
            }
        })?;
        advance(&mut state, PipelineState::BuildDirEnsured);

        let mut stage_results = Vec::new();
        for stage in &self.stages {
            info!(stage = %stage, "{}...", stage.start_message());
            let result = self.runner.run(&stage.command(&self.spec, &env)).await;
            let passed = result.success();
            stage_results.push(StageResult {
                stage: *stage,
                result,
            });

            if !passed {
                error!(stage = %stage, "CMake {}", stage.failure_message());
                return Ok(PipelineReport {
                    success: false,
                    state,
                    failed_stage: Some(*stage),
                    stages: stage_results,
                    artifact: None,
                    bootstrap: outcome,
                    duration_ms: start.elapsed().as_millis() as u64,
                });
            }

            info!(stage = %stage, "{}", stage.success_message());
            advance(&mut state, PipelineState::after(*stage));
        }

        let artifact = copy_compile_commands(
            &self.spec.compile_commands_src(),
            &self.spec.compile_commands_dst(),
        )
        .await;
        if artifact.is_copied() {
            advance(&mut state, PipelineState::ArtifactCopied);
        }
        advance(&mut state, PipelineState::Done);

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(duration_ms, ?state, "Build pipeline completed successfully");

        Ok(PipelineReport {
            success: true,
            state,
            failed_stage: None,
            stages: stage_results,
            artifact: Some(artifact),
            bootstrap: outcome,
            duration_ms,
        })
    }
}

fn advance(state: &mut PipelineState, next: PipelineState) {
    debug!(from = ?*state, to = ?next, "Pipeline state");
    *state = next;
}
