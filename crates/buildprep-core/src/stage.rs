//! Pipeline stage definitions.

use crate::runner::CommandSpec;
use crate::spec::BuildSpec;
use serde::{Deserialize, Serialize};
use toolchain_env::EnvironmentMapping;

/// The two required stages, in execution order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BuildStage {
    /// cmake -S <root> -B <build> -G <generator> -DCMAKE_BUILD_TYPE=<type> -DCMAKE_EXPORT_COMPILE_COMMANDS=ON
    Configure,

    /// cmake --build <build> --config <type>
    Build,
}

impl BuildStage {
    /// All stages in order.
    pub const ALL: [BuildStage; 2] = [BuildStage::Configure, BuildStage::Build];

    /// Get the stage name as a string.
    pub fn name(&self) -> &'static str {
        match self {
            BuildStage::Configure => "configure",
            BuildStage::Build => "build",
        }
    }

    /// Get the stage's command, run from the project root under `env`.
    pub fn command<'a>(&self, spec: &BuildSpec, env: &'a EnvironmentMapping) -> CommandSpec<'a> {
        let build_dir = spec.build_dir.to_string_lossy().into_owned();
        let cmd = CommandSpec::new(spec.cmake.clone(), env).current_dir(spec.project_root.clone());
        match self {
            BuildStage::Configure => cmd.args([
                "-S".to_string(),
                spec.project_root.to_string_lossy().into_owned(),
                "-B".to_string(),
                build_dir,
                "-G".to_string(),
                spec.generator.clone(),
                format!("-DCMAKE_BUILD_TYPE={}", spec.build_type),
                "-DCMAKE_EXPORT_COMPILE_COMMANDS=ON".to_string(),
            ]),
            BuildStage::Build => cmd.args([
                "--build".to_string(),
                build_dir,
                "--config".to_string(),
                spec.build_type.clone(),
            ]),
        }
    }

    pub fn start_message(&self) -> &'static str {
        match self {
            BuildStage::Configure => "Configuring CMake project",
            BuildStage::Build => "Building project",
        }
    }

    pub fn success_message(&self) -> &'static str {
        match self {
            BuildStage::Configure => "CMake configuration succeeded",
            BuildStage::Build => "Project build succeeded",
        }
    }

    pub fn failure_message(&self) -> &'static str {
        match self {
            BuildStage::Configure => "configuration failed",
            BuildStage::Build => "build failed",
        }
    }
}

impl std::fmt::Display for BuildStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
