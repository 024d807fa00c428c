//! Build specification: where the project lives and how CMake is invoked.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Compilation database file name, both in the build tree and the project root.
pub const COMPILE_COMMANDS_FILE: &str = "compile_commands.json";

pub const DEFAULT_BUILD_DIR: &str = "build";
pub const DEFAULT_GENERATOR: &str = "Ninja";
pub const DEFAULT_BUILD_TYPE: &str = "Debug";
pub const DEFAULT_CMAKE: &str = "cmake";

/// Everything the configure and build stages need.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuildSpec {
    /// CMake source directory; also receives the copied compilation database.
    pub project_root: PathBuf,

    pub build_dir: PathBuf,

    /// CMake generator (`-G`).
    pub generator: String,

    /// `CMAKE_BUILD_TYPE` and the `--config` of the build step.
    pub build_type: String,

    /// CMake executable, resolved against the captured `PATH`.
    pub cmake: String,
}

impl BuildSpec {
    /// Spec with default settings and `<project_root>/build` as build directory.
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        let project_root = project_root.into();
        Self {
            build_dir: project_root.join(DEFAULT_BUILD_DIR),
            project_root,
            generator: DEFAULT_GENERATOR.to_string(),
            build_type: DEFAULT_BUILD_TYPE.to_string(),
            cmake: DEFAULT_CMAKE.to_string(),
        }
    }

    pub fn with_build_dir(mut self, build_dir: impl AsRef<Path>) -> Self {
        self.build_dir = self.project_root.join(build_dir);
        self
    }

    /// Where CMake writes the compilation database.
    pub fn compile_commands_src(&self) -> PathBuf {
        self.build_dir.join(COMPILE_COMMANDS_FILE)
    }

    /// Where editors and analysers look for it.
    pub fn compile_commands_dst(&self) -> PathBuf {
        self.project_root.join(COMPILE_COMMANDS_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_spec_defaults() {
        let spec = BuildSpec::new("/work/proj");
        assert_eq!(spec.build_dir, PathBuf::from("/work/proj/build"));
        assert_eq!(spec.generator, "Ninja");
        assert_eq!(spec.build_type, "Debug");
        assert_eq!(spec.cmake, "cmake");
    }

    #[test]
    fn test_compile_commands_paths() {
        let spec = BuildSpec::new("/work/proj");
        assert_eq!(
            spec.compile_commands_src(),
            PathBuf::from("/work/proj/build/compile_commands.json")
        );
        assert_eq!(
            spec.compile_commands_dst(),
            PathBuf::from("/work/proj/compile_commands.json")
        );
    }

    #[test]
    fn test_relative_build_dir_is_under_root() {
        let spec = BuildSpec::new("/work/proj").with_build_dir("out/debug");
        assert_eq!(spec.build_dir, PathBuf::from("/work/proj/out/debug"));
    }
}
