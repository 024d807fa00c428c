//! `buildprep.toml` loading and override layering.
//!
//! Precedence, lowest first: built-in defaults, the config file, `BUILDPREP_*`
//! environment variables, command-line flags (applied by the binary).

use crate::error::ConfigError;
use crate::spec::{BuildSpec, DEFAULT_BUILD_DIR, DEFAULT_BUILD_TYPE, DEFAULT_CMAKE, DEFAULT_GENERATOR};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use toolchain_env::EnvConfig;
use tracing::debug;

/// Config file looked up in the project root.
pub const CONFIG_FILE_NAME: &str = "buildprep.toml";

/// Top-level configuration.
///
/// ```toml
/// build_dir = "build"
/// generator = "Ninja"
/// build_type = "Debug"
/// cmake = "cmake"
///
/// [env]
/// install_root = 'C:\Program Files\Microsoft Visual Studio\18\Community'
/// arch = "x64"
/// timeout_secs = 30
/// fallback = "degrade"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BuildConfig {
    /// Build directory, relative to the project root unless absolute.
    pub build_dir: PathBuf,
    pub generator: String,
    pub build_type: String,
    pub cmake: String,
    pub env: EnvConfig,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            build_dir: PathBuf::from(DEFAULT_BUILD_DIR),
            generator: DEFAULT_GENERATOR.to_string(),
            build_type: DEFAULT_BUILD_TYPE.to_string(),
            cmake: DEFAULT_CMAKE.to_string(),
            env: EnvConfig::default(),
        }
    }
}

impl BuildConfig {
    /// Load a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load `<project_root>/buildprep.toml` if it exists, defaults otherwise.
    pub fn discover(project_root: &Path) -> Result<Self, ConfigError> {
        let path = project_root.join(CONFIG_FILE_NAME);
        if path.is_file() {
            debug!(path = %path.display(), "Loading config");
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Apply overrides from the process environment.
    ///
    /// Reads BUILDPREP_CMAKE, BUILDPREP_GENERATOR, BUILDPREP_BUILD_TYPE and
    /// BUILDPREP_BUILD_DIR, plus the `[env]` overrides of [`EnvConfig`].
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(cmake) = std::env::var("BUILDPREP_CMAKE") {
            self.cmake = cmake;
        }
        if let Ok(generator) = std::env::var("BUILDPREP_GENERATOR") {
            self.generator = generator;
        }
        if let Ok(build_type) = std::env::var("BUILDPREP_BUILD_TYPE") {
            self.build_type = build_type;
        }
        if let Ok(build_dir) = std::env::var("BUILDPREP_BUILD_DIR") {
            self.build_dir = PathBuf::from(build_dir);
        }
        self.env = self.env.with_env_overrides();
        self
    }

    /// Resolve into a [`BuildSpec`] for `project_root`.
    pub fn build_spec(&self, project_root: &Path) -> BuildSpec {
        let mut spec = BuildSpec::new(project_root).with_build_dir(&self.build_dir);
        spec.generator = self.generator.clone();
        spec.build_type = self.build_type.clone();
        spec.cmake = self.cmake.clone();
        spec
    }
}
