//! Bootstrap configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default Visual Studio installation root.
pub const DEFAULT_VS_INSTALL_ROOT: &str = r"C:\Program Files\Microsoft Visual Studio\18\Community";

/// Location of `vcvarsall.bat` below the installation root.
pub const VCVARS_RELATIVE_PATH: [&str; 4] = ["VC", "Auxiliary", "Build", "vcvarsall.bat"];

pub const DEFAULT_ARCH: &str = "x64";

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// What to do when the vendor script is missing, times out or fails.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
    /// Warn and continue with the current process environment.
    #[default]
    Degrade,

    /// Report the failure as an error.
    Fail,
}

/// Configuration for [`crate::EnvBootstrapper`].
///
/// Deserialises from the `[env]` table of `buildprep.toml`; every field has a
/// default.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EnvConfig {
    /// Visual Studio installation root.
    pub install_root: PathBuf,

    /// Explicit script path; overrides `install_root` when set.
    pub script: Option<PathBuf>,

    /// Target architecture passed to the script (`x64`, `x86`, `amd64_arm64`, ...).
    pub arch: String,

    /// Limit for the script plus environment dump.
    pub timeout_secs: u64,

    pub fallback: FallbackPolicy,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            install_root: PathBuf::from(DEFAULT_VS_INSTALL_ROOT),
            script: None,
            arch: DEFAULT_ARCH.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            fallback: FallbackPolicy::Degrade,
        }
    }
}

impl EnvConfig {
    /// Apply overrides from the process environment.
    ///
    /// Reads:
    /// - BUILDPREP_VS_ROOT (installation root)
    /// - BUILDPREP_VCVARS (explicit script path)
    /// - BUILDPREP_ARCH
    /// - BUILDPREP_ENV_TIMEOUT (seconds; ignored when not a number)
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(root) = std::env::var("BUILDPREP_VS_ROOT") {
            self.install_root = PathBuf::from(root);
        }
        if let Ok(script) = std::env::var("BUILDPREP_VCVARS") {
            self.script = Some(PathBuf::from(script));
        }
        if let Ok(arch) = std::env::var("BUILDPREP_ARCH") {
            self.arch = arch;
        }
        if let Some(secs) = std::env::var("BUILDPREP_ENV_TIMEOUT")
            .ok()
            .and_then(|v| v.trim().parse().ok())
        {
            self.timeout_secs = secs;
        }
        self
    }

    /// Path of the vendor initialisation script.
    pub fn script_path(&self) -> PathBuf {
        match &self.script {
            Some(script) => script.clone(),
            None => VCVARS_RELATIVE_PATH
                .iter()
                .fold(self.install_root.clone(), |acc, part| acc.join(part)),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EnvConfig::default();
        assert_eq!(config.arch, "x64");
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.fallback, FallbackPolicy::Degrade);
    }

    #[test]
    fn test_script_path_under_install_root() {
        let config = EnvConfig {
            install_root: PathBuf::from("/opt/vs"),
            ..EnvConfig::default()
        };
        let path = config.script_path();
        assert!(path.starts_with("/opt/vs"));
        assert!(path.ends_with("VC/Auxiliary/Build/vcvarsall.bat"));
    }

    #[test]
    fn test_explicit_script_wins() {
        let config = EnvConfig {
            script: Some(PathBuf::from("/tmp/setup.sh")),
            ..EnvConfig::default()
        };
        assert_eq!(config.script_path(), PathBuf::from("/tmp/setup.sh"));
    }

    #[test]
    fn test_deserialize_partial_table() {
        let config: EnvConfig = toml::from_str(
            r#"
            arch = "amd64_arm64"
            fallback = "fail"
            "#,
        )
        .unwrap();
        assert_eq!(config.arch, "amd64_arm64");
        assert_eq!(config.fallback, FallbackPolicy::Fail);
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
    }
}
