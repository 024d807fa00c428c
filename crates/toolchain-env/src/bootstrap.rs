//! Strategy selection and the degrade-or-fail bootstrap flow.

use crate::capture::{capture_environment, Interpreter};
use crate::config::{EnvConfig, FallbackPolicy};
use crate::error::EnvError;
use crate::mapping::EnvironmentMapping;
use crate::platform::HostPlatform;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{error, info, warn};

/// How the toolchain environment is obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapStrategy {
    /// Use the current process environment as-is.
    Passthrough,

    /// Run the vendor script and capture what it exports.
    ScriptCapture { script: PathBuf },
}

/// Pick a strategy from the platform identity.
///
/// Never touches the filesystem: on platforms without vendor initialisation
/// the script is not even located.
pub fn select_strategy(platform: HostPlatform, config: &EnvConfig) -> BootstrapStrategy {
    if platform.requires_vendor_init() {
        BootstrapStrategy::ScriptCapture {
            script: config.script_path(),
        }
    } else {
        BootstrapStrategy::Passthrough
    }
}

/// What the bootstrap actually did.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BootstrapOutcome {
    /// No vendor initialisation needed on this platform.
    Passthrough,

    /// Variables captured from the vendor script.
    Captured { vars: usize },

    /// The script was missing or failed; the current environment is used.
    Degraded { reason: String },
}

impl BootstrapOutcome {
    pub fn is_degraded(&self) -> bool {
        matches!(self, BootstrapOutcome::Degraded { .. })
    }
}

/// Environment produced by [`EnvBootstrapper::bootstrap`].
#[derive(Debug, Clone)]
pub struct Bootstrap {
    pub env: EnvironmentMapping,
    pub outcome: BootstrapOutcome,
}

/// Prepares the environment that build commands run under.
#[derive(Debug, Clone)]
pub struct EnvBootstrapper {
    config: EnvConfig,
    platform: HostPlatform,
    interpreter: Interpreter,
}

impl EnvBootstrapper {
    /// Bootstrapper for the running host.
    pub fn new(config: EnvConfig) -> Self {
        let platform = HostPlatform::current();
        Self {
            config,
            platform,
            interpreter: Interpreter::for_platform(platform),
        }
    }

    /// Override the detected platform. Also resets the interpreter to the
    /// platform's default.
    pub fn with_platform(mut self, platform: HostPlatform) -> Self {
        self.platform = platform;
        self.interpreter = Interpreter::for_platform(platform);
        self
    }

    /// Override the interpreter used for the script-then-dump command.
    /// Call after [`Self::with_platform`].
    pub fn with_interpreter(mut self, interpreter: Interpreter) -> Self {
        self.interpreter = interpreter;
        self
    }

    pub fn platform(&self) -> HostPlatform {
        self.platform
    }

    /// Produce the environment mapping for subsequent commands.
    ///
    /// Under [`FallbackPolicy::Degrade`] a missing, failing or hanging script
    /// yields the current process environment and a `Degraded` outcome. Under
    /// [`FallbackPolicy::Fail`] those conditions are returned as errors. An
    /// untrusted script path or architecture is always an error.
    pub async fn bootstrap(&self) -> Result<Bootstrap> {
        let script = match select_strategy(self.platform, &self.config) {
            BootstrapStrategy::Passthrough => {
                info!(platform = %self.platform, "Vendor environment not required, using current environment");
                return Ok(Bootstrap {
                    env: EnvironmentMapping::from_current(),
                    outcome: BootstrapOutcome::Passthrough,
                });
            }
            BootstrapStrategy::ScriptCapture { script } => script,
        };

        if !script.is_file() {
            return self.fall_back(EnvError::ScriptNotFound(script));
        }

        info!(script = %script.display(), arch = %self.config.arch, "Initialising toolchain environment");

        match capture_environment(
            self.interpreter,
            &script,
            &self.config.arch,
            self.config.timeout(),
        )
        .await
        {
            Ok(env) => {
                info!(vars = env.len(), "Toolchain environment captured");
                let vars = env.len();
                Ok(Bootstrap {
                    env,
                    outcome: BootstrapOutcome::Captured { vars },
                })
            }
            Err(
                err @ (EnvError::UntrustedScriptPath { .. } | EnvError::InvalidArch(_)),
            ) => {
                error!(error = %err, "Refusing to run environment script");
                Err(err)
            }
            Err(err) => self.fall_back(err),
        }
    }

    fn fall_back(&self, err: EnvError) -> Result<Bootstrap> {
        match self.config.fallback {
            FallbackPolicy::Fail => {
                error!(error = %err, "Toolchain environment initialisation failed");
                Err(err)
            }
            FallbackPolicy::Degrade => {
                warn!(error = %err, "Toolchain environment unavailable, continuing with current environment");
                Ok(Bootstrap {
                    env: EnvironmentMapping::from_current(),
                    outcome: BootstrapOutcome::Degraded {
                        reason: err.to_string(),
                    },
                })
            }
        }
    }
}
