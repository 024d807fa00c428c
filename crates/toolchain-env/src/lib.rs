//! toolchain-env: native compiler environment capture
//!
//! Prepares the environment that buildprep runs CMake under. On Windows
//! the MSVC toolchain is only usable after `vcvarsall.bat` has run, so the
//! script is executed and the variables it exports are captured into an
//! [`EnvironmentMapping`]. Elsewhere the current process environment is used
//! unchanged.
//!
//! Capture failures degrade to the current environment by default, since a
//! compiler is often already on PATH. [`FallbackPolicy::Fail`] turns them
//! into errors instead.

pub mod bootstrap;
pub mod capture;
pub mod config;
pub mod error;
pub mod mapping;
pub mod platform;

pub use bootstrap::{select_strategy, Bootstrap, BootstrapOutcome, BootstrapStrategy, EnvBootstrapper};
pub use capture::{capture_environment, validate_arch, Interpreter};
pub use config::{EnvConfig, FallbackPolicy};
pub use error::EnvError;
pub use mapping::EnvironmentMapping;
pub use platform::HostPlatform;

/// Result type for toolchain-env operations
pub type Result<T> = std::result::Result<T, EnvError>;
