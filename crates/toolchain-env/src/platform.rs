//! Host platform identity.

use serde::{Deserialize, Serialize};

/// The platform family the bootstrapper is running on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum HostPlatform {
    /// Needs the vendor script to put the MSVC toolchain on the search path.
    Windows,

    /// Compilers are expected on PATH already.
    Other,
}

impl HostPlatform {
    /// Platform of the running binary.
    pub fn current() -> Self {
        if cfg!(windows) {
            HostPlatform::Windows
        } else {
            HostPlatform::Other
        }
    }

    /// Whether a vendor script must run before native compilers are usable.
    pub fn requires_vendor_init(&self) -> bool {
        matches!(self, HostPlatform::Windows)
    }

    pub fn name(&self) -> &'static str {
        match self {
            HostPlatform::Windows => "windows",
            HostPlatform::Other => "other",
        }
    }
}

impl std::fmt::Display for HostPlatform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
