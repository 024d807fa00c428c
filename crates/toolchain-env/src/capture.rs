//! Vendor script execution and environment dump capture.
//!
//! This is the only place in buildprep that runs a command through a shell.
//! The vendor script mutates interpreter-local state, so the only way to
//! observe its effect is to run it and dump the environment in the same
//! interpreter session: `"<script>" <arch> && set`. Everything interpolated
//! into that line is validated first; every other subprocess is spawned with
//! an argument vector.

use crate::error::EnvError;
use crate::mapping::EnvironmentMapping;
use crate::platform::HostPlatform;
use crate::Result;
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, warn};

/// Characters that change meaning inside a double-quoted `cmd` or `sh` word.
const FORBIDDEN_PATH_CHARS: &[char] = &['"', '%', '$', '`', '\r', '\n', '\0'];

/// Command interpreter used for the script-then-dump idiom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpreter {
    /// `cmd /d /u /s /c "<script>" <arch> && set`
    ///
    /// `/u` makes `set` write UTF-16LE, independent of the console code page.
    Cmd,

    /// `sh -c 'set -- <arch> && . "<script>" && env'`
    ///
    /// For sourceable POSIX setup scripts.
    PosixSh,
}

impl Interpreter {
    pub fn for_platform(platform: HostPlatform) -> Self {
        match platform {
            HostPlatform::Windows => Interpreter::Cmd,
            HostPlatform::Other => Interpreter::PosixSh,
        }
    }

    pub fn program(&self) -> &'static str {
        match self {
            Interpreter::Cmd => "cmd",
            Interpreter::PosixSh => "sh",
        }
    }

    /// Check that a script path can be interpolated into the composite command.
    ///
    /// `sh` additionally treats `\` as an escape inside double quotes; `cmd`
    /// needs it as the path separator.
    pub fn validate_script_path(&self, path: &Path) -> Result<()> {
        let untrusted = |reason: &str| EnvError::UntrustedScriptPath {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        };

        if !path.is_absolute() {
            return Err(untrusted("path is not absolute"));
        }
        let text = path
            .to_str()
            .ok_or_else(|| untrusted("path is not valid UTF-8"))?;
        let forbidden = |c: &char| {
            FORBIDDEN_PATH_CHARS.contains(c) || (*self == Interpreter::PosixSh && *c == '\\')
        };
        if let Some(c) = text.chars().find(forbidden) {
            return Err(untrusted(&format!("path contains {c:?}")));
        }
        Ok(())
    }

    /// Decode the dump written to stdout.
    ///
    /// Returns the text and whether anything had to be replaced with U+FFFD.
    pub fn decode_dump(&self, bytes: &[u8]) -> (String, bool) {
        match self {
            Interpreter::Cmd => {
                let mut lossy = bytes.len() % 2 != 0;
                let units = bytes
                    .chunks_exact(2)
                    .map(|pair| u16::from_le_bytes([pair[0], pair[1]]));
                let text: String = char::decode_utf16(units)
                    .map(|c| {
                        c.unwrap_or_else(|_| {
                            lossy = true;
                            char::REPLACEMENT_CHARACTER
                        })
                    })
                    .collect();
                (text, lossy)
            }
            Interpreter::PosixSh => match std::str::from_utf8(bytes) {
                Ok(text) => (text.to_string(), false),
                Err(_) => (String::from_utf8_lossy(bytes).into_owned(), true),
            },
        }
    }

    /// The composite script-then-dump line. Inputs must already be validated.
    pub fn composite_command(&self, script: &str, arch: &str) -> String {
        match self {
            Interpreter::Cmd => format!("\"{script}\" {arch} && set"),
            Interpreter::PosixSh => format!("set -- {arch} && . \"{script}\" && env"),
        }
    }

    fn command(&self, composite: &str) -> Command {
        let mut cmd = Command::new(self.program());
        match self {
            Interpreter::Cmd => {
                cmd.args(["/d", "/u", "/s", "/c"]);
                push_cmd_line(&mut cmd, composite);
            }
            Interpreter::PosixSh => {
                cmd.arg("-c").arg(composite);
            }
        }
        cmd
    }
}

// `cmd /s /c` strips one pair of outer quotes and runs the rest verbatim, so
// the line must reach it without the runtime's argument escaping.
#[cfg(windows)]
fn push_cmd_line(cmd: &mut Command, composite: &str) {
    cmd.raw_arg(format!("\"{composite}\""));
}

#[cfg(not(windows))]
fn push_cmd_line(cmd: &mut Command, composite: &str) {
    cmd.arg(composite);
}

/// Check that the architecture argument is a plain identifier.
pub fn validate_arch(arch: &str) -> Result<()> {
    let valid = !arch.is_empty()
        && arch
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(EnvError::InvalidArch(arch.to_string()))
    }
}

/// Run the vendor script and parse the environment it leaves behind.
///
/// The interpreter is killed if it does not finish within `timeout`.
pub async fn capture_environment(
    interpreter: Interpreter,
    script: &Path,
    arch: &str,
    timeout: Duration,
) -> Result<EnvironmentMapping> {
    interpreter.validate_script_path(script)?;
    validate_arch(arch)?;

    let script_str = script.to_str().unwrap_or_default();
    let composite = interpreter.composite_command(script_str, arch);
    debug!(interpreter = interpreter.program(), command = %composite, "Running environment script");

    let start = Instant::now();
    let child = interpreter
        .command(&composite)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| EnvError::Spawn {
            program: interpreter.program().to_string(),
            source,
        })?;

    let output = tokio::time::timeout(timeout, child.wait_with_output())
        .await
        .map_err(|_| EnvError::Timeout {
            secs: timeout.as_secs(),
        })??;

    debug!(
        duration_ms = start.elapsed().as_millis() as u64,
        exit_code = output.status.code().unwrap_or(-1),
        "Environment script finished"
    );

    if !output.status.success() {
        return Err(EnvError::ScriptFailed {
            exit_code: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    let (text, lossy) = interpreter.decode_dump(&output.stdout);
    if lossy {
        warn!(
            interpreter = interpreter.program(),
            "Environment dump was not valid text; some values contain U+FFFD"
        );
    }
    Ok(EnvironmentMapping::parse_dump(&text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cmd_composite_quotes_script() {
        let line = Interpreter::Cmd.composite_command(
            r"C:\Program Files\Microsoft Visual Studio\18\Community\VC\Auxiliary\Build\vcvarsall.bat",
            "x64",
        );
        assert_eq!(
            line,
            r#""C:\Program Files\Microsoft Visual Studio\18\Community\VC\Auxiliary\Build\vcvarsall.bat" x64 && set"#
        );
    }

    #[test]
    fn test_sh_composite_sources_script() {
        let line = Interpreter::PosixSh.composite_command("/opt/tc/setup.sh", "x64");
        assert_eq!(line, r#"set -- x64 && . "/opt/tc/setup.sh" && env"#);
    }

    #[test]
    fn test_interpreter_for_platform() {
        assert_eq!(Interpreter::for_platform(HostPlatform::Windows), Interpreter::Cmd);
        assert_eq!(Interpreter::for_platform(HostPlatform::Other), Interpreter::PosixSh);
    }

    #[test]
    fn test_validate_arch() {
        assert!(validate_arch("x64").is_ok());
        assert!(validate_arch("amd64_arm64").is_ok());
        assert!(validate_arch("").is_err());
        assert!(validate_arch("x64 & calc").is_err());
        assert!(validate_arch("x64;rm").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_validate_script_path() {
        for interpreter in [Interpreter::Cmd, Interpreter::PosixSh] {
            let validate = |p: &str| interpreter.validate_script_path(Path::new(p));

            assert!(validate("/opt/vs/vcvarsall.bat").is_ok());
            assert!(validate("/opt/Program Files (x86)/vcvars.sh").is_ok());
            assert!(matches!(
                validate("vcvarsall.bat"),
                Err(EnvError::UntrustedScriptPath { .. })
            ));

            for bad in ["/opt/a\"b", "/opt/%PATH%", "/opt/$HOME", "/opt/`id`", "/opt/a\nb"] {
                assert!(
                    matches!(validate(bad), Err(EnvError::UntrustedScriptPath { .. })),
                    "{bad:?} should be rejected for {interpreter:?}"
                );
            }
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_backslash_rejected_only_for_sh() {
        let path = Path::new("/opt/tc/setup\\");
        assert!(matches!(
            Interpreter::PosixSh.validate_script_path(path),
            Err(EnvError::UntrustedScriptPath { .. })
        ));
        assert!(Interpreter::Cmd.validate_script_path(path).is_ok());
    }

    fn utf16le(text: &str) -> Vec<u8> {
        text.encode_utf16().flat_map(u16::to_le_bytes).collect()
    }

    #[test]
    fn test_cmd_dump_decodes_utf16() {
        let bytes = utf16le("USERPROFILE=C:\\Users\\张三\r\nTEMP=C:\\Users\\张三\\AppData\\Local\\Temp\r\n");
        let (text, lossy) = Interpreter::Cmd.decode_dump(&bytes);

        assert!(!lossy);
        let env = EnvironmentMapping::parse_dump(&text);
        assert_eq!(
            env.get("USERPROFILE").and_then(|v| v.to_str()),
            Some("C:\\Users\\张三")
        );
        assert_eq!(env.len(), 2);
    }

    #[test]
    fn test_cmd_dump_reports_lossy_decode() {
        // Unpaired surrogate.
        let mut bytes = utf16le("A=");
        bytes.extend_from_slice(&0xD800u16.to_le_bytes());
        let (text, lossy) = Interpreter::Cmd.decode_dump(&bytes);
        assert!(lossy);
        assert_eq!(text, "A=\u{FFFD}");

        // Odd trailing byte.
        let mut bytes = utf16le("A=1");
        bytes.push(b'x');
        let (text, lossy) = Interpreter::Cmd.decode_dump(&bytes);
        assert!(lossy);
        assert_eq!(text, "A=1");
    }

    #[test]
    fn test_sh_dump_decodes_utf8() {
        let (text, lossy) = Interpreter::PosixSh.decode_dump("HOME=/home/张三\n".as_bytes());
        assert!(!lossy);
        assert_eq!(text, "HOME=/home/张三\n");

        let (text, lossy) = Interpreter::PosixSh.decode_dump(b"NAME=caf\xe9\n");
        assert!(lossy);
        assert_eq!(text, "NAME=caf\u{FFFD}\n");
    }
}
