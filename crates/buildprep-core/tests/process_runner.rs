//! ProcessRunner behaviour against real processes.

#![cfg(unix)]

use buildprep_core::{CommandRunner, CommandSpec, CommandStatus, ProcessRunner};
use tempfile::TempDir;
use toolchain_env::{EnvBootstrapper, EnvConfig, EnvironmentMapping, HostPlatform};

fn path_only() -> EnvironmentMapping {
    let mut env = EnvironmentMapping::new();
    if let Ok(path) = std::env::var("PATH") {
        env.insert("PATH", path);
    }
    env
}

#[tokio::test]
async fn test_success_captures_output() {
    let env = path_only();
    let result = ProcessRunner::new()
        .run(&CommandSpec::new("echo", &env).args(["hello", "world"]))
        .await;

    assert!(result.success());
    assert_eq!(result.output, "hello world\n");
    assert_eq!(result.exit_code(), Some(0));
}

#[tokio::test]
async fn test_nonzero_exit_keeps_output() {
    let env = path_only();
    let result = ProcessRunner::new()
        .run(&CommandSpec::new("sh", &env).args(["-c", "echo partial; exit 4"]))
        .await;

    assert!(!result.success());
    assert_eq!(result.status, CommandStatus::ExitFailure { exit_code: 4 });
    assert_eq!(result.output, "partial\n");
}

#[tokio::test]
async fn test_missing_program_is_distinct_from_exit_failure() {
    let env = path_only();
    let runner = ProcessRunner::new();

    let missing = runner
        .run(&CommandSpec::new("buildprep-no-such-tool-4b1e", &env))
        .await;
    let failed = runner.run(&CommandSpec::new("false", &env)).await;

    assert_eq!(missing.status, CommandStatus::NotFound);
    assert!(matches!(failed.status, CommandStatus::ExitFailure { .. }));
    assert_ne!(missing.status, failed.status);
}

#[tokio::test]
async fn test_stderr_is_merged() {
    let env = path_only();
    let result = ProcessRunner::new()
        .run(&CommandSpec::new("sh", &env).args(["-c", "echo out; echo err >&2"]))
        .await;

    assert!(result.success());
    assert!(result.output.contains("out\n"));
    assert!(result.output.contains("err\n"));
    assert_eq!(result.output.lines().count(), 2);
}

#[tokio::test]
async fn test_arguments_are_not_shell_interpreted() {
    let env = path_only();
    let result = ProcessRunner::new()
        .run(&CommandSpec::new("echo", &env).arg("$HOME && rm -rf /; `id`"))
        .await;

    assert!(result.success());
    assert_eq!(result.output, "$HOME && rm -rf /; `id`\n");
}

#[tokio::test]
async fn test_child_sees_only_the_given_environment() {
    let mut env = path_only();
    env.insert("BUILDPREP_MARKER", "a=b");

    let result = ProcessRunner::new()
        .run(&CommandSpec::new("sh", &env).args([
            "-c",
            r#"echo "$BUILDPREP_MARKER"; echo "${HOME:-unset}""#,
        ]))
        .await;

    assert!(result.success());
    assert_eq!(result.output, "a=b\nunset\n");
}

#[tokio::test]
async fn test_working_directory() {
    let dir = TempDir::new().unwrap();
    let env = path_only();
    let result = ProcessRunner::new()
        .run(&CommandSpec::new("pwd", &env).arg("-P").current_dir(dir.path()))
        .await;

    assert!(result.success());
    let expected = dir.path().canonicalize().unwrap();
    assert_eq!(result.output.trim_end(), expected.to_string_lossy());
}

#[tokio::test]
async fn test_missing_working_directory_is_not_reported_as_missing_program() {
    let dir = TempDir::new().unwrap();
    let env = path_only();
    let result = ProcessRunner::new()
        .run(&CommandSpec::new("echo", &env).current_dir(dir.path().join("gone")))
        .await;

    assert!(!result.success());
    assert!(!result.is_not_found());
    assert!(matches!(result.status, CommandStatus::Error { .. }));
}

#[tokio::test]
async fn test_non_unicode_variable_survives_passthrough() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    std::env::set_var("BUILDPREP_LATIN1", OsStr::from_bytes(b"caf\xe9"));
    let bootstrap = EnvBootstrapper::new(EnvConfig::default())
        .with_platform(HostPlatform::Other)
        .bootstrap()
        .await
        .unwrap();
    std::env::remove_var("BUILDPREP_LATIN1");

    let result = ProcessRunner::new()
        .run(&CommandSpec::new("sh", &bootstrap.env).args([
            "-c",
            r#"test "${BUILDPREP_LATIN1-unset}" = "$(printf 'caf\351')" && echo kept"#,
        ]))
        .await;

    assert!(result.success(), "output: {:?}", result.output);
    assert_eq!(result.output, "kept\n");
}
