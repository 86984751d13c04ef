//! Child process execution with timeouts and environment overlays.

use super::{CaptureMode, CommandRunner, ExecutionRequest, ExecutionResult, SPAWN_FAILURE_EXIT_CODE};
use crate::error::{BuildError, Result};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;

/// Grace period for reaping a child after it has been killed on timeout
const KILL_GRACE: Duration = Duration::from_secs(10);

/// Where a captured stream is echoed in [`CaptureMode::Streamed`].
#[derive(Clone, Copy)]
enum Echo {
    Stdout,
    Stderr,
}

/// Process-spawning [`CommandRunner`].
///
/// Holds an immutable snapshot of the base environment taken at construction.
/// Each request runs with `base ∪ overrides` (overrides win); the parent
/// process environment is never modified.
#[derive(Clone, Debug)]
pub struct Executor {
    base_environment: Arc<BTreeMap<OsString, OsString>>,
}

impl Default for Executor {
    fn default() -> Self {
        Self::new()
    }
}

impl Executor {
    /// Snapshots the current process environment.
    pub fn new() -> Self {
        Self::with_environment(std::env::vars_os())
    }

    /// Uses `vars` as the base environment instead of the process environment.
    pub fn with_environment<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<OsString>,
        V: Into<OsString>,
    {
        Self {
            base_environment: Arc::new(
                vars.into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    /// Value of `key` in the base environment snapshot.
    pub fn base_var(&self, key: &str) -> Option<&OsString> {
        self.base_environment.get(&OsString::from(key))
    }

    /// Full path of `tool` on the snapshot's PATH.
    pub fn which(&self, tool: &str) -> Option<PathBuf> {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let path = self.base_var("PATH").cloned().unwrap_or_default();
        which::which_in(tool, Some(path), cwd).ok()
    }

    async fn spawn_and_wait(&self, request: &ExecutionRequest) -> Result<ExecutionResult> {
        let command_line = request.command_line();
        log::debug!("Executing: {}", command_line);

        let mut command = Command::new(request.program());
        command
            .args(request.arguments())
            .env_clear()
            .envs(self.base_environment.iter())
            .envs(request.environment_overrides())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(dir) = request.working_directory() {
            command.current_dir(dir);
        }

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(source) if request.is_error_tolerant() => {
                log::debug!("`{}` could not be started: {}", command_line, source);
                return Ok(ExecutionResult::failed(
                    command_line,
                    source.to_string(),
                    SPAWN_FAILURE_EXIT_CODE,
                ));
            }
            Err(source) => {
                return Err(BuildError::Spawn {
                    command: command_line,
                    source,
                });
            }
        };

        let streamed = request.capture_mode() == CaptureMode::Streamed;
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        // Both pipes must be drained before waiting, or a chatty child blocks forever.
        let completion = async {
            let (stdout, stderr) = tokio::join!(
                collect_stream(stdout, streamed.then_some(Echo::Stdout)),
                collect_stream(stderr, streamed.then_some(Echo::Stderr)),
            );
            let status = child.wait().await;
            (stdout, stderr, status)
        };

        let outcome = match request.timeout_limit() {
            Some(limit) => tokio::time::timeout(limit, completion).await.ok(),
            None => Some(completion.await),
        };

        let Some((stdout, stderr, status)) = outcome else {
            let limit = request.timeout_limit().unwrap_or_default();
            log::warn!(
                "`{}` exceeded {}s, terminating",
                command_line,
                limit.as_secs()
            );
            if let Err(e) = child.kill().await {
                log::warn!("Failed to kill timed out process: {}", e);
            }
            let _ = tokio::time::timeout(KILL_GRACE, child.wait()).await;
            return Err(BuildError::Timeout {
                command: command_line,
                timeout: limit,
            });
        };

        let status = status.map_err(|source| BuildError::Spawn {
            command: command_line.clone(),
            source,
        })?;

        let result = ExecutionResult {
            command: command_line,
            stdout,
            stderr,
            exit_code: status.code().unwrap_or(-1),
        };
        log::debug!("`{}` exited with {}", result.command, result.exit_code);

        result.into_checked(request)
    }
}

impl CommandRunner for Executor {
    async fn run(&self, request: &ExecutionRequest) -> Result<ExecutionResult> {
        self.spawn_and_wait(request).await
    }

    fn exists_on_path(&self, tool: &str) -> bool {
        match self.which(tool) {
            Some(path) => {
                log::debug!("Found {} at {}", tool, path.display());
                true
            }
            None => {
                log::debug!("{} not found in PATH", tool);
                false
            }
        }
    }
}

/// Reads a pipe to EOF, lossily decoding each line, echoing when requested.
async fn collect_stream<R>(reader: Option<R>, echo: Option<Echo>) -> String
where
    R: AsyncRead + Unpin,
{
    let Some(reader) = reader else {
        return String::new();
    };

    let mut reader = BufReader::new(reader);
    let mut captured = String::new();
    let mut line = Vec::new();

    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line).await {
            Ok(0) => break,
            Ok(_) => {
                let text = String::from_utf8_lossy(&line);
                match echo {
                    Some(Echo::Stdout) => print!("{text}"),
                    Some(Echo::Stderr) => eprint!("{text}"),
                    None => {}
                }
                captured.push_str(&text);
            }
            Err(e) => {
                log::debug!("Stopped reading child output: {}", e);
                break;
            }
        }
    }

    captured
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Instant;

    fn sh(script: &str) -> ExecutionRequest {
        ExecutionRequest::new("sh").args(["-c", script])
    }

    #[tokio::test]
    async fn captures_stdout_and_exit_code() {
        let executor = Executor::new();
        let result = executor.run(&sh("printf hello")).await.unwrap();
        assert!(result.success());
        assert_eq!(result.stdout, "hello");
        assert_eq!(result.command, "sh -c \"printf hello\"");
    }

    #[tokio::test]
    async fn streamed_output_is_still_captured() {
        let executor = Executor::new();
        let result = executor
            .run(&sh("echo compiling; echo warning >&2").streamed())
            .await
            .unwrap();
        assert_eq!(result.stdout, "compiling\n");
        assert_eq!(result.stderr, "warning\n");
    }

    #[tokio::test]
    async fn non_zero_exit_is_execution_error_with_stderr() {
        let executor = Executor::new();
        let err = executor
            .run(&sh("echo broken >&2; exit 3"))
            .await
            .unwrap_err();
        match err {
            BuildError::Execution {
                stderr, exit_code, ..
            } => {
                assert_eq!(exit_code, 3);
                assert_eq!(stderr.trim(), "broken");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn error_tolerant_request_returns_failed_result() {
        let executor = Executor::new();
        let result = executor
            .run(&sh("exit 4").allow_failure())
            .await
            .unwrap();
        assert_eq!(result.exit_code, 4);
        assert!(!result.success());
    }

    #[tokio::test]
    async fn timeout_kills_child_even_if_it_would_succeed() {
        let executor = Executor::new();
        let started = Instant::now();
        let err = executor
            .run(&sh("sleep 5; exit 0").timeout(Duration::from_millis(200)))
            .await
            .unwrap_err();
        assert!(matches!(err, BuildError::Timeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn timeout_is_raised_for_error_tolerant_requests_too() {
        let executor = Executor::new();
        let err = executor
            .run(
                &sh("sleep 5")
                    .allow_failure()
                    .timeout(Duration::from_millis(100)),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, BuildError::Timeout { .. }));
    }

    #[tokio::test]
    async fn overrides_win_over_base_environment() {
        let path = std::env::var_os("PATH").unwrap_or_default();
        let executor =
            Executor::with_environment([("PATH", path), ("GREETING", "base".into())]);

        let base = executor.run(&sh("printf %s \"$GREETING\"")).await.unwrap();
        assert_eq!(base.stdout, "base");

        let overridden = executor
            .run(&sh("printf %s \"$GREETING\"").env("GREETING", "override"))
            .await
            .unwrap();
        assert_eq!(overridden.stdout, "override");

        // The override did not leak into the snapshot.
        let again = executor.run(&sh("printf %s \"$GREETING\"")).await.unwrap();
        assert_eq!(again.stdout, "base");
    }

    #[tokio::test]
    async fn runs_in_requested_working_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "x").unwrap();
        let executor = Executor::new();
        let result = executor
            .run(&sh("ls").current_dir(dir.path()))
            .await
            .unwrap();
        assert!(result.stdout.contains("marker.txt"));
    }

    #[tokio::test]
    async fn missing_program_is_spawn_error_unless_tolerated() {
        let executor = Executor::new();
        let strict = executor
            .run(&ExecutionRequest::new("definitely-not-a-real-tool-4242"))
            .await
            .unwrap_err();
        assert!(matches!(strict, BuildError::Spawn { .. }));

        let tolerant = executor
            .run(&ExecutionRequest::new("definitely-not-a-real-tool-4242").allow_failure())
            .await
            .unwrap();
        assert_eq!(tolerant.exit_code, SPAWN_FAILURE_EXIT_CODE);
    }

    #[tokio::test]
    async fn sequential_run_short_circuits_on_first_failure() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("ran-third");
        let executor = Executor::new();
        let requests = vec![
            sh("exit 0"),
            sh("exit 1"),
            sh(&format!("touch '{}'", marker.display())),
        ];
        assert!(executor.run_many_sequential(&requests).await.is_err());
        assert!(!marker.exists());
    }

    #[tokio::test]
    async fn sequential_run_continues_past_tolerated_failures() {
        let executor = Executor::new();
        let requests = vec![sh("echo one"), sh("exit 1").allow_failure(), sh("echo three")];
        let outputs = executor.run_many_sequential(&requests).await.unwrap();
        assert_eq!(outputs.len(), 3);
        assert_eq!(outputs[0].stdout.trim(), "one");
        assert!(!outputs[1].success());
        assert_eq!(outputs[2].stdout.trim(), "three");
    }

    #[test]
    fn exists_on_path_uses_snapshot_path() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let tool = dir.path().join("linuxdeploy");
        std::fs::write(&tool, "#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755)).unwrap();

        let executor = Executor::with_environment([("PATH", dir.path().as_os_str())]);
        assert!(executor.exists_on_path("linuxdeploy"));
        assert!(!executor.exists_on_path("rpmbuild"));
    }
}
