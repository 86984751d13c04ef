//! Immutable description of one external command invocation.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// How child output is handled relative to the parent's terminal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CaptureMode {
    /// Output is captured only; nothing reaches the parent's stdout/stderr.
    #[default]
    Silent,
    /// Output is captured and echoed line by line as it arrives.
    Streamed,
}

/// A single external command to run.
///
/// Built with the consuming builder methods below; there are no setters, so a
/// request cannot change once it has been handed to a runner.
///
/// ```
/// use desktop_bundle_orchestrator::executor::ExecutionRequest;
/// use std::time::Duration;
///
/// let request = ExecutionRequest::new("cargo")
///     .args(["tauri", "build", "--target", "x86_64-unknown-linux-gnu"])
///     .timeout(Duration::from_secs(600))
///     .streamed();
/// assert_eq!(
///     request.command_line(),
///     "cargo tauri build --target x86_64-unknown-linux-gnu"
/// );
/// ```
#[derive(Clone, Debug)]
pub struct ExecutionRequest {
    program: String,
    args: Vec<String>,
    working_directory: Option<PathBuf>,
    timeout: Option<Duration>,
    environment_overrides: BTreeMap<String, String>,
    capture_mode: CaptureMode,
    allow_failure: bool,
}

impl ExecutionRequest {
    /// Starts a request for `program` with no arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_directory: None,
            timeout: None,
            environment_overrides: BTreeMap::new(),
            capture_mode: CaptureMode::Silent,
            allow_failure: false,
        }
    }

    /// Appends one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Appends a path argument (lossy for non-UTF-8 paths).
    pub fn arg_path(self, path: &Path) -> Self {
        let arg = path.to_string_lossy().into_owned();
        self.arg(arg)
    }

    /// Runs the child in `dir` instead of the parent's working directory.
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_directory = Some(dir.into());
        self
    }

    /// Terminates the child and fails with a timeout once `limit` elapses.
    pub fn timeout(mut self, limit: Duration) -> Self {
        self.timeout = Some(limit);
        self
    }

    /// Adds an environment override. Overrides win over the base environment.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment_overrides.insert(key.into(), value.into());
        self
    }

    /// Adds every pair from `vars` as an override.
    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.environment_overrides
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Echo child output live.
    pub fn streamed(mut self) -> Self {
        self.capture_mode = CaptureMode::Streamed;
        self
    }

    /// Sets the capture mode explicitly.
    pub fn capture(mut self, mode: CaptureMode) -> Self {
        self.capture_mode = mode;
        self
    }

    /// Report non-zero exits and spawn failures as results instead of errors.
    ///
    /// Timeouts are still errors.
    pub fn allow_failure(mut self) -> Self {
        self.allow_failure = true;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    pub fn working_directory(&self) -> Option<&Path> {
        self.working_directory.as_deref()
    }

    pub fn timeout_limit(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn environment_overrides(&self) -> &BTreeMap<String, String> {
        &self.environment_overrides
    }

    pub fn capture_mode(&self) -> CaptureMode {
        self.capture_mode
    }

    pub fn is_error_tolerant(&self) -> bool {
        self.allow_failure
    }

    /// Shell-like rendering used in logs and error messages.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .map(quote)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for ExecutionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command_line())
    }
}

fn quote(word: &str) -> String {
    if word.is_empty() {
        return "\"\"".to_string();
    }
    if word.chars().any(|c| c.is_whitespace() || c == '"') {
        format!("\"{}\"", word.replace('"', "\\\""))
    } else {
        word.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_line_quotes_arguments_with_spaces() {
        let request = ExecutionRequest::new("lipo")
            .arg("-create")
            .arg("/tmp/My App/x86")
            .arg("");
        assert_eq!(request.command_line(), "lipo -create \"/tmp/My App/x86\" \"\"");
    }

    #[test]
    fn later_override_for_same_key_wins() {
        let request = ExecutionRequest::new("env")
            .env("APPLE_SIGNING_IDENTITY", "Developer ID")
            .envs([("APPLE_SIGNING_IDENTITY", "-")]);
        assert_eq!(
            request.environment_overrides().get("APPLE_SIGNING_IDENTITY").map(String::as_str),
            Some("-")
        );
    }

    #[test]
    fn defaults_are_silent_and_strict() {
        let request = ExecutionRequest::new("node");
        assert_eq!(request.capture_mode(), CaptureMode::Silent);
        assert!(!request.is_error_tolerant());
        assert!(request.timeout_limit().is_none());
        assert!(request.working_directory().is_none());
    }
}
