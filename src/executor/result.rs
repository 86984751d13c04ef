//! Outcome of one external command.

use super::ExecutionRequest;
use crate::error::{BuildError, Result};

/// Exit code reported for error-tolerant requests whose program could not be started.
pub const SPAWN_FAILURE_EXIT_CODE: i32 = 127;

/// Captured output and exit status of a finished child process.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutionResult {
    /// Rendered command line that produced this result
    pub command: String,
    pub stdout: String,
    pub stderr: String,
    /// Exit code, -1 when the child was terminated by a signal
    pub exit_code: i32,
}

impl ExecutionResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// A synthetic failed result, used where a failure is collected rather than raised.
    pub fn failed(command: impl Into<String>, stderr: impl Into<String>, exit_code: i32) -> Self {
        Self {
            command: command.into(),
            stdout: String::new(),
            stderr: stderr.into(),
            exit_code,
        }
    }

    /// Applies the request's failure policy.
    ///
    /// Non-zero exits become [`BuildError::Execution`] unless the request is
    /// error tolerant.
    pub fn into_checked(self, request: &ExecutionRequest) -> Result<Self> {
        if self.success() || request.is_error_tolerant() {
            return Ok(self);
        }
        Err(BuildError::Execution {
            command: self.command,
            stderr: if self.stderr.trim().is_empty() {
                self.stdout
            } else {
                self.stderr
            },
            exit_code: self.exit_code,
        })
    }
}
