//! Error types for build orchestration.
//!
//! Every fatal condition maps to one [`BuildError`] variant, and every variant
//! knows how to describe an actionable remediation via
//! [`BuildError::recovery_suggestions`].

use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Result type alias for orchestration operations
pub type Result<T> = std::result::Result<T, BuildError>;

/// Main error type for all orchestration operations
#[derive(Error, Debug)]
pub enum BuildError {
    /// Missing or malformed configuration file
    #[error("Configuration error in {}: {reason}", path.display())]
    Config {
        /// File that failed to load
        path: PathBuf,
        /// What went wrong
        reason: String,
    },

    /// Required tool absent from PATH
    #[error("Missing required tools: {}", tools.join(", "))]
    Environment {
        /// Labels of the missing tools
        tools: Vec<String>,
        /// Install hints, one per missing tool
        hints: Vec<String>,
    },

    /// Platform/architecture pair with no known toolchain triple
    #[error("Unsupported target: {platform} / {arch}")]
    UnsupportedTarget {
        /// Requested platform
        platform: String,
        /// Requested architecture
        arch: String,
        /// Architectures that platform does support
        supported: Vec<String>,
    },

    /// Child process exited non-zero
    #[error("Command `{command}` failed with exit code {exit_code}")]
    Execution {
        /// Rendered command line
        command: String,
        /// Captured standard error
        stderr: String,
        /// Exit code (-1 when terminated by a signal)
        exit_code: i32,
    },

    /// Child process exceeded its time limit and was terminated
    #[error("Command `{command}` timed out after {}s", timeout.as_secs())]
    Timeout {
        /// Rendered command line
        command: String,
        /// Limit that was exceeded
        timeout: Duration,
    },

    /// Child process could not be started at all
    #[error("Failed to start `{command}`: {source}")]
    Spawn {
        /// Rendered command line
        command: String,
        /// Underlying OS error
        source: std::io::Error,
    },

    /// An artifact a build step should have produced is missing
    #[error("{what} not found after build")]
    ArtifactNotFound {
        /// Human description of the artifact
        what: String,
        /// Every location that was checked
        searched: Vec<PathBuf>,
    },

    /// User interrupted the run
    #[error("Build cancelled")]
    Interrupted,

    /// CLI argument errors
    #[error("CLI error: {0}")]
    Cli(#[from] CliError),

    /// Filesystem operation failed
    #[error("Failed {action} ({}): {source}", path.display())]
    Filesystem {
        /// Operation in progress
        action: String,
        /// Path involved
        path: PathBuf,
        /// Underlying OS error
        source: std::io::Error,
    },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors from anyhow
    #[error("{0:#}")]
    Other(#[from] anyhow::Error),
}

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Invalid command line arguments
    #[error("Invalid arguments: {reason}")]
    InvalidArguments {
        /// Reason for the error
        reason: String,
    },

    /// Platform selection could not be derived from the host
    #[error("Cannot detect a supported host platform ({os})")]
    UnknownHost {
        /// Value of `std::env::consts::OS`
        os: String,
    },
}

impl BuildError {
    /// Get actionable recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            BuildError::Config { path, .. } => vec![
                format!("Check that {} exists and contains valid JSON", path.display()),
                "version.json needs string fields `current` (semver) and `buildNumber`".to_string(),
                "targets.json needs `productName` and `binaryName`".to_string(),
            ],
            BuildError::Environment { hints, .. } => hints.clone(),
            BuildError::UnsupportedTarget {
                platform, supported, ..
            } => vec![format!(
                "Supported architectures for {}: {}",
                platform,
                supported.join(", ")
            )],
            BuildError::Execution { .. } => vec![
                "Re-run with --verbose to see the full command output".to_string(),
            ],
            BuildError::Timeout { .. } => vec![
                "Raise the per-command limit with --timeout <SECS>".to_string(),
                "Slow dependency downloads are the usual cause; check network and proxy settings"
                    .to_string(),
            ],
            BuildError::Spawn { .. } => vec![
                "Make sure the program is installed and on PATH".to_string(),
            ],
            BuildError::ArtifactNotFound { searched, .. } => {
                let mut suggestions = vec![
                    "Inspect the bundler output above for compile errors".to_string(),
                ];
                suggestions.extend(
                    searched
                        .iter()
                        .map(|p| format!("Searched: {}", p.display())),
                );
                suggestions
            }
            BuildError::Interrupted => Vec::new(),
            _ => vec!["Check the error message above for specific details".to_string()],
        }
    }

    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        1
    }

    /// Captured standard error of a failed child process, if any
    pub fn child_stderr(&self) -> Option<&str> {
        match self {
            BuildError::Execution { stderr, .. } if !stderr.trim().is_empty() => Some(stderr),
            _ => None,
        }
    }
}

/// Extension trait attaching filesystem context to IO results.
pub trait ErrorExt<T> {
    /// Wrap an IO error with the operation and path involved.
    fn fs_context(self, action: &str, path: &Path) -> Result<T>;
}

impl<T> ErrorExt<T> for std::io::Result<T> {
    fn fs_context(self, action: &str, path: &Path) -> Result<T> {
        self.map_err(|source| BuildError::Filesystem {
            action: action.to_string(),
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_error_surfaces_install_hints() {
        let err = BuildError::Environment {
            tools: vec!["Tauri CLI".into()],
            hints: vec!["cargo install tauri-cli --version '^2.0.0'".into()],
        };
        assert_eq!(err.to_string(), "Missing required tools: Tauri CLI");
        assert_eq!(
            err.recovery_suggestions(),
            vec!["cargo install tauri-cli --version '^2.0.0'".to_string()]
        );
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn fs_context_keeps_path() {
        let result: std::io::Result<()> =
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        let err = result
            .fs_context("reading config", Path::new("/tmp/x.json"))
            .unwrap_err();
        assert!(err.to_string().contains("reading config"));
        assert!(err.to_string().contains("/tmp/x.json"));
    }

    #[test]
    fn child_stderr_ignores_blank_output() {
        let err = BuildError::Execution {
            command: "cargo tauri build".into(),
            stderr: "  \n".into(),
            exit_code: 101,
        };
        assert!(err.child_stderr().is_none());
    }
}
