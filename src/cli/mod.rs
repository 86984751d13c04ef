//! Command line interface for the desktop build orchestrator.
//!
//! Parses arguments, dispatches the subcommand, and turns every error into
//! a diagnostic with remediation hints and exit code 1.

mod args;
pub mod commands;
mod output;

pub use args::{Args, BuildArgs, BumpArgs, CleanArgs, Command, CommonArgs, ValidateArgs};
pub use output::{OutputManager, Spinner};

use crate::error::{BuildError, Result};

/// Lines of child stderr shown under a failed command
const STDERR_TAIL_LINES: usize = 20;

/// Main CLI entry point. Returns the process exit code.
///
/// Ctrl-C drops the running subcommand, which kills any child process it
/// owns, and exits with code 1.
pub async fn run(args: Args) -> i32 {
    let output = OutputManager::new(args.verbose(), false);

    let outcome = tokio::select! {
        result = dispatch(&args, &output) => result,
        _ = tokio::signal::ctrl_c() => Err(BuildError::Interrupted),
    };

    match outcome {
        Ok(code) => code,
        Err(error) => {
            report_error(&output, &error);
            error.exit_code()
        }
    }
}

async fn dispatch(args: &Args, output: &OutputManager) -> Result<i32> {
    match &args.command {
        Command::Build(build) => commands::build::execute(build, output).await,
        Command::Validate(validate) => commands::validate::execute(validate, output).await,
        Command::Clean(clean) => commands::clean::execute(clean, output).await,
        Command::Bump(bump) => commands::bump::execute(bump, output).await,
    }
}

/// Prints a fatal error, the tail of the child's stderr, and recovery hints.
pub fn report_error(output: &OutputManager, error: &BuildError) {
    if matches!(error, BuildError::Interrupted) {
        output.warn("Build cancelled");
        return;
    }

    output.error(&error.to_string());

    if let Some(stderr) = error.child_stderr() {
        let lines: Vec<&str> = stderr.lines().collect();
        let tail = &lines[lines.len().saturating_sub(STDERR_TAIL_LINES)..];
        output.indent("Command output:");
        for line in tail {
            output.indent(&format!("  {line}"));
        }
    }

    let suggestions = error.recovery_suggestions();
    if !suggestions.is_empty() {
        output.indent("Suggestions:");
        for suggestion in suggestions {
            output.indent(&format!("  → {suggestion}"));
        }
    }

    if output.is_verbose() {
        output.debug(&format!("{error:#?}"));
    }
}
