//! Colored terminal output.
//!
//! A write-only presentation sink: leveled messages, section headers,
//! indented detail lines and a transient [`Spinner`]. Write failures are
//! swallowed; output never changes the outcome of a build.

use cyrup_termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};
use std::io::{IsTerminal, Write};
use std::time::Instant;

/// Terminal output manager.
#[derive(Debug, Clone)]
pub struct OutputManager {
    verbose: bool,
    quiet: bool,
    stdout_color: ColorChoice,
    stderr_color: ColorChoice,
}

impl OutputManager {
    /// Create a new output manager.
    ///
    /// `verbose` enables [`debug`](Self::debug) lines; `quiet` suppresses
    /// everything except warnings and errors.
    pub fn new(verbose: bool, quiet: bool) -> Self {
        let choice = |tty: bool| {
            if tty {
                ColorChoice::Auto
            } else {
                ColorChoice::Never
            }
        };
        Self {
            verbose,
            quiet,
            stdout_color: choice(std::io::stdout().is_terminal()),
            stderr_color: choice(std::io::stderr().is_terminal()),
        }
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    fn emit(&self, to_stderr: bool, color: Option<Color>, bold: bool, prefix: &str, message: &str) {
        let mut stream = if to_stderr {
            StandardStream::stderr(self.stderr_color)
        } else {
            StandardStream::stdout(self.stdout_color)
        };

        let mut spec = ColorSpec::new();
        spec.set_fg(color).set_bold(bold);

        let _ = stream.set_color(&spec);
        let _ = write!(stream, "{prefix}");
        if !prefix.is_empty() {
            let _ = stream.reset();
            let _ = write!(stream, " ");
        }
        let _ = writeln!(stream, "{message}");
        let _ = stream.reset();
        let _ = stream.flush();
    }

    /// Diagnostic detail, verbose mode only.
    pub fn debug(&self, message: &str) {
        if self.verbose && !self.quiet {
            self.emit(false, Some(Color::Magenta), false, "·", message);
        }
    }

    pub fn info(&self, message: &str) {
        if !self.quiet {
            self.emit(false, Some(Color::Cyan), false, "ℹ", message);
        }
    }

    pub fn success(&self, message: &str) {
        if !self.quiet {
            self.emit(false, Some(Color::Green), true, "✓", message);
        }
    }

    pub fn warn(&self, message: &str) {
        self.emit(true, Some(Color::Yellow), true, "⚠", message);
    }

    pub fn error(&self, message: &str) {
        self.emit(true, Some(Color::Red), true, "✗", message);
    }

    /// Section header.
    pub fn section(&self, title: &str) {
        if self.quiet {
            return;
        }
        let rule = "─".repeat(title.chars().count() + 4);
        self.emit(false, Some(Color::Blue), true, "", "");
        self.emit(false, Some(Color::Blue), true, "", &format!("  {title}"));
        self.emit(false, Some(Color::Blue), false, "", &rule);
    }

    /// Indented detail line.
    pub fn indent(&self, message: &str) {
        if !self.quiet {
            self.emit(false, None, false, "", &format!("  {message}"));
        }
    }

    /// Starts a progress indicator for a long-running step.
    pub fn spinner(&self, message: impl Into<String>) -> Spinner {
        let message = message.into();
        if !self.quiet {
            self.emit(false, Some(Color::Cyan), true, "⠿", &format!("{message}..."));
        }
        Spinner {
            output: self.clone(),
            message,
            started: Instant::now(),
        }
    }
}

/// Progress indicator for one long-running step.
///
/// Child output may be streamed while a spinner is active, so it renders as a
/// start line and a terminal line instead of redrawing in place.
#[derive(Debug)]
pub struct Spinner {
    output: OutputManager,
    message: String,
    started: Instant,
}

impl Spinner {
    pub fn succeed(self, message: &str) {
        let elapsed = self.started.elapsed().as_secs_f32();
        self.output.success(&format!("{message} ({elapsed:.1}s)"));
    }

    pub fn fail(self, message: &str) {
        let elapsed = self.started.elapsed().as_secs_f32();
        self.output.error(&format!("{message} ({elapsed:.1}s)"));
    }

    /// Message the spinner was started with.
    pub fn message(&self) -> &str {
        &self.message
    }
}
