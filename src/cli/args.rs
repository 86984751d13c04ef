//! Command line argument parsing.

use crate::bundler::platform::DEFAULT_COMMAND_TIMEOUT;
use crate::bundler::{Arch, Platform};
use crate::cli::commands::bump::BumpKind;
use crate::config::DEFAULT_CONFIG_DIR;
use crate::error::{ErrorExt, Result};
use clap::{Parser, Subcommand};
use path_absolutize::Absolutize;
use std::path::{Path, PathBuf};

/// Cross-platform build orchestrator for Tauri desktop applications
#[derive(Parser, Debug)]
#[command(
    name = "desktop-build",
    version,
    propagate_version = true,
    about = "Cross-platform build orchestrator for Tauri desktop applications",
    long_about = "Builds installable packages for Windows (msi, nsis), Linux (deb, tar.gz, appimage, rpm) \
and macOS (app, dmg, universal) by driving npm, rustup and the Tauri CLI.

Usage:
  desktop-build build                              # current platform, configured arch
  desktop-build build --platform mac --arch universal
  desktop-build build --platform linux --no-appimage
  desktop-build validate
  desktop-build clean --all
  desktop-build bump minor

Exit code 0 = every selected platform built."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build packages for one or more platforms
    Build(BuildArgs),
    /// Check tools and configuration without building
    Validate(ValidateArgs),
    /// Remove build output
    Clean(CleanArgs),
    /// Raise the version in version.json, tauri.conf.json and package.json
    Bump(BumpArgs),
}

/// Options shared by every subcommand.
#[derive(clap::Args, Debug, Clone)]
pub struct CommonArgs {
    /// Project root containing the frontend and Tauri directories
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub project_root: PathBuf,

    /// Show debug output, checksums and full error traces
    #[arg(short, long)]
    pub verbose: bool,
}

impl CommonArgs {
    /// Absolute project root.
    pub fn project_root(&self) -> Result<PathBuf> {
        let absolute = self
            .project_root
            .absolutize()
            .fs_context("resolving project root", &self.project_root)?;
        Ok(absolute.into_owned())
    }

    /// `override_dir` if given, else `<project-root>/build/configs`.
    pub fn config_dir(&self, override_dir: Option<&Path>) -> Result<PathBuf> {
        match override_dir {
            Some(dir) => Ok(dir
                .absolutize()
                .fs_context("resolving config directory", dir)?
                .into_owned()),
            None => Ok(self.project_root()?.join(DEFAULT_CONFIG_DIR)),
        }
    }
}

#[derive(clap::Args, Debug, Clone)]
pub struct BuildArgs {
    /// Platform to build (windows, linux, macos; aliases win, mac, osx)
    #[arg(short, long, value_enum, ignore_case = true)]
    pub platform: Option<Platform>,

    /// Architecture; defaults to the platform's configured defaultArch
    #[arg(short, long, value_enum, ignore_case = true)]
    pub arch: Option<Arch>,

    /// Build every platform supported on this host
    #[arg(long, conflicts_with = "platform")]
    pub all_platforms: bool,

    /// Keep going when a platform fails (exit code is still 1)
    #[arg(long)]
    pub ignore_errors: bool,

    /// Never attempt the appimage format
    #[arg(long)]
    pub no_appimage: bool,

    /// Skip npm install / npm run build
    #[arg(long)]
    pub skip_frontend: bool,

    /// Per-command limit in seconds for compile and bundle commands
    #[arg(
        long,
        value_name = "SECS",
        default_value_t = DEFAULT_COMMAND_TIMEOUT.as_secs(),
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub timeout: u64,

    /// Directory holding targets.json and version.json
    #[arg(long, value_name = "DIR")]
    pub config_dir: Option<PathBuf>,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(clap::Args, Debug, Clone)]
pub struct ValidateArgs {
    /// Maximum concurrent tool probes
    #[arg(short, long, value_name = "N", default_value_t = num_cpus::get())]
    pub jobs: usize,

    /// Directory holding targets.json and version.json
    #[arg(long, value_name = "DIR")]
    pub config_dir: Option<PathBuf>,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(clap::Args, Debug, Clone)]
pub struct CleanArgs {
    /// Also remove frontend node_modules
    #[arg(long)]
    pub all: bool,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(clap::Args, Debug, Clone)]
pub struct BumpArgs {
    /// Version component to raise
    #[arg(value_enum, default_value = "patch")]
    pub kind: BumpKind,

    /// Directory holding targets.json and version.json
    #[arg(long, value_name = "DIR")]
    pub config_dir: Option<PathBuf>,

    #[command(flatten)]
    pub common: CommonArgs,
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn common(&self) -> &CommonArgs {
        match &self.command {
            Command::Build(args) => &args.common,
            Command::Validate(args) => &args.common,
            Command::Clean(args) => &args.common,
            Command::Bump(args) => &args.common,
        }
    }

    pub fn verbose(&self) -> bool {
        self.common().verbose
    }
}
