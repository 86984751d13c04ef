//! Platform build drivers.
//!
//! Each driver walks the same stages in order:
//!
//! ```text
//! check_dependencies -> build_frontend -> build_core_binary -> package_per_format -> collect_artifacts
//! ```
//!
//! A stage only runs if the previous one succeeded or failed in a way the
//! driver explicitly tolerates. Drivers end in either a [`BuildResult`] or an
//! error; nothing is retried, the only fallbacks are different commands.
//!
//! # Module Organization
//!
//! - [`stages`] - steps shared by every driver
//! - [`windows`] - one bundler invocation for all formats
//! - [`linux`] - compile once, package per format, hand-built tar.gz
//! - [`macos`] - single-arch builds plus the universal merge

pub mod linux;
pub mod macos;
pub mod stages;
pub mod windows;

pub use linux::LinuxDriver;
pub use macos::MacosDriver;
pub use windows::WindowsDriver;

use crate::bundler::{Arch, BuildTarget, PackageFormat, Platform};
use crate::cli::OutputManager;
use crate::config::{BuildConfig, ProjectLayout};
use crate::error::Result;
use crate::executor::CommandRunner;
use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

/// Default per-command limit for compile and bundle commands
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(600);

/// Knobs shared by every driver for one run.
#[derive(Clone, Debug)]
pub struct BuildOptions {
    /// Limit for each compile/bundle command
    pub command_timeout: Duration,
    /// Skip `npm install` / `npm run build`
    pub skip_frontend: bool,
    /// Never attempt the appimage format
    pub no_appimage: bool,
    /// Download AppRun into the bundler cache before appimage packaging
    pub prefetch_apprun: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            skip_frontend: false,
            no_appimage: false,
            prefetch_apprun: true,
        }
    }
}

/// Driver stages, in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    CheckDependencies,
    BuildFrontend,
    BuildCoreBinary,
    PackagePerFormat,
    MergeUniversal,
    CollectArtifacts,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::CheckDependencies => "check_dependencies",
            Stage::BuildFrontend => "build_frontend",
            Stage::BuildCoreBinary => "build_core_binary",
            Stage::PackagePerFormat => "package_per_format",
            Stage::MergeUniversal => "merge_universal",
            Stage::CollectArtifacts => "collect_artifacts",
        })
    }
}

/// Everything a driver needs for one platform build.
pub struct BuildContext<'a, R> {
    pub runner: &'a R,
    pub output: &'a OutputManager,
    pub config: &'a BuildConfig,
    pub layout: &'a ProjectLayout,
    pub options: &'a BuildOptions,
}

impl<R: CommandRunner> BuildContext<'_, R> {
    /// Marks the start of a stage.
    pub fn enter(&self, target: &BuildTarget, stage: Stage) {
        log::debug!("[{}] entering {}", target.toolchain_triple, stage);
    }

    pub fn product_name(&self) -> &str {
        &self.config.targets.product_name
    }

    pub fn binary_name(&self) -> &str {
        &self.config.targets.binary_name
    }
}

/// One file or bundle directory a driver produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Artifact {
    pub format: PackageFormat,
    pub path: PathBuf,
    pub size_bytes: u64,
    /// Only computed in verbose mode
    pub sha256: Option<String>,
}

/// Outcome of one completed platform build.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuildResult {
    pub platform: Platform,
    pub arch: Arch,
    pub toolchain_triple: &'static str,
    /// Formats actually produced, in build order
    pub formats_produced: Vec<PackageFormat>,
    /// `<tauri>/target/<triple>/release/bundle`
    pub artifact_directory: PathBuf,
    pub artifacts: Vec<Artifact>,
}

/// Shared driver interface.
pub trait Driver {
    /// Builds `formats` for `target`.
    fn build<R: CommandRunner>(
        &self,
        ctx: &BuildContext<'_, R>,
        target: &BuildTarget,
        formats: &[PackageFormat],
    ) -> impl Future<Output = Result<BuildResult>>;
}

/// Closed set of drivers, one per platform.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlatformDriver {
    Windows(WindowsDriver),
    Linux(LinuxDriver),
    Macos(MacosDriver),
}

impl PlatformDriver {
    pub fn for_platform(platform: Platform) -> Self {
        match platform {
            Platform::Windows => PlatformDriver::Windows(WindowsDriver),
            Platform::Linux => PlatformDriver::Linux(LinuxDriver),
            Platform::Macos => PlatformDriver::Macos(MacosDriver),
        }
    }
}

impl Driver for PlatformDriver {
    async fn build<R: CommandRunner>(
        &self,
        ctx: &BuildContext<'_, R>,
        target: &BuildTarget,
        formats: &[PackageFormat],
    ) -> Result<BuildResult> {
        match self {
            PlatformDriver::Windows(driver) => driver.build(ctx, target, formats).await,
            PlatformDriver::Linux(driver) => driver.build(ctx, target, formats).await,
            PlatformDriver::Macos(driver) => driver.build(ctx, target, formats).await,
        }
    }
}
