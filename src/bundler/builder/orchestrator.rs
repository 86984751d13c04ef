//! Top-level build coordination.
//!
//! The [`BuildCoordinator`] checks the environment, loads configuration,
//! decides which platforms to build and runs the matching driver for each,
//! strictly one after another: drivers share the frontend output and the
//! cargo target directory.

use super::tool_detection::{REQUIRED_TOOLS, ensure_present, probe_optional, probe_required};
use crate::bundler::platform::{BuildContext, BuildOptions, BuildResult, Driver, PlatformDriver};
use crate::bundler::{Arch, PackageFormat, Platform, resolve, select_formats};
use crate::cli::OutputManager;
use crate::config::{BuildConfig, ProjectLayout};
use crate::error::{BuildError, CliError, Result};
use crate::executor::CommandRunner;
use std::path::PathBuf;

/// Which platforms a run targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlatformSelection {
    /// The platform named on the command line
    Explicit(Platform),
    /// Every platform buildable on this host. Cross-compiling desktop
    /// bundles is not supported, so this is the host platform.
    AllCurrent,
    /// Detected from the running host
    Auto,
}

impl PlatformSelection {
    /// Platforms to build, in order.
    pub fn platforms(self) -> Result<Vec<Platform>> {
        match self {
            PlatformSelection::Explicit(platform) => Ok(vec![platform]),
            PlatformSelection::AllCurrent | PlatformSelection::Auto => Platform::host()
                .map(|platform| vec![platform])
                .ok_or_else(|| {
                    CliError::UnknownHost {
                        os: std::env::consts::OS.to_string(),
                    }
                    .into()
                }),
        }
    }
}

/// Everything the coordinator needs to know about one run.
#[derive(Clone, Debug)]
pub struct BuildRequest {
    pub selection: PlatformSelection,
    /// Overrides the configured default architecture
    pub arch: Option<Arch>,
    /// Record a failing platform and continue with the next one
    pub ignore_errors: bool,
    pub config_dir: PathBuf,
    pub options: BuildOptions,
}

/// A platform that failed under `ignore_errors`.
#[derive(Debug)]
pub struct PlatformFailure {
    pub platform: Platform,
    pub error: BuildError,
}

/// Outcome of a coordinator run.
#[derive(Debug, Default)]
pub struct BuildReport {
    /// Completed platforms, in build order
    pub completed: Vec<BuildResult>,
    pub failures: Vec<PlatformFailure>,
}

impl BuildReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// 0 only if every selected platform completed.
    pub fn exit_code(&self) -> i32 {
        if self.is_success() { 0 } else { 1 }
    }
}

/// Runs platform drivers for a build request.
pub struct BuildCoordinator<'a, R> {
    runner: &'a R,
    output: &'a OutputManager,
    project_root: PathBuf,
}

impl<'a, R: CommandRunner> BuildCoordinator<'a, R> {
    pub fn new(runner: &'a R, output: &'a OutputManager, project_root: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            output,
            project_root: project_root.into(),
        }
    }

    /// Full run: environment check, configuration, then every selected platform.
    ///
    /// Environment and configuration errors abort before any build command.
    pub async fn run(&self, request: &BuildRequest) -> Result<BuildReport> {
        self.check_environment()?;

        let config = BuildConfig::load(&request.config_dir)?;
        self.output.info(&format!(
            "{} {} (build {})",
            config.targets.product_name, config.version.current, config.version.build_number
        ));

        let platforms = request.selection.platforms()?;
        let layout = ProjectLayout::new(&self.project_root, &config.targets);
        let report = self.build_platforms(&config, &layout, &platforms, request).await?;
        self.print_summary(&report);
        Ok(report)
    }

    /// Verifies every required tool is on PATH, reporting each one.
    pub fn check_environment(&self) -> Result<()> {
        self.output.section("Checking build environment");
        if let Some(host) = Platform::host() {
            self.output.info(&format!(
                "Host: {} ({})",
                host.display_name(),
                std::env::consts::ARCH
            ));
        }

        let statuses = probe_required(self.runner, REQUIRED_TOOLS);
        for status in &statuses {
            match status.found {
                Some(exe) => self.output.success(&format!("{}: {}", status.label, exe)),
                None => self.output.error(&format!("{}: not found", status.label)),
            }
        }
        ensure_present(&statuses)
    }

    /// Builds `platforms` in order.
    ///
    /// The first failure aborts unless `ignore_errors` is set, in which case
    /// it is recorded in the report and the next platform runs.
    pub async fn build_platforms(
        &self,
        config: &BuildConfig,
        layout: &ProjectLayout,
        platforms: &[Platform],
        request: &BuildRequest,
    ) -> Result<BuildReport> {
        let mut report = BuildReport::default();

        for &platform in platforms {
            match self.build_platform(config, layout, platform, request).await {
                Ok(result) => report.completed.push(result),
                Err(error) if request.ignore_errors => {
                    self.output
                        .error(&format!("{} build failed: {}", platform.display_name(), error));
                    self.output.warn("Continuing with the next platform (--ignore-errors)");
                    report.failures.push(PlatformFailure { platform, error });
                }
                Err(error) => return Err(error),
            }
        }

        Ok(report)
    }

    async fn build_platform(
        &self,
        config: &BuildConfig,
        layout: &ProjectLayout,
        platform: Platform,
        request: &BuildRequest,
    ) -> Result<BuildResult> {
        let arch = request
            .arch
            .unwrap_or_else(|| config.targets.default_arch(platform));
        let target = resolve(platform, arch)?;

        self.output
            .section(&format!("Building {} ({})", platform.display_name(), target.arch));
        self.output
            .info(&format!("Rust target: {}", target.toolchain_triple));

        let tools = probe_optional(self.runner, platform);
        let mut disabled = config.targets.disabled_formats(platform);
        if request.options.no_appimage {
            disabled.insert(PackageFormat::AppImage);
        }
        let formats = select_formats(&target, &tools, &disabled);
        self.output.info(&format!(
            "Formats: {}",
            formats
                .iter()
                .map(|f| f.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        ));

        let ctx = BuildContext {
            runner: self.runner,
            output: self.output,
            config,
            layout,
            options: &request.options,
        };
        PlatformDriver::for_platform(platform)
            .build(&ctx, &target, &formats)
            .await
    }

    fn print_summary(&self, report: &BuildReport) {
        self.output.section("Build summary");
        for result in &report.completed {
            self.output.success(&format!(
                "{} {} ({}): {}",
                result.platform.display_name(),
                result.arch,
                result.toolchain_triple,
                result
                    .formats_produced
                    .iter()
                    .map(|f| f.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ));
            self.output
                .indent(&format!("Artifacts: {}", result.artifact_directory.display()));
        }
        for failure in &report.failures {
            self.output.error(&format!(
                "{}: {}",
                failure.platform.display_name(),
                failure.error
            ));
        }
    }
}
