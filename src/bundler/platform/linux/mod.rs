//! Linux driver.
//!
//! Compiles once and packages many times. A previously compiled binary is
//! reused; otherwise the first bundler format compiles it as a side effect.
//! After that first invocation the binary on disk, not the exit code, decides
//! whether compilation succeeded. Remaining formats are packaged one at a
//! time; only an appimage failure is absorbed.

pub mod apprun;
pub mod archive;

use super::stages::{self, bundler_command, collect_artifacts, run_step};
use super::{BuildContext, BuildResult, Driver, Stage};
use crate::bundler::{BuildTarget, PackageFormat, Platform, host_toolchain_triple};
use crate::config::ProjectLayout;
use crate::error::{BuildError, Result};
use crate::executor::CommandRunner;
use std::path::PathBuf;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LinuxDriver;

/// Where a compiled binary may already exist, most specific first.
///
/// `target/release/` only ever holds a native build, so it is searched only
/// when `toolchain_triple` is `host_triple`.
pub fn binary_candidates(
    layout: &ProjectLayout,
    toolchain_triple: &str,
    host_triple: Option<&str>,
    binary_name: &str,
) -> Vec<PathBuf> {
    let target_dir = layout.target_dir();
    let mut candidates = vec![target_dir.join(toolchain_triple).join("release").join(binary_name)];
    if host_triple == Some(toolchain_triple) {
        candidates.push(target_dir.join("release").join(binary_name));
    }
    candidates
}

/// First existing candidate.
pub fn locate_binary(candidates: &[PathBuf]) -> Option<PathBuf> {
    candidates.iter().find(|path| path.is_file()).cloned()
}

impl Driver for LinuxDriver {
    async fn build<R: CommandRunner>(
        &self,
        ctx: &BuildContext<'_, R>,
        target: &BuildTarget,
        formats: &[PackageFormat],
    ) -> Result<BuildResult> {
        let triple = target.toolchain_triple;
        let bundle_root = ctx.layout.bundle_root(triple);

        ctx.enter(target, Stage::CheckDependencies);
        stages::check_dependencies(ctx, Platform::Linux).await;
        stages::ensure_rust_targets(ctx, &[triple]).await?;

        ctx.enter(target, Stage::BuildFrontend);
        stages::build_frontend(ctx).await?;

        ctx.enter(target, Stage::BuildCoreBinary);
        let candidates = binary_candidates(ctx.layout, triple, host_toolchain_triple(), ctx.binary_name());
        let mut produced = Vec::new();
        let mut remaining: Vec<PackageFormat> = formats.to_vec();

        let binary = match locate_binary(&candidates) {
            Some(binary) => {
                ctx.output
                    .info(&format!("Reusing compiled binary {}", binary.display()));
                binary
            }
            None => {
                let first = remaining.iter().position(|f| f.bundler_name().is_some());
                match first.map(|index| remaining.remove(index)) {
                    Some(format) => {
                        if let Some(format) = compile_via_format(ctx, target, format).await? {
                            produced.push(format);
                        }
                    }
                    None => {
                        let request = bundler_command(ctx, triple, &[]);
                        run_step(ctx, &format!("Compiling {triple}"), &request).await?;
                    }
                }
                locate_binary(&candidates).ok_or_else(|| BuildError::ArtifactNotFound {
                    what: format!("Compiled binary `{}`", ctx.binary_name()),
                    searched: candidates.clone(),
                })?
            }
        };

        ctx.enter(target, Stage::PackagePerFormat);
        for format in remaining {
            match format {
                PackageFormat::TarGz => {
                    let spinner = ctx.output.spinner("Creating tar.gz archive");
                    match archive::build_tarball(ctx, target, &binary).await {
                        Ok(path) => spinner.succeed(&format!("Created {}", path.display())),
                        Err(e) => {
                            spinner.fail("tar.gz archive failed");
                            return Err(e);
                        }
                    }
                    produced.push(format);
                }
                PackageFormat::AppImage => {
                    if package_appimage(ctx, target).await? {
                        produced.push(format);
                    }
                }
                other => {
                    let request = bundler_command(ctx, triple, &[other]);
                    run_step(ctx, &format!("Packaging {other}"), &request).await?;
                    produced.push(other);
                }
            }
        }

        ctx.enter(target, Stage::CollectArtifacts);
        let artifacts = collect_artifacts(ctx, &bundle_root, &produced).await?;

        Ok(BuildResult {
            platform: target.platform,
            arch: target.arch,
            toolchain_triple: triple,
            formats_produced: produced,
            artifact_directory: bundle_root,
            artifacts,
        })
    }
}

/// Runs the first bundler format, which compiles the binary on the way.
///
/// A packaging failure here is tolerated; the caller checks for the binary.
/// Returns the format only if its packaging exited cleanly: files already in
/// the format directory may be left over from an earlier run.
async fn compile_via_format<R: CommandRunner>(
    ctx: &BuildContext<'_, R>,
    target: &BuildTarget,
    format: PackageFormat,
) -> Result<Option<PackageFormat>> {
    if format == PackageFormat::AppImage {
        prefetch_apprun(ctx, target).await;
    }

    let request = bundler_command(ctx, target.toolchain_triple, &[format]).allow_failure();
    let message = format!("Compiling {} and packaging {format}", target.toolchain_triple);
    let result = run_step(ctx, &message, &request).await?;

    if result.success() {
        return Ok(Some(format));
    }

    ctx.output.warn(&format!(
        "{format} packaging failed (exit code {}); continuing if the binary was compiled",
        result.exit_code
    ));
    if let Some(stderr) = result.stderr.lines().rev().find(|line| !line.trim().is_empty()) {
        ctx.output.indent(stderr);
    }
    Ok(None)
}

/// Packages the appimage format. Failure is absorbed; returns whether it
/// was produced.
async fn package_appimage<R: CommandRunner>(ctx: &BuildContext<'_, R>, target: &BuildTarget) -> Result<bool> {
    prefetch_apprun(ctx, target).await;

    let request = bundler_command(ctx, target.toolchain_triple, &[PackageFormat::AppImage]).allow_failure();
    let result = run_step(ctx, "Packaging appimage", &request).await?;
    if result.success() {
        return Ok(true);
    }

    ctx.output.warn(&format!(
        "appimage packaging failed (exit code {}); other formats are unaffected",
        result.exit_code
    ));
    ctx.output
        .indent("This is usually a network fetch during packaging. Check HTTP_PROXY/HTTPS_PROXY,");
    ctx.output.indent("or skip the format with --no-appimage.");
    Ok(false)
}

async fn prefetch_apprun<R>(ctx: &BuildContext<'_, R>, target: &BuildTarget) {
    if !ctx.options.prefetch_apprun {
        return;
    }
    if let Err(e) = apprun::prefetch(target.arch).await {
        ctx.output.warn(&format!("Could not prefetch AppRun: {e}"));
        if let Some(dir) = apprun::cache_dir() {
            ctx.output.indent(&format!(
                "Download {} manually into {}",
                apprun::download_url(target.arch),
                dir.display()
            ));
        }
    }
}
