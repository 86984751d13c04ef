//! Windows driver.
//!
//! A single bundler invocation compiles the binary and produces every
//! selected format; the bundler batches MSI and NSIS itself.

use super::stages::{self, bundler_command, collect_artifacts, run_step};
use super::{BuildContext, BuildResult, Driver, Stage};
use crate::bundler::{BuildTarget, PackageFormat, Platform};
use crate::error::Result;
use crate::executor::CommandRunner;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WindowsDriver;

impl Driver for WindowsDriver {
    async fn build<R: CommandRunner>(
        &self,
        ctx: &BuildContext<'_, R>,
        target: &BuildTarget,
        formats: &[PackageFormat],
    ) -> Result<BuildResult> {
        ctx.enter(target, Stage::CheckDependencies);
        stages::check_dependencies(ctx, Platform::Windows).await;
        stages::ensure_rust_targets(ctx, &[target.toolchain_triple]).await?;

        ctx.enter(target, Stage::BuildFrontend);
        stages::build_frontend(ctx).await?;

        ctx.enter(target, Stage::BuildCoreBinary);
        let request = bundler_command(ctx, target.toolchain_triple, formats);
        let message = format!("Building {} for {}", join_formats(formats), target.toolchain_triple);
        run_step(ctx, &message, &request).await?;

        ctx.enter(target, Stage::CollectArtifacts);
        let bundle_root = ctx.layout.bundle_root(target.toolchain_triple);
        let artifacts = collect_artifacts(ctx, &bundle_root, formats).await?;

        Ok(BuildResult {
            platform: target.platform,
            arch: target.arch,
            toolchain_triple: target.toolchain_triple,
            formats_produced: formats.to_vec(),
            artifact_directory: bundle_root,
            artifacts,
        })
    }
}

fn join_formats(formats: &[PackageFormat]) -> String {
    formats
        .iter()
        .map(|f| f.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
