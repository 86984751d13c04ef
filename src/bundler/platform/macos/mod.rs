//! macOS driver.
//!
//! Single-architecture targets take one bundler invocation. `universal`
//! builds x86_64 and arm64 independently, then merges them (see
//! [`universal`]). Signing is forced to the ad-hoc identity so local builds
//! never reach for a real certificate.

pub mod universal;

use super::stages::{self, bundler_command, collect_artifacts, run_step};
use super::{BuildContext, BuildResult, Driver, Stage};
use crate::bundler::{BuildTarget, PackageFormat, Platform};
use crate::error::Result;
use crate::executor::CommandRunner;

/// Signing identity for local builds (`-` is ad-hoc)
pub const SIGNING_IDENTITY_VAR: &str = "APPLE_SIGNING_IDENTITY";
pub const AD_HOC_IDENTITY: &str = "-";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MacosDriver;

impl Driver for MacosDriver {
    async fn build<R: CommandRunner>(
        &self,
        ctx: &BuildContext<'_, R>,
        target: &BuildTarget,
        formats: &[PackageFormat],
    ) -> Result<BuildResult> {
        let components = target.components();
        let triples: Vec<&str> = components.iter().map(|c| c.toolchain_triple).collect();

        ctx.enter(target, Stage::CheckDependencies);
        stages::check_dependencies(ctx, Platform::Macos).await;
        stages::ensure_rust_targets(ctx, &triples).await?;

        ctx.enter(target, Stage::BuildFrontend);
        stages::build_frontend(ctx).await?;

        ctx.enter(target, Stage::BuildCoreBinary);
        for component in &components {
            let request = bundler_command(ctx, component.toolchain_triple, formats)
                .env(SIGNING_IDENTITY_VAR, AD_HOC_IDENTITY);
            let message = format!("Building {} for {}", component.arch, component.toolchain_triple);
            run_step(ctx, &message, &request).await?;
        }

        let produced = if target.is_universal() {
            ctx.enter(target, Stage::MergeUniversal);
            universal::assemble(ctx, target, formats).await?
        } else {
            formats.to_vec()
        };

        ctx.enter(target, Stage::CollectArtifacts);
        let bundle_root = ctx.layout.bundle_root(target.toolchain_triple);
        let artifacts = collect_artifacts(ctx, &bundle_root, &produced).await?;

        Ok(BuildResult {
            platform: target.platform,
            arch: target.arch,
            toolchain_triple: target.toolchain_triple,
            formats_produced: produced,
            artifact_directory: bundle_root,
            artifacts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::{Arch, resolve};
    use crate::error::BuildError;
    use crate::test_support::{FakeRunner, Fixture};

    const X86: &str = "x86_64-apple-darwin";
    const ARM: &str = "aarch64-apple-darwin";
    const UNIVERSAL: &str = "universal-apple-darwin";

    fn app_formats() -> Vec<PackageFormat> {
        vec![PackageFormat::App, PackageFormat::Dmg]
    }

    /// Runner whose bundler invocations produce an `.app` per architecture
    /// and whose `lipo` writes the merged executable.
    fn bundling_runner(fixture: &Fixture) -> FakeRunner {
        let mut runner = FakeRunner::new();
        for triple in [X86, ARM] {
            let app = fixture.bundle_file(triple, "macos/RTodo.app");
            let pattern = format!("--target {triple}");
            for file in ["Contents/MacOS/rtodo", "Contents/Info.plist", "Contents/Resources/icon.icns"] {
                runner = runner.creates(&pattern, app.join(file));
            }
        }
        runner.creates(
            "lipo",
            fixture.bundle_file(UNIVERSAL, "macos/RTodo.app/Contents/MacOS/rtodo"),
        )
    }

    #[tokio::test]
    async fn universal_builds_twice_then_merges_once() {
        let fixture = Fixture::new();
        let runner = bundling_runner(&fixture).with_tools(["hdiutil"]);
        let target = resolve(Platform::Macos, Arch::Universal).unwrap();

        let result = MacosDriver
            .build(&fixture.context(&runner), &target, &app_formats())
            .await
            .unwrap();

        assert_eq!(
            runner.calls_matching("cargo tauri build"),
            vec![
                format!("cargo tauri build --target {X86} --bundles app,dmg"),
                format!("cargo tauri build --target {ARM} --bundles app,dmg"),
            ]
        );
        assert_eq!(runner.count("lipo -create"), 1);
        assert_eq!(runner.count("hdiutil create"), 1);
        assert_eq!(result.toolchain_triple, UNIVERSAL);
        assert_eq!(result.formats_produced, app_formats());

        let universal = fixture.bundle_file(UNIVERSAL, "macos/RTodo.app");
        assert!(universal.join("Contents/Info.plist").is_file());
        assert!(universal.join("Contents/Resources/icon.icns").is_file());
    }

    #[tokio::test]
    async fn single_arch_skips_merge() {
        let fixture = Fixture::new();
        let runner = bundling_runner(&fixture);
        let target = resolve(Platform::Macos, Arch::Arm64).unwrap();

        let result = MacosDriver
            .build(&fixture.context(&runner), &target, &app_formats())
            .await
            .unwrap();

        assert_eq!(runner.count("cargo tauri build"), 1);
        assert_eq!(runner.count("lipo"), 0);
        assert_eq!(result.formats_produced, app_formats());
    }

    #[tokio::test]
    async fn bundler_runs_with_ad_hoc_signing() {
        let fixture = Fixture::new();
        let runner = bundling_runner(&fixture);
        let target = resolve(Platform::Macos, Arch::X86_64).unwrap();

        MacosDriver
            .build(&fixture.context(&runner), &target, &app_formats())
            .await
            .unwrap();

        let requests = runner.requests();
        let bundler = requests
            .iter()
            .find(|r| r.command_line().starts_with("cargo tauri build"))
            .unwrap();
        assert_eq!(
            bundler.environment_overrides().get(SIGNING_IDENTITY_VAR).map(String::as_str),
            Some(AD_HOC_IDENTITY)
        );
    }

    #[tokio::test]
    async fn universal_without_hdiutil_keeps_app_only() {
        let fixture = Fixture::new();
        let runner = bundling_runner(&fixture);
        let target = resolve(Platform::Macos, Arch::Universal).unwrap();

        let result = MacosDriver
            .build(&fixture.context(&runner), &target, &app_formats())
            .await
            .unwrap();

        assert_eq!(result.formats_produced, vec![PackageFormat::App]);
        assert_eq!(runner.count("hdiutil"), 0);
    }

    #[tokio::test]
    async fn failed_component_build_never_merges() {
        let fixture = Fixture::new();
        let runner = bundling_runner(&fixture).fails(&format!("--target {ARM}"), 1, "linker error");
        let target = resolve(Platform::Macos, Arch::Universal).unwrap();

        let outcome = MacosDriver
            .build(&fixture.context(&runner), &target, &app_formats())
            .await;

        assert!(matches!(outcome, Err(BuildError::Execution { .. })));
        assert_eq!(runner.count("lipo"), 0);
    }
}
