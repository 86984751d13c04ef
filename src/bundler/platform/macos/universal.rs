//! Universal `.app` assembly.
//!
//! Both single-architecture bundles must already exist. The two executables
//! are merged with `lipo`; everything else is copied from the x86_64 bundle.

use crate::bundler::platform::BuildContext;
use crate::bundler::platform::stages::run_step;
use crate::bundler::utils::fs;
use crate::bundler::{BuildTarget, PackageFormat};
use crate::error::{BuildError, Result};
use crate::executor::{CommandRunner, ExecutionRequest};
use std::path::{Path, PathBuf};

/// Bundle subdirectory holding the executable; merged, never copied.
pub const EXECUTABLE_DIR: &str = "Contents/MacOS";

/// `<bundle-root>/macos/<product>.app` for `toolchain_triple`.
pub fn app_bundle_path<R>(ctx: &BuildContext<'_, R>, toolchain_triple: &str) -> PathBuf {
    ctx.layout
        .bundle_root(toolchain_triple)
        .join(PackageFormat::App.bundle_dir_name())
        .join(format!("{}.app", ctx.config.targets.product_name))
}

fn executable_in(app: &Path, binary_name: &str) -> PathBuf {
    app.join(EXECUTABLE_DIR).join(binary_name)
}

/// Builds the universal `.app` (and optionally a universal `.dmg`) from the
/// component builds of `target`. Returns the formats produced.
pub async fn assemble<R: CommandRunner>(
    ctx: &BuildContext<'_, R>,
    target: &BuildTarget,
    formats: &[PackageFormat],
) -> Result<Vec<PackageFormat>> {
    let binary_name = ctx.binary_name();
    let component_apps: Vec<PathBuf> = target
        .components()
        .iter()
        .map(|component| app_bundle_path(ctx, component.toolchain_triple))
        .collect();

    let inputs: Vec<PathBuf> = component_apps
        .iter()
        .map(|app| executable_in(app, binary_name))
        .collect();
    if let Some(missing) = inputs.iter().find(|path| !path.is_file()) {
        return Err(BuildError::ArtifactNotFound {
            what: "Single-architecture executable".to_string(),
            searched: vec![missing.clone()],
        });
    }

    let universal_app = app_bundle_path(ctx, target.toolchain_triple);
    let universal_binary = executable_in(&universal_app, binary_name);
    fs::create_dir_all(&universal_app, true).await?;
    if let Some(parent) = universal_binary.parent() {
        fs::create_dir_all(parent, false).await?;
    }

    let mut lipo = ExecutionRequest::new("lipo").arg("-create");
    for input in &inputs {
        lipo = lipo.arg_path(input);
    }
    let lipo = lipo
        .arg("-output")
        .arg_path(&universal_binary)
        .timeout(ctx.options.command_timeout);
    run_step(ctx, "Merging executables with lipo", &lipo).await?;

    if !universal_binary.is_file() {
        return Err(BuildError::ArtifactNotFound {
            what: "Universal executable".to_string(),
            searched: vec![universal_binary],
        });
    }

    let template_app = component_apps
        .first()
        .ok_or_else(|| anyhow::anyhow!("universal target has no components"))?;
    fs::copy_dir_filtered(template_app, &universal_app, &[PathBuf::from(EXECUTABLE_DIR)]).await?;
    ctx.output
        .success(&format!("Universal bundle at {}", universal_app.display()));

    let mut produced = Vec::new();
    if formats.contains(&PackageFormat::App) {
        produced.push(PackageFormat::App);
    }
    if formats.contains(&PackageFormat::Dmg) && create_dmg(ctx, target, &universal_app).await? {
        produced.push(PackageFormat::Dmg);
    }
    Ok(produced)
}

/// Packs the universal `.app` into a compressed disk image with `hdiutil`.
///
/// Returns false, with a warning, when `hdiutil` is unavailable.
async fn create_dmg<R: CommandRunner>(
    ctx: &BuildContext<'_, R>,
    target: &BuildTarget,
    universal_app: &Path,
) -> Result<bool> {
    if !ctx.runner.exists_on_path("hdiutil") {
        ctx.output
            .warn("hdiutil not found; skipping the universal dmg (the .app bundle is complete)");
        return Ok(false);
    }

    let product = ctx.product_name();
    let dmg = ctx
        .layout
        .bundle_root(target.toolchain_triple)
        .join(PackageFormat::Dmg.bundle_dir_name())
        .join(format!("{}_{}_universal.dmg", product, ctx.config.version.current));
    if let Some(parent) = dmg.parent() {
        fs::create_dir_all(parent, false).await?;
    }

    let request = ExecutionRequest::new("hdiutil")
        .args(["create", "-volname", product, "-srcfolder"])
        .arg_path(universal_app)
        .args(["-ov", "-format", "UDZO"])
        .arg_path(&dmg)
        .timeout(ctx.options.command_timeout);
    run_step(ctx, "Creating universal dmg", &request).await?;
    Ok(true)
}
