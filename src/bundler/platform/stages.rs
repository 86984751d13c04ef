//! Stages shared by every platform driver.

use super::{Artifact, BuildContext};
use crate::bundler::utils::{checksum, fs};
use crate::bundler::{PackageFormat, Platform};
use crate::error::{BuildError, Result};
use crate::executor::{CommandRunner, ExecutionRequest, ExecutionResult};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Limit for `npm install` / `npm run build`
pub const FRONTEND_TIMEOUT: Duration = Duration::from_secs(300);

/// Limit for short probe commands
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(30);

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

enum Probe {
    OnPath(&'static str),
    Succeeds(&'static str, &'static [&'static str]),
}

/// A system dependency a platform's bundler relies on.
struct SystemDependency {
    label: &'static str,
    probe: Probe,
    hint: &'static str,
}

fn system_dependencies(platform: Platform) -> &'static [SystemDependency] {
    match platform {
        Platform::Linux => &[
            SystemDependency {
                label: "gcc",
                probe: Probe::OnPath("gcc"),
                hint: "sudo apt install build-essential",
            },
            SystemDependency {
                label: "pkg-config",
                probe: Probe::OnPath("pkg-config"),
                hint: "sudo apt install pkg-config",
            },
            SystemDependency {
                label: "webkit2gtk-4.1",
                probe: Probe::Succeeds("pkg-config", &["--exists", "webkit2gtk-4.1"]),
                hint: "sudo apt install libwebkit2gtk-4.1-dev libgtk-3-dev librsvg2-dev",
            },
        ],
        Platform::Windows => &[
            SystemDependency {
                label: "WiX Toolset",
                probe: Probe::OnPath("candle"),
                hint: "Install WiX Toolset v3 (https://wixtoolset.org) to build MSI installers",
            },
            SystemDependency {
                label: "NSIS",
                probe: Probe::OnPath("makensis"),
                hint: "Install NSIS (https://nsis.sourceforge.io) to build setup executables",
            },
        ],
        Platform::Macos => &[
            SystemDependency {
                label: "Xcode",
                probe: Probe::Succeeds("xcodebuild", &["-version"]),
                hint: "Install Xcode from the App Store",
            },
            SystemDependency {
                label: "Xcode Command Line Tools",
                probe: Probe::Succeeds("xcode-select", &["-p"]),
                hint: "Run: xcode-select --install",
            },
        ],
    }
}

/// Warns about missing platform dependencies. Never fails; the bundler
/// itself reports the hard error if one turns out to matter.
///
/// Returns the labels of the missing dependencies.
pub async fn check_dependencies<R: CommandRunner>(
    ctx: &BuildContext<'_, R>,
    platform: Platform,
) -> Vec<&'static str> {
    let mut missing = Vec::new();
    for dependency in system_dependencies(platform) {
        let present = match dependency.probe {
            Probe::OnPath(tool) => ctx.runner.exists_on_path(tool),
            Probe::Succeeds(program, args) => {
                ctx.runner.exists_on_path(program)
                    && ctx
                        .runner
                        .run(
                            &ExecutionRequest::new(program)
                                .args(args.iter().copied())
                                .timeout(PROBE_TIMEOUT)
                                .allow_failure(),
                        )
                        .await
                        .map(|result| result.success())
                        .unwrap_or(false)
            }
        };
        if present {
            ctx.output.debug(&format!("{} found", dependency.label));
        } else {
            ctx.output
                .warn(&format!("{} not found ({})", dependency.label, dependency.hint));
            missing.push(dependency.label);
        }
    }
    missing
}

/// Triples listed by `rustup target list --installed`.
///
/// A failing listing yields an empty set; callers decide what that means.
pub async fn installed_rust_targets<R: CommandRunner>(runner: &R) -> Result<BTreeSet<String>> {
    let listing = runner
        .run(
            &ExecutionRequest::new("rustup")
                .args(["target", "list", "--installed"])
                .timeout(PROBE_TIMEOUT)
                .allow_failure(),
        )
        .await?;
    Ok(listing
        .stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// Installs any of `triples` missing from `rustup target list --installed`.
pub async fn ensure_rust_targets<R: CommandRunner>(
    ctx: &BuildContext<'_, R>,
    triples: &[&str],
) -> Result<()> {
    if !ctx.runner.exists_on_path("rustup") {
        ctx.output.warn(&format!(
            "rustup not found; assuming Rust targets are installed: {}",
            triples.join(", ")
        ));
        return Ok(());
    }

    let installed = installed_rust_targets(ctx.runner).await?;

    for &triple in triples {
        if installed.contains(triple) {
            log::debug!("Rust target {} already installed", triple);
            continue;
        }
        ctx.output.info(&format!("Adding Rust target {triple}"));
        ctx.runner
            .run(
                &ExecutionRequest::new("rustup")
                    .args(["target", "add", triple])
                    .timeout(ctx.options.command_timeout)
                    .streamed(),
            )
            .await?;
    }
    Ok(())
}

/// npm launcher name on the host.
pub fn npm_program() -> &'static str {
    if cfg!(windows) { "npm.cmd" } else { "npm" }
}

/// `npm install` then `npm run build` in the frontend directory.
pub async fn build_frontend<R: CommandRunner>(ctx: &BuildContext<'_, R>) -> Result<()> {
    if ctx.options.skip_frontend {
        ctx.output.info("Skipping frontend build");
        return Ok(());
    }

    let dir = &ctx.layout.frontend_dir;
    if !dir.is_dir() {
        return Err(BuildError::Config {
            path: dir.clone(),
            reason: "frontend directory does not exist".to_string(),
        });
    }

    let npm = npm_program();
    let requests = [
        ExecutionRequest::new(npm).arg("install"),
        ExecutionRequest::new(npm).args(["run", "build"]),
    ]
    .map(|request| request.current_dir(dir).timeout(FRONTEND_TIMEOUT).streamed());

    let spinner = ctx.output.spinner("Building frontend");
    match ctx.runner.run_many_sequential(&requests).await {
        Ok(_) => {
            spinner.succeed("Frontend built");
            Ok(())
        }
        Err(e) => {
            spinner.fail("Frontend build failed");
            Err(e)
        }
    }
}

/// `cargo tauri build --target <triple> --bundles <list>` in the Tauri directory.
///
/// Formats the bundler does not know (tar.gz) are dropped; with nothing
/// left the command compiles only (`--no-bundle`).
pub fn bundler_command<R>(
    ctx: &BuildContext<'_, R>,
    toolchain_triple: &str,
    formats: &[PackageFormat],
) -> ExecutionRequest {
    let names: Vec<&str> = formats.iter().filter_map(|f| f.bundler_name()).collect();
    let request = ExecutionRequest::new("cargo").args(["tauri", "build", "--target", toolchain_triple]);
    let request = if names.is_empty() {
        request.arg("--no-bundle")
    } else {
        request.args(["--bundles".to_string(), names.join(",")])
    };
    request
        .current_dir(&ctx.layout.tauri_dir)
        .timeout(ctx.options.command_timeout)
        .streamed()
}

/// Runs one long step behind a spinner.
pub async fn run_step<R: CommandRunner>(
    ctx: &BuildContext<'_, R>,
    message: &str,
    request: &ExecutionRequest,
) -> Result<ExecutionResult> {
    log::debug!("Running: {}", request);
    let spinner = ctx.output.spinner(message);
    match ctx.runner.run(request).await {
        Ok(result) if result.success() => {
            spinner.succeed(message);
            Ok(result)
        }
        Ok(result) => {
            spinner.fail(&format!("{message} (exit code {})", result.exit_code));
            Ok(result)
        }
        Err(e) => {
            spinner.fail(message);
            Err(e)
        }
    }
}

/// Lists and reports what each produced format left in `bundle_root`.
pub async fn collect_artifacts<R: CommandRunner>(
    ctx: &BuildContext<'_, R>,
    bundle_root: &Path,
    formats: &[PackageFormat],
) -> Result<Vec<Artifact>> {
    let mut artifacts = Vec::new();

    for format in formats {
        let dir = bundle_root.join(format.bundle_dir_name());
        let mut paths: Vec<PathBuf> = match std::fs::read_dir(&dir) {
            Ok(entries) => entries
                .filter_map(|e| e.ok())
                .filter(|e| !e.file_name().to_string_lossy().starts_with('.'))
                .map(|e| e.path())
                .collect(),
            Err(_) => {
                log::debug!("No {} output at {}", format, dir.display());
                continue;
            }
        };
        paths.sort();

        for path in paths {
            let sha256 = if ctx.output.is_verbose() {
                Some(checksum::calculate_sha256(&path).await?)
            } else {
                None
            };
            artifacts.push(Artifact {
                format: *format,
                size_bytes: fs::disk_usage(&path),
                path,
                sha256,
            });
        }
    }

    if artifacts.is_empty() {
        ctx.output.warn(&format!("No artifacts found under {}", bundle_root.display()));
    }
    for artifact in &artifacts {
        ctx.output.indent(&format!(
            "[{}] {} ({:.2} MB)",
            artifact.format,
            artifact.path.display(),
            artifact.size_bytes as f64 / BYTES_PER_MB
        ));
        if let Some(sha) = &artifact.sha256 {
            ctx.output.indent(&format!("    SHA-256: {sha}"));
        }
    }

    Ok(artifacts)
}
