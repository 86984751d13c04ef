//! `desktop-build validate`
//!
//! Probes every required and optional tool concurrently, then checks the
//! configuration files. Nothing is built.

use crate::bundler::{Arch, Platform, resolve, supported_architectures};
use crate::bundler::builder::tool_detection::{REQUIRED_TOOLS, optional_tools, probe_required};
use crate::bundler::platform::stages::{PROBE_TIMEOUT, installed_rust_targets};
use crate::cli::OutputManager;
use crate::cli::args::ValidateArgs;
use crate::config::{BuildConfig, ProjectLayout};
use crate::error::Result;
use crate::executor::{CommandRunner, ExecutionRequest, ExecutionResult, Executor};
use std::collections::BTreeMap;

/// One line of the validation table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckOutcome {
    pub name: String,
    pub passed: bool,
    /// Required checks fail the command; optional ones only warn
    pub required: bool,
    pub detail: String,
}

fn version_request(program: &str) -> ExecutionRequest {
    ExecutionRequest::new(program)
        .arg("--version")
        .timeout(PROBE_TIMEOUT)
        .allow_failure()
}

/// First non-empty line of a `--version` probe.
fn version_line(result: &ExecutionResult) -> Option<String> {
    if !result.success() {
        return None;
    }
    result
        .stdout
        .lines()
        .chain(result.stderr.lines())
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
}

/// Tool checks: presence from PATH, versions probed in parallel.
pub async fn check_tools(executor: &Executor, platform: Option<Platform>, jobs: usize) -> Vec<CheckOutcome> {
    let statuses = probe_required(executor, REQUIRED_TOOLS);
    let optional: Vec<&str> = platform.map(optional_tools).unwrap_or_default().to_vec();
    let optional_present: Vec<&str> = optional
        .iter()
        .copied()
        .filter(|tool| executor.exists_on_path(tool))
        .collect();

    let requests: Vec<ExecutionRequest> = statuses
        .iter()
        .filter_map(|status| status.found)
        .chain(optional_present.iter().copied())
        .map(version_request)
        .collect();
    let versions: BTreeMap<String, ExecutionResult> = executor
        .run_many_parallel(requests, jobs)
        .await
        .into_iter()
        .map(|result| (result.command.clone(), result))
        .collect();
    let version_of = |program: &str| {
        versions
            .get(&version_request(program).command_line())
            .and_then(version_line)
            .unwrap_or_else(|| "version unknown".to_string())
    };

    let mut outcomes: Vec<CheckOutcome> = statuses
        .iter()
        .map(|status| match status.found {
            Some(exe) => CheckOutcome {
                name: status.label.to_string(),
                passed: true,
                required: true,
                detail: version_of(exe),
            },
            None => CheckOutcome {
                name: status.label.to_string(),
                passed: false,
                required: true,
                detail: status.install_hint.to_string(),
            },
        })
        .collect();

    outcomes.extend(optional.iter().map(|tool| {
        let present = optional_present.contains(tool);
        CheckOutcome {
            name: (*tool).to_string(),
            passed: present,
            required: false,
            detail: if present {
                version_of(tool)
            } else {
                "not found; dependent formats are skipped".to_string()
            },
        }
    }));
    outcomes
}

/// Toolchain triples `platform` builds for; universal is assembled from
/// the single-architecture ones and has no rustup target of its own.
fn rust_triples(platform: Platform) -> Vec<&'static str> {
    supported_architectures(platform)
        .into_iter()
        .filter(|arch| *arch != Arch::Universal)
        .filter_map(|arch| resolve(platform, arch).ok())
        .map(|target| target.toolchain_triple)
        .collect()
}

/// Whether each of the platform's Rust targets is installed. Missing targets
/// are added by `build`, so these checks are optional.
pub async fn check_rust_targets<R: CommandRunner>(runner: &R, platform: Option<Platform>) -> Result<Vec<CheckOutcome>> {
    let Some(platform) = platform else {
        return Ok(Vec::new());
    };
    if !runner.exists_on_path("rustup") {
        return Ok(vec![CheckOutcome {
            name: "rustup".to_string(),
            passed: false,
            required: false,
            detail: "not found; Rust targets cannot be checked or added".to_string(),
        }]);
    }

    let installed = installed_rust_targets(runner).await?;
    Ok(rust_triples(platform)
        .into_iter()
        .map(|triple| {
            let passed = installed.contains(triple);
            CheckOutcome {
                name: triple.to_string(),
                passed,
                required: false,
                detail: if passed {
                    "installed".to_string()
                } else {
                    format!("not installed; rustup target add {triple}")
                },
            }
        })
        .collect())
}

/// Configuration and project layout checks.
pub fn check_project(config_dir: &std::path::Path, project_root: &std::path::Path) -> Vec<CheckOutcome> {
    let mut outcomes = Vec::new();
    let layout = match BuildConfig::load(config_dir) {
        Ok(config) => {
            outcomes.push(CheckOutcome {
                name: "build configuration".to_string(),
                passed: true,
                required: true,
                detail: format!(
                    "{} {} (build {})",
                    config.targets.product_name, config.version.current, config.version.build_number
                ),
            });
            ProjectLayout::new(project_root, &config.targets)
        }
        Err(e) => {
            outcomes.push(CheckOutcome {
                name: "build configuration".to_string(),
                passed: false,
                required: true,
                detail: e.to_string(),
            });
            ProjectLayout::conventional(project_root)
        }
    };

    let tauri_config = layout.tauri_config();
    outcomes.push(CheckOutcome {
        name: "tauri.conf.json".to_string(),
        passed: tauri_config.is_file(),
        required: true,
        detail: tauri_config.display().to_string(),
    });

    let package_json = layout.frontend_dir.join("package.json");
    outcomes.push(CheckOutcome {
        name: "frontend package.json".to_string(),
        passed: package_json.is_file(),
        required: false,
        detail: package_json.display().to_string(),
    });
    outcomes
}

pub async fn execute(args: &ValidateArgs, output: &OutputManager) -> Result<i32> {
    let project_root = args.common.project_root()?;
    let config_dir = args.common.config_dir(args.config_dir.as_deref())?;
    let executor = Executor::new();

    output.section("Tools");
    let tools = check_tools(&executor, Platform::host(), args.jobs).await;
    report(output, &tools);

    output.section("Rust targets");
    let targets = check_rust_targets(&executor, Platform::host()).await?;
    report(output, &targets);

    output.section("Project");
    let project = check_project(&config_dir, &project_root);
    report(output, &project);

    let failed = tools
        .iter()
        .chain(targets.iter())
        .chain(project.iter())
        .filter(|outcome| outcome.required && !outcome.passed)
        .count();
    if failed == 0 {
        output.success("Ready to build");
        Ok(0)
    } else {
        output.error(&format!("{failed} required check(s) failed"));
        Ok(1)
    }
}

fn report(output: &OutputManager, outcomes: &[CheckOutcome]) {
    let width = outcomes.iter().map(|o| o.name.len()).max().unwrap_or(0);
    for outcome in outcomes {
        let line = format!("{:width$}  {}", outcome.name, outcome.detail);
        match (outcome.passed, outcome.required) {
            (true, _) => output.success(&line),
            (false, true) => output.error(&line),
            (false, false) => output.warn(&line),
        }
    }
}
