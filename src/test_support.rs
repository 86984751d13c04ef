//! Test doubles shared by unit tests.

use crate::bundler::platform::{BuildContext, BuildOptions};
use crate::cli::OutputManager;
use crate::config::{BuildConfig, ProjectLayout, TARGETS_FILE, TargetsConfig, VERSION_FILE, VersionInfo};
use crate::error::{BuildError, Result};
use crate::executor::{CommandRunner, ExecutionRequest, ExecutionResult};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tempfile::TempDir;

/// Every required tool.
pub const REQUIRED: [&str; 5] = ["node", "npm", "cargo", "rustc", "cargo-tauri"];

#[derive(Clone, Debug)]
enum Effect {
    Exit { code: i32, stdout: String, stderr: String },
    Create(PathBuf),
    TimeOut,
}

/// Recording [`CommandRunner`].
///
/// Commands succeed with empty output unless a rule whose pattern is a
/// substring of the command line says otherwise. Every matching `creates`
/// rule writes its file; the first matching exit rule decides the outcome.
#[derive(Debug, Default)]
pub struct FakeRunner {
    tools: BTreeSet<String>,
    rules: Vec<(String, Effect)>,
    requests: Mutex<Vec<ExecutionRequest>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tools.extend(tools.into_iter().map(Into::into));
        self
    }

    pub fn creates(mut self, pattern: &str, path: impl Into<PathBuf>) -> Self {
        self.rules.push((pattern.to_string(), Effect::Create(path.into())));
        self
    }

    pub fn fails(mut self, pattern: &str, code: i32, stderr: &str) -> Self {
        self.rules.push((
            pattern.to_string(),
            Effect::Exit {
                code,
                stdout: String::new(),
                stderr: stderr.to_string(),
            },
        ));
        self
    }

    pub fn responds(mut self, pattern: &str, stdout: &str) -> Self {
        self.rules.push((
            pattern.to_string(),
            Effect::Exit {
                code: 0,
                stdout: stdout.to_string(),
                stderr: String::new(),
            },
        ));
        self
    }

    pub fn times_out(mut self, pattern: &str) -> Self {
        self.rules.push((pattern.to_string(), Effect::TimeOut));
        self
    }

    pub fn requests(&self) -> Vec<ExecutionRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Command lines in invocation order.
    pub fn calls(&self) -> Vec<String> {
        self.requests().iter().map(ExecutionRequest::command_line).collect()
    }

    pub fn calls_matching(&self, pattern: &str) -> Vec<String> {
        self.calls().into_iter().filter(|c| c.contains(pattern)).collect()
    }

    pub fn count(&self, pattern: &str) -> usize {
        self.calls_matching(pattern).len()
    }

    fn respond(&self, request: &ExecutionRequest) -> Result<ExecutionResult> {
        let command = request.command_line();
        self.requests.lock().unwrap().push(request.clone());

        let mut outcome = None;
        for (pattern, effect) in &self.rules {
            if !command.contains(pattern.as_str()) {
                continue;
            }
            match effect {
                Effect::Create(path) => {
                    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
                    std::fs::write(path, b"fake artifact").unwrap();
                }
                Effect::TimeOut if outcome.is_none() => {
                    return Err(BuildError::Timeout {
                        command,
                        timeout: request.timeout_limit().unwrap_or(Duration::from_secs(1)),
                    });
                }
                Effect::Exit { code, stdout, stderr } if outcome.is_none() => {
                    outcome = Some((*code, stdout.clone(), stderr.clone()));
                }
                _ => {}
            }
        }

        let (exit_code, stdout, stderr) = outcome.unwrap_or((0, String::new(), String::new()));
        ExecutionResult {
            command,
            stdout,
            stderr,
            exit_code,
        }
        .into_checked(request)
    }
}

impl CommandRunner for FakeRunner {
    async fn run(&self, request: &ExecutionRequest) -> Result<ExecutionResult> {
        self.respond(request)
    }

    fn exists_on_path(&self, tool: &str) -> bool {
        self.tools.contains(tool)
    }
}

/// A throwaway project root with loaded configuration.
///
/// Product `RTodo`, binary `rtodo`, version 1.2.0 build 42. The frontend
/// step is skipped and AppRun is never downloaded unless asked for.
pub struct Fixture {
    dir: TempDir,
    pub config: BuildConfig,
    pub layout: ProjectLayout,
    pub output: OutputManager,
    pub options: BuildOptions,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = BuildConfig {
            targets: TargetsConfig {
                product_name: "RTodo".to_string(),
                binary_name: "rtodo".to_string(),
                frontend_dir: PathBuf::from("frontend"),
                tauri_dir: PathBuf::from("src-tauri"),
                platforms: Default::default(),
            },
            version: VersionInfo {
                current: "1.2.0".to_string(),
                build_number: "42".to_string(),
            },
        };
        let layout = ProjectLayout::new(dir.path(), &config.targets);
        std::fs::create_dir_all(&layout.tauri_dir).unwrap();

        Self {
            dir,
            config,
            layout,
            output: OutputManager::new(false, true),
            options: BuildOptions {
                skip_frontend: true,
                prefetch_apprun: false,
                ..BuildOptions::default()
            },
        }
    }

    /// Enables the frontend step and creates the frontend directory.
    pub fn with_frontend(mut self) -> Self {
        std::fs::create_dir_all(&self.layout.frontend_dir).unwrap();
        self.options.skip_frontend = false;
        self
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn context<'a, R>(&'a self, runner: &'a R) -> BuildContext<'a, R> {
        BuildContext {
            runner,
            output: &self.output,
            config: &self.config,
            layout: &self.layout,
            options: &self.options,
        }
    }

    /// Writes `targets.json` and `version.json` and returns their directory.
    pub fn write_config_files(&self) -> PathBuf {
        let config_dir = self.root().join("build").join("configs");
        std::fs::create_dir_all(&config_dir).unwrap();
        std::fs::write(
            config_dir.join(TARGETS_FILE),
            r#"{"productName":"RTodo","binaryName":"rtodo","platforms":{"linux":{"defaultArch":"x86_64"}}}"#,
        )
        .unwrap();
        std::fs::write(
            config_dir.join(VERSION_FILE),
            r#"{"current":"1.2.0","buildNumber":"42"}"#,
        )
        .unwrap();
        config_dir
    }

    /// `<tauri>/target/<triple>/release/rtodo`
    pub fn binary_path(&self, toolchain_triple: &str) -> PathBuf {
        self.layout
            .target_dir()
            .join(toolchain_triple)
            .join("release")
            .join(&self.config.targets.binary_name)
    }

    /// Creates the compiled binary as if a previous build left it behind.
    pub fn write_binary(&self, toolchain_triple: &str) -> PathBuf {
        let path = self.binary_path(toolchain_triple);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"\x7fELF").unwrap();
        path
    }

    /// Path below `<tauri>/target/<triple>/release/bundle`.
    pub fn bundle_file(&self, toolchain_triple: &str, relative: &str) -> PathBuf {
        self.layout.bundle_root(toolchain_triple).join(relative)
    }
}
