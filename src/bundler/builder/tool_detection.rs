//! External tool detection and availability checking.
//!
//! Required tools gate the whole run: if any is missing the build stops
//! before any expensive work. Optional tools only prune the package formats
//! a platform driver attempts.

use crate::bundler::{Platform, ToolAvailability};
use crate::error::{BuildError, Result};
use crate::executor::CommandRunner;

/// A tool the build cannot proceed without.
#[derive(Clone, Copy, Debug)]
pub struct RequiredTool {
    /// Human-readable label
    pub label: &'static str,
    /// Executable names; any one of them satisfies the requirement
    pub executables: &'static [&'static str],
    /// Install instruction printed when missing
    pub install_hint: &'static str,
}

/// Tools every build needs, checked in this order.
pub const REQUIRED_TOOLS: &[RequiredTool] = &[
    RequiredTool {
        label: "node",
        executables: &["node"],
        install_hint: "Install Node.js 18 or newer: https://nodejs.org",
    },
    RequiredTool {
        label: "npm",
        executables: &["npm"],
        install_hint: "npm ships with Node.js: https://nodejs.org",
    },
    RequiredTool {
        label: "cargo",
        executables: &["cargo"],
        install_hint: "Install Rust via rustup: https://rustup.rs",
    },
    RequiredTool {
        label: "rustc",
        executables: &["rustc"],
        install_hint: "Install Rust via rustup: https://rustup.rs",
    },
    RequiredTool {
        label: "Tauri CLI",
        executables: &["cargo-tauri", "tauri"],
        install_hint: "Run: cargo install tauri-cli --version '^2.0.0'",
    },
];

/// Optional tools probed per platform; absence only prunes formats.
pub fn optional_tools(platform: Platform) -> &'static [&'static str] {
    match platform {
        Platform::Windows => &["makensis", "candle"],
        Platform::Linux => &["linuxdeploy", "rpmbuild", "rpm"],
        Platform::Macos => &["hdiutil", "lipo"],
    }
}

/// Presence of one required tool.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolStatus {
    pub label: &'static str,
    pub install_hint: &'static str,
    /// Executable name that was found, if any
    pub found: Option<&'static str>,
}

impl ToolStatus {
    pub fn is_present(&self) -> bool {
        self.found.is_some()
    }
}

/// Reports presence of every tool in `tools`. Never fails.
pub fn probe_required<R: CommandRunner>(runner: &R, tools: &[RequiredTool]) -> Vec<ToolStatus> {
    tools
        .iter()
        .map(|tool| {
            let found = tool
                .executables
                .iter()
                .copied()
                .find(|exe| runner.exists_on_path(exe));
            match found {
                Some(exe) => log::debug!("✓ {} available as {}", tool.label, exe),
                None => log::debug!("{} not found in PATH", tool.label),
            }
            ToolStatus {
                label: tool.label,
                install_hint: tool.install_hint,
                found,
            }
        })
        .collect()
}

/// Fails with [`BuildError::Environment`] naming every absent tool.
pub fn ensure_present(statuses: &[ToolStatus]) -> Result<()> {
    let missing: Vec<&ToolStatus> = statuses.iter().filter(|s| !s.is_present()).collect();
    if missing.is_empty() {
        return Ok(());
    }
    Err(BuildError::Environment {
        tools: missing.iter().map(|s| s.label.to_string()).collect(),
        hints: missing
            .iter()
            .map(|s| format!("{}: {}", s.label, s.install_hint))
            .collect(),
    })
}

/// Probes the optional tools for `platform`.
pub fn probe_optional<R: CommandRunner>(runner: &R, platform: Platform) -> ToolAvailability {
    let present: Vec<&str> = optional_tools(platform)
        .iter()
        .copied()
        .filter(|tool| runner.exists_on_path(tool))
        .collect();
    log::debug!(
        "Optional tools for {}: {}",
        platform,
        if present.is_empty() {
            "none".to_string()
        } else {
            present.join(", ")
        }
    );
    ToolAvailability::new(present)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeRunner;

    #[test]
    fn all_required_tools_present() {
        let runner = FakeRunner::new().with_tools(["node", "npm", "cargo", "rustc", "cargo-tauri"]);
        let statuses = probe_required(&runner, REQUIRED_TOOLS);
        assert!(statuses.iter().all(ToolStatus::is_present));
        assert!(ensure_present(&statuses).is_ok());
    }

    #[test]
    fn tauri_cli_accepts_either_executable() {
        let runner = FakeRunner::new().with_tools(["node", "npm", "cargo", "rustc", "tauri"]);
        let statuses = probe_required(&runner, REQUIRED_TOOLS);
        let tauri = statuses.iter().find(|s| s.label == "Tauri CLI").unwrap();
        assert_eq!(tauri.found, Some("tauri"));
    }

    #[test]
    fn missing_tools_are_all_reported_with_hints() {
        let runner = FakeRunner::new().with_tools(["node", "npm", "rustc"]);
        let statuses = probe_required(&runner, REQUIRED_TOOLS);
        match ensure_present(&statuses) {
            Err(BuildError::Environment { tools, hints }) => {
                assert_eq!(tools, vec!["cargo".to_string(), "Tauri CLI".to_string()]);
                assert!(hints[1].contains("cargo install tauri-cli"));
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn optional_probe_only_reports_present_tools() {
        let runner = FakeRunner::new().with_tools(["rpmbuild"]);
        let tools = probe_optional(&runner, Platform::Linux);
        assert!(tools.has("rpmbuild"));
        assert!(!tools.has("linuxdeploy"));
    }
}
