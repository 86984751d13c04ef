//! CPU architecture types.

use std::fmt;
use std::str::FromStr;

/// CPU architecture for target binaries.
///
/// # Platform Support
///
/// - ✅ Linux: X86_64, Arm64
/// - ✅ macOS: X86_64, Arm64, Universal
/// - ✅ Windows: X86_64, Arm64
///
/// # Examples
///
/// ```
/// use desktop_bundle_orchestrator::bundler::Arch;
///
/// let arch: Arch = "aarch64".parse().unwrap();
/// assert_eq!(arch, Arch::Arm64);
/// assert_eq!(arch.to_string(), "arm64");
/// ```
#[derive(
    Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, serde::Deserialize, serde::Serialize,
    clap::ValueEnum,
)]
pub enum Arch {
    /// x86_64 / AMD64 (64-bit) - Most common desktop architecture
    #[serde(rename = "x86_64", alias = "amd64", alias = "x64")]
    #[value(name = "x86_64", alias = "amd64", alias = "x64")]
    X86_64,
    /// AArch64 / ARM64 (64-bit) - Apple Silicon, Windows on ARM, ARM servers
    #[serde(rename = "arm64", alias = "aarch64")]
    #[value(name = "arm64", alias = "aarch64")]
    Arm64,
    /// macOS universal binary - Contains both x86_64 and arm64
    #[serde(rename = "universal")]
    #[value(name = "universal")]
    Universal,
}

impl Arch {
    pub const ALL: [Arch; 3] = [Arch::X86_64, Arch::Arm64, Arch::Universal];

    /// Name used on the command line and in configuration files.
    pub fn as_str(self) -> &'static str {
        match self {
            Arch::X86_64 => "x86_64",
            Arch::Arm64 => "arm64",
            Arch::Universal => "universal",
        }
    }

    /// Architecture name as spelled in machine-level tooling (AppRun, tarballs).
    pub fn machine_name(self) -> &'static str {
        match self {
            Arch::X86_64 => "x86_64",
            Arch::Arm64 => "aarch64",
            Arch::Universal => "universal",
        }
    }

    /// Architecture of the running host, if it is one we build for.
    pub fn host() -> Option<Arch> {
        match std::env::consts::ARCH {
            "x86_64" => Some(Arch::X86_64),
            "aarch64" => Some(Arch::Arm64),
            _ => None,
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Arch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "x86_64" | "amd64" | "x64" => Ok(Arch::X86_64),
            "arm64" | "aarch64" => Ok(Arch::Arm64),
            "universal" => Ok(Arch::Universal),
            other => Err(format!(
                "unknown architecture '{other}' (expected x86_64, arm64 or universal)"
            )),
        }
    }
}
