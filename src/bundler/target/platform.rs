//! Target operating systems.

use std::fmt;
use std::str::FromStr;

/// Operating system a build targets.
///
/// Parsing accepts the short aliases `win`, `mac` and `osx`.
#[derive(
    Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, serde::Deserialize, serde::Serialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[serde(alias = "win")]
    #[value(alias = "win")]
    Windows,
    Linux,
    #[serde(alias = "mac", alias = "osx")]
    #[value(alias = "mac", alias = "osx")]
    Macos,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::Windows, Platform::Linux, Platform::Macos];

    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Windows => "windows",
            Platform::Linux => "linux",
            Platform::Macos => "macos",
        }
    }

    /// Display name used in section headers.
    pub fn display_name(self) -> &'static str {
        match self {
            Platform::Windows => "Windows",
            Platform::Linux => "Linux",
            Platform::Macos => "macOS",
        }
    }

    /// Platform of the running host.
    pub fn host() -> Option<Platform> {
        Self::from_os(std::env::consts::OS)
    }

    /// Maps a `std::env::consts::OS` value.
    pub fn from_os(os: &str) -> Option<Platform> {
        match os {
            "windows" => Some(Platform::Windows),
            "linux" => Some(Platform::Linux),
            "macos" => Some(Platform::Macos),
            _ => None,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "windows" | "win" => Ok(Platform::Windows),
            "linux" => Ok(Platform::Linux),
            "macos" | "mac" | "osx" => Ok(Platform::Macos),
            other => Err(format!("unknown platform '{other}'")),
        }
    }
}
