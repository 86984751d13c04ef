//! Package formats and per-platform format selection.

use super::{Arch, BuildTarget, Platform};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// An installable or distributable package format.
#[derive(
    Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, serde::Deserialize, serde::Serialize,
)]
pub enum PackageFormat {
    #[serde(rename = "msi")]
    Msi,
    #[serde(rename = "nsis")]
    Nsis,
    #[serde(rename = "deb")]
    Deb,
    #[serde(rename = "tar.gz", alias = "targz", alias = "tgz")]
    TarGz,
    #[serde(rename = "appimage", alias = "AppImage")]
    AppImage,
    #[serde(rename = "rpm")]
    Rpm,
    #[serde(rename = "app")]
    App,
    #[serde(rename = "dmg")]
    Dmg,
}

impl PackageFormat {
    /// Tag used in logs, results and configuration.
    pub fn as_str(self) -> &'static str {
        match self {
            PackageFormat::Msi => "msi",
            PackageFormat::Nsis => "nsis",
            PackageFormat::Deb => "deb",
            PackageFormat::TarGz => "tar.gz",
            PackageFormat::AppImage => "appimage",
            PackageFormat::Rpm => "rpm",
            PackageFormat::App => "app",
            PackageFormat::Dmg => "dmg",
        }
    }

    /// Name passed to `cargo tauri build --bundles`, or `None` for formats
    /// this tool assembles itself.
    pub fn bundler_name(self) -> Option<&'static str> {
        match self {
            PackageFormat::TarGz => None,
            other => Some(other.as_str()),
        }
    }

    /// Subdirectory of `release/bundle/` the artifacts land in.
    pub fn bundle_dir_name(self) -> &'static str {
        match self {
            PackageFormat::App => "macos",
            other => other.as_str(),
        }
    }
}

impl fmt::Display for PackageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PackageFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "msi" => Ok(PackageFormat::Msi),
            "nsis" => Ok(PackageFormat::Nsis),
            "deb" => Ok(PackageFormat::Deb),
            "tar.gz" | "targz" | "tgz" => Ok(PackageFormat::TarGz),
            "appimage" => Ok(PackageFormat::AppImage),
            "rpm" => Ok(PackageFormat::Rpm),
            "app" => Ok(PackageFormat::App),
            "dmg" => Ok(PackageFormat::Dmg),
            other => Err(format!("unknown package format '{other}'")),
        }
    }
}

/// Optional tools found on PATH.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ToolAvailability {
    present: BTreeSet<String>,
}

impl ToolAvailability {
    pub fn new<I, S>(present: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            present: present.into_iter().map(Into::into).collect(),
        }
    }

    pub fn has(&self, tool: &str) -> bool {
        self.present.contains(tool)
    }

    pub fn has_any(&self, tools: &[&str]) -> bool {
        tools.iter().any(|tool| self.has(tool))
    }

    pub fn tools(&self) -> impl Iterator<Item = &str> {
        self.present.iter().map(String::as_str)
    }
}

/// Package formats to attempt for `target`, in build order.
///
/// Pure function of the target, the probed tools and the formats disabled by
/// flag or configuration:
///
/// - **Windows**: `msi`, plus `nsis` when `makensis` is present
/// - **Linux**: `deb`, `tar.gz`, `appimage` when `linuxdeploy` is present or the
///   architecture is x86_64, `rpm` when `rpmbuild` or `rpm` is present
/// - **macOS**: `app`, `dmg`
pub fn select_formats(
    target: &BuildTarget,
    tools: &ToolAvailability,
    disabled: &BTreeSet<PackageFormat>,
) -> Vec<PackageFormat> {
    let mut formats = Vec::new();

    match target.platform {
        Platform::Windows => {
            formats.push(PackageFormat::Msi);
            if tools.has("makensis") {
                formats.push(PackageFormat::Nsis);
            }
        }
        Platform::Linux => {
            formats.push(PackageFormat::Deb);
            formats.push(PackageFormat::TarGz);
            if tools.has("linuxdeploy") || target.arch == Arch::X86_64 {
                formats.push(PackageFormat::AppImage);
            }
            if tools.has_any(&["rpmbuild", "rpm"]) {
                formats.push(PackageFormat::Rpm);
            }
        }
        Platform::Macos => {
            formats.push(PackageFormat::App);
            formats.push(PackageFormat::Dmg);
        }
    }

    formats.retain(|format| !disabled.contains(format));
    formats
}
