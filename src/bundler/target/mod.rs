//! Target resolution.
//!
//! Maps a logical (platform, architecture) pair to the toolchain triple the
//! compiler and bundler understand, and decides which package formats to
//! attempt for it.

mod arch;
mod format;
mod platform;

pub use arch::Arch;
pub use format::{PackageFormat, ToolAvailability, select_formats};
pub use platform::Platform;

use crate::error::{BuildError, Result};

/// Every supported (platform, architecture) pair and its toolchain triple.
const TOOLCHAIN_TRIPLES: &[(Platform, Arch, &str)] = &[
    (Platform::Windows, Arch::X86_64, "x86_64-pc-windows-msvc"),
    (Platform::Windows, Arch::Arm64, "aarch64-pc-windows-msvc"),
    (Platform::Linux, Arch::X86_64, "x86_64-unknown-linux-gnu"),
    (Platform::Linux, Arch::Arm64, "aarch64-unknown-linux-gnu"),
    (Platform::Macos, Arch::X86_64, "x86_64-apple-darwin"),
    (Platform::Macos, Arch::Arm64, "aarch64-apple-darwin"),
    (Platform::Macos, Arch::Universal, "universal-apple-darwin"),
];

/// A resolved build target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuildTarget {
    pub platform: Platform,
    pub arch: Arch,
    pub toolchain_triple: &'static str,
}

impl BuildTarget {
    /// Single-architecture targets that make up this target.
    ///
    /// A macOS universal target is built as x86_64 then arm64; every other
    /// target is its own only component.
    pub fn components(&self) -> Vec<BuildTarget> {
        if self.arch == Arch::Universal {
            [Arch::X86_64, Arch::Arm64]
                .into_iter()
                .filter_map(|arch| resolve(self.platform, arch).ok())
                .collect()
        } else {
            vec![self.clone()]
        }
    }

    pub fn is_universal(&self) -> bool {
        self.arch == Arch::Universal
    }
}

/// Resolves a (platform, architecture) pair.
///
/// # Errors
///
/// [`BuildError::UnsupportedTarget`] when the pair has no known toolchain
/// triple (e.g. Windows universal).
pub fn resolve(platform: Platform, arch: Arch) -> Result<BuildTarget> {
    TOOLCHAIN_TRIPLES
        .iter()
        .find(|(p, a, _)| *p == platform && *a == arch)
        .map(|(platform, arch, triple)| BuildTarget {
            platform: *platform,
            arch: *arch,
            toolchain_triple: *triple,
        })
        .ok_or_else(|| BuildError::UnsupportedTarget {
            platform: platform.to_string(),
            arch: arch.to_string(),
            supported: supported_architectures(platform)
                .iter()
                .map(ToString::to_string)
                .collect(),
        })
}

/// Toolchain triple of the running host, if the host is a supported target.
///
/// Cargo writes untargeted builds (`target/release/`) for this triple only.
pub fn host_toolchain_triple() -> Option<&'static str> {
    let target = resolve(Platform::host()?, Arch::host()?).ok()?;
    Some(target.toolchain_triple)
}

/// Architectures `platform` can be built for.
pub fn supported_architectures(platform: Platform) -> Vec<Arch> {
    TOOLCHAIN_TRIPLES
        .iter()
        .filter(|(p, _, _)| *p == platform)
        .map(|(_, arch, _)| *arch)
        .collect()
}
