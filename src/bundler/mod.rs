//! Desktop bundle building.
//!
//! Resolves logical targets, probes for optional packaging tools and drives
//! the external Tauri bundler per platform.
//!
//! # Module Organization
//!
//! - [`target`] - platforms, architectures, toolchain triples, format selection
//! - [`builder`] - the [`BuildCoordinator`] and tool detection
//! - [`platform`] - per-platform drivers
//! - [`utils`] - filesystem, download and checksum helpers

pub mod builder;
pub mod platform;
pub mod target;
pub mod utils;

pub use builder::{BuildCoordinator, BuildReport, BuildRequest, PlatformSelection};
pub use platform::{Artifact, BuildOptions, BuildResult};
pub use target::{
    Arch, BuildTarget, PackageFormat, Platform, ToolAvailability, host_toolchain_triple, resolve,
    select_formats, supported_architectures,
};
