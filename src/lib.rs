//! Cross-platform build orchestration for Tauri desktop applications.
//!
//! This library drives the existing toolchain (npm, rustup, the Tauri
//! bundler, lipo, hdiutil) to produce:
//! - Windows installers (.msi, NSIS setup .exe)
//! - Linux packages (.deb, .rpm, AppImage, tar.gz)
//! - macOS bundles (.app, .dmg), including universal binaries
//!
//! It can be used both as a CLI tool (`desktop-build`) and as a library.

pub mod bundler;
pub mod cli;
pub mod config;
pub mod error;
pub mod executor;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use error::{BuildError, CliError, Result};
