//! Build configuration loaded from `build/configs/`.
//!
//! Two JSON documents drive a run:
//!
//! - `targets.json` - product identity, project layout, per-platform defaults
//! - `version.json` - `{ "current": "<semver>", "buildNumber": "<string>" }`
//!
//! Any missing, unreadable or malformed file is a [`BuildError::Config`].

use crate::bundler::{Arch, PackageFormat, Platform};
use crate::error::{BuildError, Result};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

pub const TARGETS_FILE: &str = "targets.json";
pub const VERSION_FILE: &str = "version.json";

/// Default config directory relative to the project root
pub const DEFAULT_CONFIG_DIR: &str = "build/configs";

/// Contents of `version.json`.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VersionInfo {
    /// Application version, must be valid semver
    pub current: String,
    /// Free-form build number; numbers are accepted and stringified
    #[serde(deserialize_with = "string_or_number")]
    pub build_number: String,
}

/// Per-platform defaults from `targets.json`.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PlatformDefinition {
    /// Architecture used when `--arch` is not given
    pub default_arch: Option<Arch>,
    /// Formats never attempted on this platform
    #[serde(default)]
    pub disabled_formats: BTreeSet<PackageFormat>,
}

/// Contents of `targets.json`.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TargetsConfig {
    /// Product name, as used for `.app` bundles and archive names
    pub product_name: String,
    /// Name of the compiled executable
    pub binary_name: String,
    #[serde(default = "default_frontend_dir")]
    pub frontend_dir: PathBuf,
    #[serde(default = "default_tauri_dir")]
    pub tauri_dir: PathBuf,
    #[serde(default)]
    pub platforms: BTreeMap<Platform, PlatformDefinition>,
}

impl TargetsConfig {
    /// Architecture to build when none was requested.
    pub fn default_arch(&self, platform: Platform) -> Arch {
        self.platforms
            .get(&platform)
            .and_then(|p| p.default_arch)
            .unwrap_or(Arch::X86_64)
    }

    /// Formats disabled for `platform` by configuration.
    pub fn disabled_formats(&self, platform: Platform) -> BTreeSet<PackageFormat> {
        self.platforms
            .get(&platform)
            .map(|p| p.disabled_formats.clone())
            .unwrap_or_default()
    }
}

fn default_frontend_dir() -> PathBuf {
    PathBuf::from("frontend")
}

fn default_tauri_dir() -> PathBuf {
    PathBuf::from("src-tauri")
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(text) => text,
        Raw::Number(number) => number.to_string(),
    })
}

/// Both configuration documents for one run.
#[derive(Clone, Debug)]
pub struct BuildConfig {
    pub targets: TargetsConfig,
    pub version: VersionInfo,
}

impl BuildConfig {
    /// Loads `targets.json` and `version.json` from `config_dir`.
    pub fn load(config_dir: &Path) -> Result<Self> {
        let targets: TargetsConfig = load_json(&config_dir.join(TARGETS_FILE))?;
        let version_path = config_dir.join(VERSION_FILE);
        let version: VersionInfo = load_json(&version_path)?;

        semver::Version::parse(&version.current).map_err(|e| BuildError::Config {
            path: version_path.clone(),
            reason: format!("`current` is not a valid semantic version ({}): {}", version.current, e),
        })?;

        log::debug!(
            "Loaded configuration for {} {} (build {})",
            targets.product_name,
            version.current,
            version.build_number
        );

        Ok(Self { targets, version })
    }
}

/// Reads and deserializes one JSON config file.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path).map_err(|e| BuildError::Config {
        path: path.to_path_buf(),
        reason: if e.kind() == std::io::ErrorKind::NotFound {
            "file does not exist".to_string()
        } else {
            format!("failed to read: {e}")
        },
    })?;

    serde_json::from_str(&content).map_err(|e| BuildError::Config {
        path: path.to_path_buf(),
        reason: format!("failed to parse: {e}"),
    })
}

/// Absolute locations of the project parts a build touches.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProjectLayout {
    pub root: PathBuf,
    pub frontend_dir: PathBuf,
    pub tauri_dir: PathBuf,
}

impl ProjectLayout {
    /// Joins the configured directories onto `root`.
    pub fn new(root: &Path, targets: &TargetsConfig) -> Self {
        Self::with_dirs(root, &targets.frontend_dir, &targets.tauri_dir)
    }

    /// Layout from `<config_dir>/targets.json` when it loads, else the
    /// conventional one. For commands that must work on a half-configured
    /// project.
    pub fn discover(root: &Path, config_dir: &Path) -> Self {
        match load_json::<TargetsConfig>(&config_dir.join(TARGETS_FILE)) {
            Ok(targets) => Self::new(root, &targets),
            Err(e) => {
                log::debug!("Using conventional project layout ({})", e);
                Self::conventional(root)
            }
        }
    }

    /// Layout using the conventional `frontend/` and `src-tauri/` directories.
    pub fn conventional(root: &Path) -> Self {
        Self::with_dirs(root, &default_frontend_dir(), &default_tauri_dir())
    }

    fn with_dirs(root: &Path, frontend: &Path, tauri: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            frontend_dir: root.join(frontend),
            tauri_dir: root.join(tauri),
        }
    }

    /// Cargo target directory of the Tauri crate.
    pub fn target_dir(&self) -> PathBuf {
        self.tauri_dir.join("target")
    }

    /// `<tauri>/target/<triple>/release/bundle`
    pub fn bundle_root(&self, toolchain_triple: &str) -> PathBuf {
        self.target_dir()
            .join(toolchain_triple)
            .join("release")
            .join("bundle")
    }

    /// Tauri configuration file.
    pub fn tauri_config(&self) -> PathBuf {
        self.tauri_dir.join("tauri.conf.json")
    }
}
