//! `desktop-build bump`
//!
//! Raises the application version and writes it everywhere it is recorded:
//! `version.json` (with build number, release date and changelog entry),
//! `tauri.conf.json` and the frontend `package.json`. A changelog template
//! for the new version is written next to the config directory.

use crate::cli::OutputManager;
use crate::cli::args::BumpArgs;
use crate::config::{ProjectLayout, VERSION_FILE};
use crate::error::{BuildError, ErrorExt, Result};
use semver::{BuildMetadata, Prerelease, Version};
use serde_json::{Map, Value, json};
use std::path::{Path, PathBuf};

/// Which version component to raise.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum BumpKind {
    /// Breaking changes: resets minor and patch
    Major,
    /// New backwards-compatible features: resets patch
    Minor,
    /// Backwards-compatible fixes
    Patch,
}

/// Next version; pre-release and build metadata are always dropped.
pub fn bump_version(current: &Version, kind: BumpKind) -> Version {
    let (major, minor, patch) = match kind {
        BumpKind::Major => (current.major + 1, 0, 0),
        BumpKind::Minor => (current.major, current.minor + 1, 0),
        BumpKind::Patch => (current.major, current.minor, current.patch + 1),
    };
    Version {
        major,
        minor,
        patch,
        pre: Prerelease::EMPTY,
        build: BuildMetadata::EMPTY,
    }
}

/// Increments a `buildNumber` that is a JSON number or a numeric string,
/// keeping its JSON type.
fn next_build_number(current: &Value) -> Option<Value> {
    match current {
        Value::Number(n) => n.as_u64().map(|n| json!(n + 1)),
        Value::String(s) => s.trim().parse::<u64>().ok().map(|n| json!((n + 1).to_string())),
        _ => None,
    }
}

fn read_object(path: &Path) -> Result<Map<String, Value>> {
    let content = std::fs::read_to_string(path).fs_context("reading", path)?;
    match serde_json::from_str(&content) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(BuildError::Config {
            path: path.to_path_buf(),
            reason: "expected a JSON object".to_string(),
        }),
        Err(e) => Err(BuildError::Config {
            path: path.to_path_buf(),
            reason: format!("failed to parse: {e}"),
        }),
    }
}

fn write_object(path: &Path, object: Map<String, Value>) -> Result<()> {
    let mut text = serde_json::to_string_pretty(&Value::Object(object))?;
    text.push('\n');
    std::fs::write(path, text).fs_context("writing", path)
}

/// Current version recorded in `version.json`.
pub fn current_version(version_file: &Path) -> Result<Version> {
    let config = read_object(version_file)?;
    let current = config.get("current").and_then(Value::as_str).unwrap_or_default();
    Version::parse(current).map_err(|e| BuildError::Config {
        path: version_file.to_path_buf(),
        reason: format!("`current` is not a valid semantic version ({current}): {e}"),
    })
}

/// Rewrites `version.json`: new `current`, incremented `buildNumber`,
/// `releaseDate`, and a changelog entry prepended. Unknown fields survive.
pub fn update_version_file(path: &Path, new_version: &Version, date: &str) -> Result<()> {
    let mut config = read_object(path)?;
    let old = config
        .get("current")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let build_number = config.get("buildNumber").cloned().unwrap_or(json!("0"));
    let next = next_build_number(&build_number).ok_or_else(|| BuildError::Config {
        path: path.to_path_buf(),
        reason: format!("`buildNumber` is not numeric ({build_number}); cannot increment it"),
    })?;

    config.insert("current".to_string(), json!(new_version.to_string()));
    config.insert("buildNumber".to_string(), next);
    config.insert("releaseDate".to_string(), json!(date));

    let entry = json!({
        "version": new_version.to_string(),
        "date": date,
        "changes": [format!("Version bumped from {old} to {new_version}")],
    });
    match config.get_mut("changelog") {
        Some(Value::Array(entries)) => entries.insert(0, entry),
        _ => {
            config.insert("changelog".to_string(), json!([entry]));
        }
    }

    write_object(path, config)
}

/// Sets the top-level `version` of a JSON manifest. Returns false when the
/// file does not exist.
pub fn update_manifest_version(path: &Path, new_version: &Version) -> Result<bool> {
    if !path.is_file() {
        return Ok(false);
    }
    let mut manifest = read_object(path)?;
    manifest.insert("version".to_string(), json!(new_version.to_string()));
    write_object(path, manifest)?;
    Ok(true)
}

/// Markdown skeleton for the release notes of `version`.
pub fn changelog_template(version: &Version, date: &str) -> String {
    format!(
        "# {version} ({date})\n\n\
         ## Added\n-\n\n\
         ## Fixed\n-\n\n\
         ## Changed\n-\n\n\
         ## Removed\n-\n"
    )
}

/// Where the changelog template for `version` is written.
pub fn changelog_path(config_dir: &Path, version: &Version) -> PathBuf {
    config_dir
        .parent()
        .unwrap_or(config_dir)
        .join(format!("CHANGELOG-{version}.md"))
}

pub async fn execute(args: &BumpArgs, output: &OutputManager) -> Result<i32> {
    let project_root = args.common.project_root()?;
    let config_dir = args.common.config_dir(args.config_dir.as_deref())?;
    let version_file = config_dir.join(VERSION_FILE);
    let layout = ProjectLayout::discover(&project_root, &config_dir);

    let current = current_version(&version_file)?;
    let next = bump_version(&current, args.kind);
    let date = chrono::Local::now().format("%Y-%m-%d").to_string();

    output.section("Version bump");
    output.info(&format!("{current} -> {next} ({:?})", args.kind));

    for manifest in [layout.tauri_config(), layout.frontend_dir.join("package.json")] {
        if update_manifest_version(&manifest, &next)? {
            output.success(&format!("Updated {}", manifest.display()));
        } else {
            output.warn(&format!("{} not found; skipped", manifest.display()));
        }
    }

    update_version_file(&version_file, &next, &date)?;
    output.success(&format!("Updated {}", version_file.display()));

    let changelog = changelog_path(&config_dir, &next);
    std::fs::write(&changelog, changelog_template(&next, &date)).fs_context("writing", &changelog)?;
    output.info(&format!("Changelog template: {}", changelog.display()));

    output.section("Next steps");
    output.indent("1. Fill in the changelog template");
    output.indent(&format!("2. git commit -am \"chore: bump version to {next}\""));
    output.indent(&format!("3. git tag v{next}"));
    output.indent("4. desktop-build build");
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn version(text: &str) -> Version {
        Version::parse(text).unwrap()
    }

    #[test]
    fn patch_raises_patch_only() {
        assert_eq!(bump_version(&version("1.2.0"), BumpKind::Patch), version("1.2.1"));
    }

    #[test]
    fn minor_resets_patch() {
        assert_eq!(bump_version(&version("1.2.7"), BumpKind::Minor), version("1.3.0"));
    }

    #[test]
    fn major_resets_minor_and_patch() {
        assert_eq!(bump_version(&version("1.2.7"), BumpKind::Major), version("2.0.0"));
    }

    #[test]
    fn prerelease_suffix_is_dropped() {
        assert_eq!(
            bump_version(&version("0.9.3-beta.2+sha.1"), BumpKind::Patch),
            version("0.9.4")
        );
    }

    #[test]
    fn build_number_keeps_its_json_type() {
        assert_eq!(next_build_number(&json!("42")), Some(json!("43")));
        assert_eq!(next_build_number(&json!(7)), Some(json!(8)));
        assert_eq!(next_build_number(&json!("nightly")), None);
    }

    #[test]
    fn version_file_gets_build_number_date_and_changelog() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(VERSION_FILE);
        std::fs::write(
            &path,
            r#"{"current":"1.2.0","buildNumber":"42","channel":"stable","changelog":[{"version":"1.2.0"}]}"#,
        )
        .unwrap();

        update_version_file(&path, &version("1.3.0"), "2026-10-16").unwrap();

        let written: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["current"], "1.3.0");
        assert_eq!(written["buildNumber"], "43");
        assert_eq!(written["releaseDate"], "2026-10-16");
        assert_eq!(written["channel"], "stable");
        assert_eq!(written["changelog"][0]["version"], "1.3.0");
        assert_eq!(
            written["changelog"][0]["changes"][0],
            "Version bumped from 1.2.0 to 1.3.0"
        );
        assert_eq!(written["changelog"][1]["version"], "1.2.0");
        assert_eq!(current_version(&path).unwrap(), version("1.3.0"));
    }

    #[test]
    fn non_numeric_build_number_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(VERSION_FILE);
        std::fs::write(&path, r#"{"current":"1.2.0","buildNumber":"nightly"}"#).unwrap();

        assert!(matches!(
            update_version_file(&path, &version("1.2.1"), "2026-10-16"),
            Err(BuildError::Config { .. })
        ));
    }

    #[test]
    fn invalid_current_version_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(VERSION_FILE);
        std::fs::write(&path, r#"{"current":"one","buildNumber":"1"}"#).unwrap();
        assert!(matches!(current_version(&path), Err(BuildError::Config { .. })));
    }

    #[test]
    fn manifest_version_is_replaced_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("package.json");
        std::fs::write(&path, r#"{"name":"rtodo","version":"1.2.0","private":true}"#).unwrap();

        assert!(update_manifest_version(&path, &version("2.0.0")).unwrap());

        let text = std::fs::read_to_string(&path).unwrap();
        let written: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(written["version"], "2.0.0");
        assert_eq!(written["private"], true);
        assert!(text.find("\"name\"").unwrap() < text.find("\"version\"").unwrap());
    }

    #[test]
    fn missing_manifest_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!update_manifest_version(&dir.path().join("tauri.conf.json"), &version("1.0.0")).unwrap());
    }

    #[test]
    fn changelog_lands_beside_the_config_dir() {
        assert_eq!(
            changelog_path(Path::new("/p/build/configs"), &version("1.3.0")),
            PathBuf::from("/p/build/CHANGELOG-1.3.0.md")
        );
        assert!(changelog_template(&version("1.3.0"), "2026-10-16").starts_with("# 1.3.0 (2026-10-16)"));
    }
}
