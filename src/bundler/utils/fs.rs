//! File system utilities for bundling.
//!
//! Idempotent directory helpers plus a recursive copy that preserves
//! symlinks and can skip subtrees.

use crate::error::{BuildError, ErrorExt, Result};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Creates all of the directories of the specified path, erasing it first if specified.
pub async fn create_dir_all(path: &Path, erase: bool) -> Result<()> {
    if erase {
        remove_dir_all(path).await?;
    }
    fs::create_dir_all(path)
        .await
        .fs_context("creating directory", path)
}

/// Removes the directory and its contents. Returns whether anything was removed.
pub async fn remove_dir_all(path: &Path) -> Result<bool> {
    match fs::remove_dir_all(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e).fs_context("removing directory", path),
    }
}

/// Makes a symbolic link to a directory.
#[cfg(unix)]
fn symlink_dir(src: &Path, dst: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(src, dst)
}

/// Makes a symbolic link to a directory.
#[cfg(windows)]
fn symlink_dir(src: &Path, dst: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_dir(src, dst)
}

/// Makes a symbolic link to a file.
#[cfg(unix)]
fn symlink_file(src: &Path, dst: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(src, dst)
}

/// Makes a symbolic link to a file.
#[cfg(windows)]
fn symlink_file(src: &Path, dst: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(src, dst)
}

/// Copies a regular file, creating the destination's parent directories.
///
/// Fails if the source path is a directory or doesn't exist.
pub async fn copy_file(from: &Path, to: &Path) -> Result<()> {
    if !from.is_file() {
        return Err(anyhow::anyhow!("{} is not a file", from.display()).into());
    }
    if let Some(dest_dir) = to.parent() {
        fs::create_dir_all(dest_dir)
            .await
            .fs_context("creating directory", dest_dir)?;
    }
    fs::copy(from, to).await.fs_context("copying file", from)?;
    Ok(())
}

/// Recursively copies `from` into `to`, skipping every entry whose path
/// relative to `from` starts with one of `excluded`.
///
/// Preserves symlinks on platforms that support them. Existing files in the
/// destination are overwritten.
pub async fn copy_dir_filtered(from: &Path, to: &Path, excluded: &[PathBuf]) -> Result<()> {
    if !from.is_dir() {
        return Err(anyhow::anyhow!("{} is not a directory", from.display()).into());
    }

    let from = from.to_path_buf();
    let to = to.to_path_buf();
    let excluded = excluded.to_vec();

    tokio::task::spawn_blocking(move || copy_tree(&from, &to, &excluded))
        .await
        .map_err(|e| BuildError::Other(anyhow::anyhow!("Directory copy task panicked: {e}")))?
}

fn copy_tree(from: &Path, to: &Path, excluded: &[PathBuf]) -> Result<()> {
    std::fs::create_dir_all(to).fs_context("creating directory", to)?;

    let walker = walkdir::WalkDir::new(from)
        .min_depth(1)
        .into_iter()
        .filter_entry(|entry| {
            entry
                .path()
                .strip_prefix(from)
                .map(|rel| !excluded.iter().any(|skip| rel.starts_with(skip)))
                .unwrap_or(false)
        });

    for entry in walker {
        let entry = entry.map_err(|e| BuildError::Other(e.into()))?;
        let rel_path = entry
            .path()
            .strip_prefix(from)
            .map_err(|e| BuildError::Other(e.into()))?;
        let dest_path = to.join(rel_path);

        if entry.file_type().is_symlink() {
            let target = std::fs::read_link(entry.path()).fs_context("reading symlink", entry.path())?;
            let _ = std::fs::remove_file(&dest_path);
            let linked = if entry.path().is_dir() {
                symlink_dir(&target, &dest_path)
            } else {
                symlink_file(&target, &dest_path)
            };
            linked.fs_context("creating symlink", &dest_path)?;
        } else if entry.file_type().is_dir() {
            std::fs::create_dir_all(&dest_path).fs_context("creating directory", &dest_path)?;
        } else {
            std::fs::copy(entry.path(), &dest_path).fs_context("copying file", entry.path())?;
        }
    }

    Ok(())
}

/// Total size in bytes of a file or every file below a directory.
pub fn disk_usage(path: &Path) -> u64 {
    if path.is_file() {
        return path.metadata().map(|m| m.len()).unwrap_or(0);
    }
    walkdir::WalkDir::new(path)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.metadata().ok())
        .map(|m| m.len())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn filtered_copy_skips_excluded_subtree() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("x86.app");
        std::fs::create_dir_all(src.join("Contents/MacOS")).unwrap();
        std::fs::create_dir_all(src.join("Contents/Resources")).unwrap();
        std::fs::write(src.join("Contents/MacOS/rtodo"), "x86").unwrap();
        std::fs::write(src.join("Contents/Resources/icon.icns"), "icon").unwrap();
        std::fs::write(src.join("Contents/Info.plist"), "plist").unwrap();

        let dst = dir.path().join("universal.app");
        copy_dir_filtered(&src, &dst, &[PathBuf::from("Contents/MacOS")])
            .await
            .unwrap();

        assert!(dst.join("Contents/Info.plist").is_file());
        assert!(dst.join("Contents/Resources/icon.icns").is_file());
        assert!(!dst.join("Contents/MacOS").exists());
    }

    #[tokio::test]
    async fn remove_dir_all_reports_whether_anything_was_removed() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("target");
        std::fs::create_dir_all(target.join("release")).unwrap();

        assert!(remove_dir_all(&target).await.unwrap());
        assert!(!remove_dir_all(&target).await.unwrap());
    }

    #[tokio::test]
    async fn create_dir_all_with_erase_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let staging = dir.path().join("staging");
        std::fs::create_dir_all(&staging).unwrap();
        std::fs::write(staging.join("stale"), "x").unwrap();

        create_dir_all(&staging, true).await.unwrap();
        assert_eq!(std::fs::read_dir(&staging).unwrap().count(), 0);
    }

    #[test]
    fn disk_usage_sums_directory_tree() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("a/b")).unwrap();
        std::fs::write(dir.path().join("a/one"), [0u8; 10]).unwrap();
        std::fs::write(dir.path().join("a/b/two"), [0u8; 5]).unwrap();
        assert_eq!(disk_usage(dir.path()), 15);
        assert_eq!(disk_usage(&dir.path().join("a/one")), 10);
    }
}
