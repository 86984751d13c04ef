//! Artifact checksum calculation.
//!
//! SHA-256 over single files and directory trees (macOS `.app` bundles are
//! directories, not files).

use crate::error::{BuildError, ErrorExt, Result};
use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::io::AsyncReadExt;

const CHUNK_SIZE: usize = 8192;

/// Hex-encoded SHA-256 of a file or directory tree.
///
/// Directory hashes cover every regular file's relative path and content in
/// sorted path order, so the result is deterministic.
pub async fn calculate_sha256(path: &Path) -> Result<String> {
    let metadata = tokio::fs::metadata(path)
        .await
        .fs_context("reading metadata", path)?;

    if metadata.is_file() {
        let mut hasher = Sha256::new();
        hash_file_into(&mut hasher, path).await?;
        Ok(format!("{:x}", hasher.finalize()))
    } else if metadata.is_dir() {
        calculate_directory_sha256(path).await
    } else {
        Err(anyhow::anyhow!("Path is neither file nor directory: {}", path.display()).into())
    }
}

async fn hash_file_into(hasher: &mut Sha256, path: &Path) -> Result<()> {
    let mut file = tokio::fs::File::open(path)
        .await
        .fs_context("opening file for hashing", path)?;
    let mut buffer = vec![0u8; CHUNK_SIZE];

    loop {
        let n = file
            .read(&mut buffer)
            .await
            .fs_context("reading file for hash calculation", path)?;
        if n == 0 {
            return Ok(());
        }
        hasher.update(&buffer[..n]);
    }
}

async fn calculate_directory_sha256(dir_path: &Path) -> Result<String> {
    let mut entries: Vec<_> = walkdir::WalkDir::new(dir_path)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect();
    entries.sort();

    let mut hasher = Sha256::new();
    for entry in entries {
        let relative = entry.strip_prefix(dir_path).map_err(|e| {
            BuildError::Other(anyhow::anyhow!("{} escapes {}: {}", entry.display(), dir_path.display(), e))
        })?;
        hasher.update(relative.to_string_lossy().as_bytes());
        hash_file_into(&mut hasher, &entry).await?;
    }

    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn file_hash_matches_known_digest() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("hello.txt");
        std::fs::write(&file, "hello").unwrap();

        assert_eq!(
            calculate_sha256(&file).await.unwrap(),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[tokio::test]
    async fn directory_hash_depends_on_names_and_contents() {
        let dir = tempfile::tempdir().unwrap();
        let app = dir.path().join("RTodo.app");
        std::fs::create_dir_all(app.join("Contents/MacOS")).unwrap();
        std::fs::write(app.join("Contents/MacOS/rtodo"), "bin").unwrap();
        std::fs::write(app.join("Contents/Info.plist"), "plist").unwrap();

        let first = calculate_sha256(&app).await.unwrap();
        assert_eq!(first, calculate_sha256(&app).await.unwrap());

        std::fs::write(app.join("Contents/Info.plist"), "changed").unwrap();
        assert_ne!(first, calculate_sha256(&app).await.unwrap());
    }

    #[tokio::test]
    async fn missing_path_is_filesystem_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            calculate_sha256(&dir.path().join("nope")).await,
            Err(BuildError::Filesystem { .. })
        ));
    }
}
