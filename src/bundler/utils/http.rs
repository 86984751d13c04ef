//! HTTP utilities for downloading bundler helper files.
//!
//! reqwest honours `HTTP_PROXY`/`HTTPS_PROXY` (and lowercase variants) on its
//! own; [`proxy_settings`] only reports what will be used.

use crate::error::{BuildError, ErrorExt, Result};
use std::path::Path;
use std::time::Duration;

/// Per-download time limit
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// Proxy variables in effect, as `(name, value)` pairs.
pub fn proxy_settings() -> Vec<(&'static str, String)> {
    ["HTTP_PROXY", "http_proxy", "HTTPS_PROXY", "https_proxy"]
        .into_iter()
        .filter_map(|name| {
            std::env::var(name)
                .ok()
                .filter(|value| !value.is_empty())
                .map(|value| (name, value))
        })
        .collect()
}

/// Downloads a file from a URL.
pub async fn download(url: &str) -> Result<Vec<u8>> {
    log::info!("Downloading {}", url);
    for (name, value) in proxy_settings() {
        log::info!("Using proxy {}={}", name, value);
    }

    let client = reqwest::Client::builder()
        .timeout(DOWNLOAD_TIMEOUT)
        .build()
        .map_err(|e| BuildError::Other(anyhow::anyhow!("HTTP client setup failed: {e}")))?;

    let response = client
        .get(url)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| BuildError::Other(anyhow::anyhow!("Download failed: {e}")))?;

    let bytes = response
        .bytes()
        .await
        .map_err(|e| BuildError::Other(anyhow::anyhow!("Failed to read response: {e}")))?;

    Ok(bytes.to_vec())
}

/// Downloads `url` to `dest` and marks it executable.
///
/// Writes through a sibling temp file so an interrupted download never
/// leaves a truncated file at `dest`.
pub async fn download_executable(url: &str, dest: &Path) -> Result<()> {
    let bytes = download(url).await?;

    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .fs_context("creating cache directory", parent)?;
    }
    let partial = dest.with_extension("part");
    tokio::fs::write(&partial, &bytes)
        .await
        .fs_context("writing download", &partial)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(&partial, std::fs::Permissions::from_mode(0o755))
            .await
            .fs_context("setting permissions", &partial)?;
    }

    tokio::fs::rename(&partial, dest)
        .await
        .fs_context("moving download into place", dest)
}
