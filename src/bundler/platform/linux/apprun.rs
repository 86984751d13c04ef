//! AppRun prefetch for appimage packaging.
//!
//! The bundler downloads AppRun while packaging an AppImage and fails
//! outright when the fetch does. Seeding its cache first, through the proxy
//! settings of this process, makes that step offline.

use crate::bundler::Arch;
use crate::bundler::utils::http;
use crate::error::Result;
use std::path::PathBuf;

const RELEASE_BASE: &str = "https://github.com/tauri-apps/binary-releases/releases/download/apprun-old";

/// `AppRun-x86_64` or `AppRun-aarch64`.
pub fn file_name(arch: Arch) -> String {
    format!("AppRun-{}", arch.machine_name())
}

pub fn download_url(arch: Arch) -> String {
    format!("{RELEASE_BASE}/{}", file_name(arch))
}

/// `~/.cache/tauri/apprun`
pub fn cache_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".cache").join("tauri").join("apprun"))
}

/// Ensures AppRun for `arch` is cached. Returns the cached path.
pub async fn prefetch(arch: Arch) -> Result<PathBuf> {
    let dir = cache_dir()
        .ok_or_else(|| anyhow::anyhow!("cannot determine the home directory for the AppRun cache"))?;
    let dest = dir.join(file_name(arch));

    if dest.is_file() {
        log::debug!("AppRun already cached at {}", dest.display());
        return Ok(dest);
    }

    http::download_executable(&download_url(arch), &dest).await?;
    log::info!("Cached AppRun at {}", dest.display());
    Ok(dest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_uses_machine_names() {
        assert_eq!(
            download_url(Arch::Arm64),
            "https://github.com/tauri-apps/binary-releases/releases/download/apprun-old/AppRun-aarch64"
        );
        assert_eq!(file_name(Arch::X86_64), "AppRun-x86_64");
    }
}
