//! `desktop-build clean`

use crate::bundler::utils::fs;
use crate::cli::OutputManager;
use crate::cli::args::CleanArgs;
use crate::config::{DEFAULT_CONFIG_DIR, ProjectLayout};
use crate::error::Result;
use std::path::PathBuf;

/// Directories `clean` removes.
pub fn clean_targets(layout: &ProjectLayout, all: bool) -> Vec<PathBuf> {
    let mut dirs = vec![layout.target_dir(), layout.frontend_dir.join("dist")];
    if all {
        dirs.push(layout.frontend_dir.join("node_modules"));
    }
    dirs
}

pub async fn execute(args: &CleanArgs, output: &OutputManager) -> Result<i32> {
    let project_root = args.common.project_root()?;
    let layout = ProjectLayout::discover(&project_root, &project_root.join(DEFAULT_CONFIG_DIR));

    output.section("Cleaning build output");
    let mut removed = 0;
    for dir in clean_targets(&layout, args.all) {
        if fs::remove_dir_all(&dir).await? {
            output.success(&format!("Removed {}", dir.display()));
            removed += 1;
        } else {
            output.debug(&format!("{} not present", dir.display()));
        }
    }

    output.info(&format!("Removed {removed} director{}", if removed == 1 { "y" } else { "ies" }));
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn node_modules_only_with_all() {
        let layout = ProjectLayout::conventional(Path::new("/p"));
        assert_eq!(
            clean_targets(&layout, false),
            vec![PathBuf::from("/p/src-tauri/target"), PathBuf::from("/p/frontend/dist")]
        );
        assert_eq!(
            clean_targets(&layout, true).last(),
            Some(&PathBuf::from("/p/frontend/node_modules"))
        );
    }
}
