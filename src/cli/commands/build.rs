//! `desktop-build build`

use crate::bundler::{BuildCoordinator, BuildOptions, BuildRequest, PlatformSelection};
use crate::cli::OutputManager;
use crate::cli::args::BuildArgs;
use crate::error::Result;
use crate::executor::Executor;
use std::time::Duration;

/// Platform selection implied by the flags.
pub fn selection(args: &BuildArgs) -> PlatformSelection {
    if args.all_platforms {
        PlatformSelection::AllCurrent
    } else if let Some(platform) = args.platform {
        PlatformSelection::Explicit(platform)
    } else {
        PlatformSelection::Auto
    }
}

pub async fn execute(args: &BuildArgs, output: &OutputManager) -> Result<i32> {
    let project_root = args.common.project_root()?;
    let request = BuildRequest {
        selection: selection(args),
        arch: args.arch,
        ignore_errors: args.ignore_errors,
        config_dir: args.common.config_dir(args.config_dir.as_deref())?,
        options: BuildOptions {
            command_timeout: Duration::from_secs(args.timeout),
            skip_frontend: args.skip_frontend,
            no_appimage: args.no_appimage,
            prefetch_apprun: true,
        },
    };
    log::debug!("Build request: {:?}", request);

    let executor = Executor::new();
    let report = BuildCoordinator::new(&executor, output, project_root)
        .run(&request)
        .await?;

    if report.is_success() {
        output.success("Build finished");
    } else {
        output.error(&format!(
            "{} platform(s) failed",
            report.failures.len()
        ));
    }
    Ok(report.exit_code())
}
