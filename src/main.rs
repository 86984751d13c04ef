//! desktop-build - cross-platform build orchestrator for Tauri desktop apps.
//!
//! Produces installable packages for Windows, Linux and macOS by driving
//! npm, rustup and the Tauri bundler, with fallbacks and artifact checks.

use desktop_bundle_orchestrator::cli::{self, Args};
use std::process;

#[tokio::main]
async fn main() {
    let args = Args::parse_args();

    // RUST_LOG still wins over the flag
    let default_level = if args.verbose() { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();

    let exit_code = cli::run(args).await;
    process::exit(exit_code);
}
