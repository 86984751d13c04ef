//! Subcommand implementations.

pub mod build;
pub mod bump;
pub mod clean;
pub mod validate;
