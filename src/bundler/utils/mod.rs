//! Shared helpers for platform drivers.

pub mod checksum;
pub mod fs;
pub mod http;
