//! Build orchestration and coordination.
//!
//! # Module Organization
//!
//! - [`orchestrator`] - [`BuildCoordinator`], platform selection and result aggregation
//! - [`tool_detection`] - required and optional external tool checks

pub mod orchestrator;
pub mod tool_detection;

pub use orchestrator::{
    BuildCoordinator, BuildReport, BuildRequest, PlatformFailure, PlatformSelection,
};
pub use tool_detection::{REQUIRED_TOOLS, RequiredTool, ToolStatus};
