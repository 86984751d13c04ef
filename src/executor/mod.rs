//! External process execution.
//!
//! Everything the orchestrator does to the outside world goes through a
//! [`CommandRunner`]: the real [`Executor`] spawns child processes with
//! timeouts and an explicit environment overlay, while tests substitute a
//! recording runner.
//!
//! # Module Organization
//!
//! - [`request`] - [`ExecutionRequest`] builder and [`CaptureMode`]
//! - [`result`] - [`ExecutionResult`] and the failure policy
//! - [`run`] - [`Executor`], the process-spawning runner
//! - [`parallel`] - bounded fan-out over independent requests

mod parallel;
mod request;
mod result;
mod run;

pub use request::{CaptureMode, ExecutionRequest};
pub use result::{ExecutionResult, SPAWN_FAILURE_EXIT_CODE};
pub use run::Executor;

use crate::error::Result;
use std::future::Future;

/// Runs external commands and answers PATH queries.
///
/// Build drivers are generic over this trait so the whole pipeline can be
/// exercised without spawning real toolchains.
pub trait CommandRunner: Send + Sync {
    /// Runs one request to completion.
    ///
    /// Fails with [`BuildError::Timeout`](crate::BuildError::Timeout) when the
    /// limit is exceeded and with
    /// [`BuildError::Execution`](crate::BuildError::Execution) on non-zero exit
    /// unless the request is error tolerant.
    fn run(
        &self,
        request: &ExecutionRequest,
    ) -> impl Future<Output = Result<ExecutionResult>> + Send;

    /// Whether `tool` resolves on the runner's PATH. Never fails.
    fn exists_on_path(&self, tool: &str) -> bool;

    /// Runs requests in order, stopping at the first failure.
    ///
    /// Error-tolerant requests never stop the sequence; their failed results
    /// are included in the output.
    fn run_many_sequential(
        &self,
        requests: &[ExecutionRequest],
    ) -> impl Future<Output = Result<Vec<ExecutionResult>>> + Send {
        async move {
            let mut outputs = Vec::with_capacity(requests.len());
            for request in requests {
                outputs.push(self.run(request).await?);
            }
            Ok(outputs)
        }
    }
}
