//! Bounded fan-out over independent commands.

use super::{CommandRunner, ExecutionRequest, ExecutionResult, Executor};
use crate::error::BuildError;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

impl Executor {
    /// Runs independent requests concurrently, at most `max_concurrency` at a time.
    ///
    /// Results arrive in completion order, not request order; match them up
    /// through [`ExecutionResult::command`]. A failing command (non-zero
    /// exit, timeout, spawn failure) yields a failed result and never affects
    /// the others, so this never returns an error.
    ///
    /// Only use this for commands that do not touch shared build outputs.
    pub async fn run_many_parallel(
        &self,
        requests: Vec<ExecutionRequest>,
        max_concurrency: usize,
    ) -> Vec<ExecutionResult> {
        let permits = Arc::new(Semaphore::new(max_concurrency.max(1)));
        let mut tasks = JoinSet::new();

        for request in requests {
            let executor = self.clone();
            let permits = Arc::clone(&permits);
            tasks.spawn(async move {
                let command = request.command_line();
                let _permit = match permits.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return ExecutionResult::failed(command, "worker pool closed", -1),
                };
                match executor.run(&request).await {
                    Ok(result) => result,
                    Err(e) => collected_failure(command, e),
                }
            });
        }

        let mut results = Vec::with_capacity(tasks.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(result) => results.push(result),
                Err(e) => {
                    log::error!("Parallel command task failed: {}", e);
                    results.push(ExecutionResult::failed("<unknown>", e.to_string(), -1));
                }
            }
        }
        results
    }
}

fn collected_failure(command: String, error: BuildError) -> ExecutionResult {
    log::debug!("Parallel command `{}` failed: {}", command, error);
    match error {
        BuildError::Execution {
            stderr, exit_code, ..
        } => ExecutionResult::failed(command, stderr, exit_code),
        other => ExecutionResult::failed(command, other.to_string(), -1),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn sh(script: &str) -> ExecutionRequest {
        ExecutionRequest::new("sh").args(["-c", script])
    }

    #[tokio::test]
    async fn all_succeeding_commands_return_successful_results() {
        let executor = Executor::new();
        let requests = (0..8).map(|i| sh(&format!("echo {i}"))).collect();
        let results = executor.run_many_parallel(requests, 3).await;
        assert_eq!(results.len(), 8);
        assert!(results.iter().all(ExecutionResult::success));

        let mut seen: Vec<String> = results.iter().map(|r| r.stdout.trim().to_string()).collect();
        seen.sort();
        let mut expected: Vec<String> = (0..8).map(|i| i.to_string()).collect();
        expected.sort();
        assert_eq!(seen, expected);
    }

    #[tokio::test]
    async fn one_failure_does_not_affect_the_others() {
        let executor = Executor::new();
        let requests = vec![
            sh("exit 0"),
            sh("echo nope >&2; exit 9"),
            sh("sleep 5").timeout(Duration::from_millis(100)),
            ExecutionRequest::new("definitely-not-a-real-tool-4242"),
            sh("exit 0"),
        ];
        let results = executor.run_many_parallel(requests, 2).await;
        assert_eq!(results.len(), 5);
        assert_eq!(results.iter().filter(|r| r.success()).count(), 2);

        let failed = results
            .iter()
            .find(|r| r.command.contains("exit 9"))
            .unwrap();
        assert_eq!(failed.exit_code, 9);
        assert_eq!(failed.stderr.trim(), "nope");
    }

    #[tokio::test]
    async fn pool_size_bounds_concurrency() {
        let executor = Executor::new();
        let requests = (0..4).map(|_| sh("sleep 0.3")).collect();
        let started = Instant::now();
        let results = executor.run_many_parallel(requests, 2).await;
        assert_eq!(results.len(), 4);
        // Two waves of two.
        assert!(started.elapsed() >= Duration::from_millis(550));
    }

    #[tokio::test]
    async fn zero_concurrency_is_treated_as_one() {
        let executor = Executor::new();
        let results = executor.run_many_parallel(vec![sh("exit 0")], 0).await;
        assert_eq!(results.len(), 1);
        assert!(results[0].success());
    }
}
