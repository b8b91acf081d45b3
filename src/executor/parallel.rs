//! Parallel scenario execution
//!
//! Runs many operations at once with bounded concurrency. Each scenario
//! stays sequential internally and owns its own client.

use futures::future::{join_all, BoxFuture};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, error, info};

use crate::config::HarnessConfig;
use crate::error::HarnessError;
use crate::models::{AbortedScenario, OperationKey, RunSummary, ScenarioReport};

/// Boxed scenario, typically `runner.run_unary(..).boxed()`
pub type ScenarioFuture<'a> = BoxFuture<'a, Result<ScenarioReport, HarnessError>>;

/// Parallel scenario executor
pub struct ParallelExecutor {
    max_concurrent: usize,
}

impl ParallelExecutor {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            max_concurrent: max_concurrent.max(1),
        }
    }

    pub fn from_config(config: &HarnessConfig) -> Self {
        Self::new(config.max_concurrent)
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Run every scenario; reports come back in submission order
    ///
    /// A scenario that fails before running its requests is listed as
    /// aborted rather than failing the whole run.
    pub async fn run_all(&self, scenarios: Vec<(OperationKey, ScenarioFuture<'_>)>) -> RunSummary {
        info!(
            "Running {} scenario(s) (max {} concurrent)",
            scenarios.len(),
            self.max_concurrent
        );

        let start = Instant::now();
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));

        let runs = scenarios.into_iter().map(|(key, scenario)| {
            let semaphore = semaphore.clone();
            async move {
                // the semaphore is never closed
                let _permit = semaphore.acquire().await.ok();
                debug!("Starting {}", key);
                (key, scenario.await)
            }
        });

        let mut reports = Vec::new();
        let mut aborted = Vec::new();
        for (key, outcome) in join_all(runs).await {
            match outcome {
                Ok(report) => reports.push(report),
                Err(e) => {
                    error!("{} aborted: {}", key, e);
                    aborted.push(AbortedScenario {
                        key,
                        error: e.to_string(),
                    });
                }
            }
        }

        let summary = RunSummary::new(reports, aborted);
        info!(
            "Run completed in {}ms - Pass: {}/{} ({:.1}%), {} aborted",
            start.elapsed().as_millis(),
            summary.passed,
            summary.requests,
            summary.pass_rate(),
            summary.aborted.len()
        );
        summary
    }
}

impl Default for ParallelExecutor {
    fn default() -> Self {
        Self::new(4)
    }
}
