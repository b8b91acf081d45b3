//! Scenario execution
//!
//! Provides the harness context, the per-operation scenario runner and
//! parallel execution across operations.

mod harness;
mod parallel;
mod runner;

pub use harness::{Harness, RunSettings};
pub use parallel::{ParallelExecutor, ScenarioFuture};
pub use runner::ScenarioRunner;
