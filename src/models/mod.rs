//! Data models for conformance replay
//!
//! Operation identity, per-request results and scenario reports.

mod operation;
mod test_result;

pub use operation::{OperationKey, OperationSpec};
pub use test_result::{
    AbortedScenario, FailureKind, RequestResult, RunSummary, ScenarioReport, ScenarioStatus,
    TestStatus,
};
