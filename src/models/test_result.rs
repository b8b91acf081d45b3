//! Result models for conformance scenarios
//!
//! Defines per-request results, scenario reports and run summaries.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::OperationKey;

/// Outcome status of a single recorded request
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Pass,
    Fail,
    Error,
}

impl TestStatus {
    pub fn symbol(&self) -> &'static str {
        match self {
            TestStatus::Pass => "✓",
            TestStatus::Fail => "✗",
            TestStatus::Error => "!",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TestStatus::Pass)
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestStatus::Pass => write!(f, "PASS"),
            TestStatus::Fail => write!(f, "FAIL"),
            TestStatus::Error => write!(f, "ERROR"),
        }
    }
}

/// Why a request did not pass
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Validator returned a non-empty diff
    Validation,
    /// Validator itself failed
    Validator,
    /// Request scope panicked
    Panic,
    /// Execution context was cancelled or timed out
    Cancelled,
    /// Request or response could not be encoded for the validator
    Encode,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::Validation => "validation",
            FailureKind::Validator => "validator",
            FailureKind::Panic => "panic",
            FailureKind::Cancelled => "cancelled",
            FailureKind::Encode => "encode",
        };
        f.write_str(s)
    }
}

/// Result of replaying one recorded request
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RequestResult {
    pub index: usize,
    pub container_id: String,
    pub status: TestStatus,
    pub failure: Option<FailureKind>,
    pub duration_ms: u64,
    /// Number of pages collected for paginated operations
    pub pages: Option<usize>,
    pub message: Option<String>,
}

impl RequestResult {
    pub fn pass(index: usize, container_id: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            index,
            container_id: container_id.into(),
            status: TestStatus::Pass,
            failure: None,
            duration_ms,
            pages: None,
            message: None,
        }
    }

    pub fn fail(
        index: usize,
        container_id: impl Into<String>,
        duration_ms: u64,
        message: impl Into<String>,
    ) -> Self {
        Self {
            index,
            container_id: container_id.into(),
            status: TestStatus::Fail,
            failure: Some(FailureKind::Validation),
            duration_ms,
            pages: None,
            message: Some(message.into()),
        }
    }

    pub fn error(
        index: usize,
        container_id: impl Into<String>,
        failure: FailureKind,
        error: impl Into<String>,
    ) -> Self {
        Self {
            index,
            container_id: container_id.into(),
            status: TestStatus::Error,
            failure: Some(failure),
            duration_ms: 0,
            pages: None,
            message: Some(error.into()),
        }
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    pub fn with_pages(mut self, pages: Option<usize>) -> Self {
        self.pages = pages;
        self
    }

    /// Sub-scenario name as the host test driver shows it
    pub fn name(&self) -> String {
        format!("request:{}", self.index)
    }
}

impl fmt::Display for RequestResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} ({}) [{}ms]",
            self.status.symbol(),
            self.name(),
            self.container_id,
            self.duration_ms
        )?;
        if let Some(pages) = self.pages {
            write!(f, " {pages} page(s)")?;
        }
        if let Some(msg) = &self.message {
            write!(f, " - {msg}")?;
        }
        Ok(())
    }
}

/// Overall state of a scenario
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioStatus {
    Completed,
    Skipped,
    Cancelled,
}

impl fmt::Display for ScenarioStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScenarioStatus::Completed => write!(f, "COMPLETED"),
            ScenarioStatus::Skipped => write!(f, "SKIPPED"),
            ScenarioStatus::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// Report for one operation's scenario
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub key: OperationKey,
    pub status: ScenarioStatus,
    pub reason: Option<String>,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
    pub total_duration_ms: u64,
    pub results: Vec<RequestResult>,
}

impl ScenarioReport {
    pub fn new(key: OperationKey, status: ScenarioStatus, results: Vec<RequestResult>) -> Self {
        let total = results.len();
        let passed = results
            .iter()
            .filter(|r| r.status == TestStatus::Pass)
            .count();
        let failed = results
            .iter()
            .filter(|r| r.status == TestStatus::Fail)
            .count();
        let errors = results
            .iter()
            .filter(|r| r.status == TestStatus::Error)
            .count();
        let total_duration_ms = results.iter().map(|r| r.duration_ms).sum();

        Self {
            key,
            status,
            reason: None,
            total,
            passed,
            failed,
            errors,
            total_duration_ms,
            results,
        }
    }

    pub fn skipped(key: OperationKey, reason: impl Into<String>) -> Self {
        let mut report = Self::new(key, ScenarioStatus::Skipped, Vec::new());
        report.reason = Some(reason.into());
        report
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.total_duration_ms = duration_ms;
        self
    }

    pub fn pass_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.passed as f64 / self.total as f64) * 100.0
        }
    }

    /// True when the scenario completed and every request passed
    ///
    /// A skipped scenario is not a failure.
    pub fn is_success(&self) -> bool {
        match self.status {
            ScenarioStatus::Skipped => true,
            ScenarioStatus::Cancelled => false,
            ScenarioStatus::Completed => self.passed == self.total,
        }
    }

    /// Failing or erroring results
    pub fn failures(&self) -> impl Iterator<Item = &RequestResult> {
        self.results.iter().filter(|r| !r.status.is_success())
    }
}

impl fmt::Display for ScenarioReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} - {}", self.key, self.status)?;
        if let Some(reason) = &self.reason {
            writeln!(f, "  {reason}")?;
        }
        writeln!(f, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")?;
        for result in &self.results {
            writeln!(f, "  {result}")?;
        }
        writeln!(f, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")?;
        writeln!(
            f,
            "Total: {} | Pass: {} | Fail: {} | Error: {}",
            self.total, self.passed, self.failed, self.errors
        )?;
        writeln!(
            f,
            "Pass Rate: {:.1}% | Duration: {}ms",
            self.pass_rate(),
            self.total_duration_ms
        )
    }
}

/// Scenario that could not run at all
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AbortedScenario {
    pub key: OperationKey,
    pub error: String,
}

/// Summary across many scenarios
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub scenarios: Vec<ScenarioReport>,
    pub aborted: Vec<AbortedScenario>,
    pub completed: usize,
    pub skipped: usize,
    pub cancelled: usize,
    pub requests: usize,
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
    pub total_duration_ms: u64,
}

impl RunSummary {
    pub fn new(scenarios: Vec<ScenarioReport>, aborted: Vec<AbortedScenario>) -> Self {
        let count = |status: ScenarioStatus| scenarios.iter().filter(|s| s.status == status).count();

        Self {
            completed: count(ScenarioStatus::Completed),
            skipped: count(ScenarioStatus::Skipped),
            cancelled: count(ScenarioStatus::Cancelled),
            requests: scenarios.iter().map(|s| s.total).sum(),
            passed: scenarios.iter().map(|s| s.passed).sum(),
            failed: scenarios.iter().map(|s| s.failed).sum(),
            errors: scenarios.iter().map(|s| s.errors).sum(),
            total_duration_ms: scenarios.iter().map(|s| s.total_duration_ms).sum(),
            scenarios,
            aborted,
        }
    }

    pub fn pass_rate(&self) -> f64 {
        if self.requests == 0 {
            0.0
        } else {
            (self.passed as f64 / self.requests as f64) * 100.0
        }
    }

    pub fn is_all_passed(&self) -> bool {
        self.aborted.is_empty() && self.scenarios.iter().all(ScenarioReport::is_success)
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for scenario in &self.scenarios {
            write!(f, "{scenario}")?;
        }
        for aborted in &self.aborted {
            writeln!(f, "! {} aborted: {}", aborted.key, aborted.error)?;
        }
        writeln!(
            f,
            "Scenarios: {} completed | {} skipped | {} cancelled | {} aborted",
            self.completed,
            self.skipped,
            self.cancelled,
            self.aborted.len()
        )?;
        writeln!(
            f,
            "Requests: {} | Pass: {} | Fail: {} | Error: {} | Pass Rate: {:.1}%",
            self.requests,
            self.passed,
            self.failed,
            self.errors,
            self.pass_rate()
        )
    }
}
