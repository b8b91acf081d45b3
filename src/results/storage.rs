//! Results storage and retrieval
//!
//! Persists conformance runs as JSON files, one per run.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rand::distr::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::models::RunSummary;

/// Stored conformance run
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoredRun {
    /// Unique run ID
    pub id: String,

    /// Free-form label, e.g. the SDK build under test
    pub label: String,

    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,

    pub summary: RunSummary,

    pub environment: EnvironmentInfo,
}

/// Environment the run executed in
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EnvironmentInfo {
    pub os: String,
    pub arch: String,
    /// Testing target, endpoint or region
    pub target: Option<String>,
    pub tool_version: String,
}

impl Default for EnvironmentInfo {
    fn default() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            target: None,
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl StoredRun {
    /// Wrap a finished run; `started_at` is when the host began it
    pub fn new(label: impl Into<String>, started_at: DateTime<Utc>, summary: RunSummary) -> Self {
        Self {
            id: generate_run_id(),
            label: label.into(),
            started_at,
            completed_at: Utc::now(),
            summary,
            environment: EnvironmentInfo::default(),
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.environment.target = Some(target.into());
        self
    }

    pub fn info(&self) -> RunInfo {
        RunInfo {
            id: self.id.clone(),
            label: self.label.clone(),
            started_at: self.started_at,
            scenarios: self.summary.scenarios.len() + self.summary.aborted.len(),
            pass_rate: self.summary.pass_rate(),
            all_passed: self.summary.is_all_passed(),
        }
    }
}

/// Generate unique run ID
fn generate_run_id() -> String {
    let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(char::from)
        .collect();
    format!("{timestamp}_{}", suffix.to_lowercase())
}

/// Results storage manager
pub struct ResultsStorage {
    base_dir: PathBuf,
}

impl ResultsStorage {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Storage under the user's data directory
    pub fn default_dir() -> Self {
        let base_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sdk-conformance")
            .join("results");
        Self::new(base_dir)
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn run_path(&self, run_id: &str) -> PathBuf {
        self.base_dir.join(format!("{run_id}.json"))
    }

    /// Save a run
    pub fn save(&self, run: &StoredRun) -> Result<PathBuf> {
        fs::create_dir_all(&self.base_dir).with_context(|| {
            format!("Failed to create results directory {}", self.base_dir.display())
        })?;

        let path = self.run_path(&run.id);
        let file = File::create(&path).context("Failed to create results file")?;
        let writer = BufWriter::new(file);

        serde_json::to_writer_pretty(writer, run).context("Failed to write results")?;

        info!("Saved conformance results to {}", path.display());
        Ok(path)
    }

    /// Load a run by id
    pub fn load(&self, run_id: &str) -> Result<StoredRun> {
        let run = self.load_from_path(&self.run_path(run_id))?;
        debug!("Loaded conformance results {}", run_id);
        Ok(run)
    }

    pub fn load_from_path(&self, path: &Path) -> Result<StoredRun> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open results file {}", path.display()))?;
        let reader = BufReader::new(file);
        serde_json::from_reader(reader).context("Failed to parse results")
    }

    /// All readable runs, newest first
    pub fn load_all(&self) -> Result<Vec<StoredRun>> {
        if !self.base_dir.exists() {
            return Ok(Vec::new());
        }

        let mut runs = Vec::new();
        for entry in fs::read_dir(&self.base_dir)? {
            let path = entry?.path();
            if path.extension().map(|e| e == "json").unwrap_or(false) {
                match self.load_from_path(&path) {
                    Ok(run) => runs.push(run),
                    Err(e) => debug!("Failed to load {}: {}", path.display(), e),
                }
            }
        }

        runs.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(runs)
    }

    /// Brief information on every run, newest first
    pub fn list_runs(&self) -> Result<Vec<RunInfo>> {
        Ok(self.load_all()?.iter().map(StoredRun::info).collect())
    }

    pub fn latest(&self) -> Result<Option<StoredRun>> {
        Ok(self.load_all()?.into_iter().next())
    }

    /// Delete a run; missing runs are ignored
    pub fn delete(&self, run_id: &str) -> Result<()> {
        let path = self.run_path(run_id);
        if path.exists() {
            fs::remove_file(&path)?;
            info!("Deleted results: {}", path.display());
        }
        Ok(())
    }

    /// Export run to a file
    pub fn export(&self, run: &StoredRun, path: &Path, format: ExportFormat) -> Result<()> {
        match format {
            ExportFormat::Json => {
                let file = File::create(path)?;
                let writer = BufWriter::new(file);
                serde_json::to_writer_pretty(writer, run)?;
            }
            ExportFormat::Csv => {
                let mut writer = csv::Writer::from_path(path)?;

                writer.write_record([
                    "run_id",
                    "service",
                    "operation",
                    "scenario_status",
                    "index",
                    "container_id",
                    "status",
                    "failure",
                    "duration_ms",
                    "pages",
                    "message",
                ])?;

                for report in &run.summary.scenarios {
                    for result in &report.results {
                        writer.write_record([
                            run.id.clone(),
                            report.key.service.clone(),
                            report.key.operation.clone(),
                            report.status.to_string(),
                            result.index.to_string(),
                            result.container_id.clone(),
                            result.status.to_string(),
                            result.failure.map(|f| f.to_string()).unwrap_or_default(),
                            result.duration_ms.to_string(),
                            result.pages.map(|p| p.to_string()).unwrap_or_default(),
                            result.message.clone().unwrap_or_default(),
                        ])?;
                    }
                }
                writer.flush()?;
            }
        }

        info!("Exported results to {}", path.display());
        Ok(())
    }
}

impl Default for ResultsStorage {
    fn default() -> Self {
        Self::default_dir()
    }
}

/// Brief run information
#[derive(Clone, Debug)]
pub struct RunInfo {
    pub id: String,
    pub label: String,
    pub started_at: DateTime<Utc>,
    pub scenarios: usize,
    pub pass_rate: f64,
    pub all_passed: bool,
}

/// Export format
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(ExportFormat::Json),
            "csv" => Some(ExportFormat::Csv),
            _ => None,
        }
    }

    pub fn from_extension(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_str)
    }
}
